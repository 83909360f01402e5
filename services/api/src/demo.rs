use std::path::PathBuf;

use career_diagnostic::catalog::Catalog;
use career_diagnostic::error::AppError;
use career_diagnostic::survey::{
    build_recommendation_payload, compute_ranked_activities, ResponseOption,
};
use clap::Args;

#[derive(Args, Debug)]
pub(crate) struct SurveyScoreArgs {
    /// Comma-separated response vector, one entry per question
    /// (strongly_disagree, disagree, agree, strongly_agree)
    #[arg(long)]
    responses: String,
    /// Directory holding the catalog data files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
}

pub(crate) fn run_survey_score(args: SurveyScoreArgs) -> Result<(), AppError> {
    let responses = parse_responses(&args.responses)?;
    let catalog = Catalog::load(&args.data_dir)?;

    let ranked = compute_ranked_activities(&catalog, &responses)?;
    let (items, _) = build_recommendation_payload(&catalog, &responses)?;

    println!("Activity ranking");
    for entry in &ranked {
        println!("- {:<26} {:<8} score {}", entry.name, entry.phase, entry.score);
    }

    println!("\nRecommended activities");
    for (index, item) in items.iter().enumerate() {
        println!("{}. {} ({})", index + 1, item.name, item.phase);
        println!("   {}", item.description);
    }

    Ok(())
}

fn parse_responses(raw: &str) -> Result<Vec<ResponseOption>, AppError> {
    raw.split(',')
        .map(|value| value.parse::<ResponseOption>().map_err(AppError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_responses() {
        let responses =
            parse_responses("agree, strongly_agree ,disagree").expect("valid vector parses");
        assert_eq!(
            responses,
            vec![
                ResponseOption::Agree,
                ResponseOption::StronglyAgree,
                ResponseOption::Disagree,
            ]
        );
    }

    #[test]
    fn rejects_unknown_response_values() {
        assert!(parse_responses("agree,sometimes").is_err());
    }
}
