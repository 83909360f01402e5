use std::collections::BTreeMap;

use super::domain::{RankedActivity, ResponseOption, SurveyError};
use crate::catalog::Catalog;

/// Scores clamp at zero: for ranking purposes, negative affinity carries no
/// more signal than no affinity.
const MIN_SCORE_CLAMP: i32 = 0;

/// Score every catalog activity against a response vector.
///
/// Responses pair with questions positionally, so the vector length must
/// match the questionnaire exactly; anything else is rejected rather than
/// truncated or padded. The result covers every known activity and is sorted
/// by score descending with ties broken by name ascending, which makes the
/// ordering total and deterministic.
pub fn compute_ranked_activities(
    catalog: &Catalog,
    responses: &[ResponseOption],
) -> Result<Vec<RankedActivity>, SurveyError> {
    let questions = catalog.questions();
    if responses.len() != questions.len() {
        return Err(SurveyError::ResponseCountMismatch {
            expected: questions.len(),
            received: responses.len(),
        });
    }

    let mut score_map: BTreeMap<&str, i32> = catalog
        .activities()
        .iter()
        .map(|activity| (activity.code.as_str(), 0))
        .collect();

    // Tags naming codes outside the catalog accumulate here but are never
    // surfaced, since output is built by walking the known activity list.
    for (question, response) in questions.iter().zip(responses) {
        let delta = response.weight();
        for tag in &question.tags {
            *score_map.entry(tag.as_str()).or_insert(0) += delta;
        }
    }

    let mut ranked: Vec<RankedActivity> = catalog
        .activities()
        .iter()
        .map(|activity| RankedActivity {
            code: activity.code.clone(),
            name: activity.name.clone(),
            phase: activity.phase.clone(),
            score: score_map
                .get(activity.code.as_str())
                .copied()
                .unwrap_or(0)
                .max(MIN_SCORE_CLAMP),
        })
        .collect();

    ranked.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));

    Ok(ranked)
}
