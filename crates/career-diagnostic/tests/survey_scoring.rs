use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;

use career_diagnostic::catalog::{Activity, Catalog, Question};
use career_diagnostic::survey::{
    build_recommendation_payload, compute_ranked_activities, select_top_recommendations,
    ResponseOption, SurveyError, TOP_K,
};

fn reference_catalog() -> Catalog {
    let data_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data");
    Catalog::load(&data_dir).expect("reference catalog loads")
}

fn activity(code: &str, name: &str, phase: &str) -> Activity {
    Activity {
        code: code.to_string(),
        name: name.to_string(),
        phase: phase.to_string(),
        prerequisite: "None".to_string(),
    }
}

fn question(statement: &str, tags: &[&str]) -> Question {
    Question {
        statement: statement.to_string(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
    }
}

fn catalog_from(questions: Vec<Question>, activities: Vec<Activity>) -> Catalog {
    let descriptions: BTreeMap<String, String> = activities
        .iter()
        .map(|entry| (entry.code.clone(), format!("About {}", entry.name)))
        .collect();
    Catalog::from_parts(questions, activities, descriptions).expect("valid catalog")
}

#[test]
fn every_activity_is_ranked_with_non_negative_score() {
    let catalog = reference_catalog();
    let responses = vec![ResponseOption::Agree; catalog.questions().len()];

    let ranked = compute_ranked_activities(&catalog, &responses).expect("valid response vector");

    assert_eq!(ranked.len(), catalog.activities().len());
    assert!(ranked.iter().all(|entry| entry.score >= 0));

    let codes: BTreeSet<&str> = ranked.iter().map(|entry| entry.code.as_str()).collect();
    assert_eq!(codes.len(), ranked.len(), "one entry per activity");
}

#[test]
fn all_strongly_disagree_clamps_scores_to_zero() {
    let catalog = reference_catalog();
    let responses = vec![ResponseOption::StronglyDisagree; 18];

    let ranked = compute_ranked_activities(&catalog, &responses).expect("valid response vector");

    assert!(ranked.iter().all(|entry| entry.score == 0));
}

#[test]
fn equal_scores_sort_by_name_ascending() {
    let catalog = reference_catalog();
    let responses = vec![ResponseOption::StronglyDisagree; 18];

    let ranked = compute_ranked_activities(&catalog, &responses).expect("valid response vector");

    for pair in ranked.windows(2) {
        assert!(pair[0].score >= pair[1].score);
        if pair[0].score == pair[1].score {
            assert!(pair[0].name < pair[1].name, "ties break by name");
        }
    }
}

#[test]
fn response_count_mismatch_is_rejected() {
    let catalog = reference_catalog();
    let responses = vec![ResponseOption::Agree; 17];

    let err = compute_ranked_activities(&catalog, &responses).expect_err("length must match");

    match err {
        SurveyError::ResponseCountMismatch { expected, received } => {
            assert_eq!(expected, 18);
            assert_eq!(received, 17);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_tags_accumulate_without_surfacing() {
    let catalog = catalog_from(
        vec![
            question("tagged with a retired code", &["VAL", "ZZZ"]),
            question("plain values question", &["VAL"]),
        ],
        vec![activity("VAL", "Knowdell Values", "Phase A")],
    );
    let responses = vec![ResponseOption::StronglyAgree, ResponseOption::Agree];

    let ranked = compute_ranked_activities(&catalog, &responses).expect("valid response vector");

    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].code, "VAL");
    assert_eq!(ranked[0].score, 3);
}

#[test]
fn selection_prepends_prerequisites_when_phase_c_ranks_high() {
    let catalog = reference_catalog();
    let responses = vec![ResponseOption::StronglyAgree; 18];

    let ranked = compute_ranked_activities(&catalog, &responses).expect("valid response vector");
    let (selected, note) = select_top_recommendations(&catalog, &ranked);

    let names: Vec<&str> = selected.iter().map(|entry| entry.name.as_str()).collect();
    assert_eq!(&names[..2], &["Knowdell Values", "Energy Mapping"]);
    assert_eq!(selected.len(), TOP_K);
    assert!(note.is_none(), "prerequisite note stays disabled");

    let codes: BTreeSet<&str> = selected.iter().map(|entry| entry.code.as_str()).collect();
    assert_eq!(codes.len(), selected.len(), "no duplicate codes");
}

#[test]
fn selection_without_high_phase_c_keeps_plain_ranking() {
    let catalog = catalog_from(
        vec![
            question("values", &["VAL"]),
            question("strengths", &["STR"]),
            question("extra one", &["NR1"]),
            question("extra two", &["NR2"]),
            question("extra three", &["NR3"]),
            question("advanced", &["ADV"]),
        ],
        vec![
            activity("VAL", "Values Work", "Phase A"),
            activity("STR", "Strengths Inventory", "Phase A"),
            activity("NR1", "Extra One", "Phase B"),
            activity("NR2", "Extra Two", "Phase B"),
            activity("NR3", "Extra Three", "Phase B"),
            activity("ADV", "Advanced Planning", "Phase C"),
        ],
    );
    // Five activities score 1 and Advanced Planning clamps to 0, so the
    // Phase C activity falls outside the top-5 window.
    let responses = vec![
        ResponseOption::Agree,
        ResponseOption::Agree,
        ResponseOption::Agree,
        ResponseOption::Agree,
        ResponseOption::Agree,
        ResponseOption::StronglyDisagree,
    ];

    let ranked = compute_ranked_activities(&catalog, &responses).expect("valid response vector");
    let (selected, _) = select_top_recommendations(&catalog, &ranked);

    assert_eq!(selected.len(), 5);
    assert!(selected.iter().all(|entry| entry.phase != "Phase C"));
    // No injection: order is exactly the ranking.
    let expected: Vec<&str> = ranked.iter().take(5).map(|e| e.name.as_str()).collect();
    let actual: Vec<&str> = selected.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(actual, expected);
}

#[test]
fn injection_skips_prerequisites_already_in_place() {
    // Energy Mapping outranks everything, so injecting it must not duplicate
    // it and the Phase A candidate still moves ahead of the Phase C leader.
    let catalog = catalog_from(
        vec![
            question("energy", &["NRG"]),
            question("advanced", &["ADV"]),
            question("values", &["VAL"]),
        ],
        vec![
            activity("VAL", "Values Work", "Phase A"),
            activity("NRG", "Energy Mapping", "Phase B"),
            activity("ADV", "Advanced Planning", "Phase C"),
        ],
    );
    let responses = vec![
        ResponseOption::StronglyAgree,
        ResponseOption::StronglyAgree,
        ResponseOption::Agree,
    ];

    let ranked = compute_ranked_activities(&catalog, &responses).expect("valid response vector");
    let (selected, _) = select_top_recommendations(&catalog, &ranked);

    let names: Vec<&str> = selected.iter().map(|entry| entry.name.as_str()).collect();
    assert_eq!(names, vec!["Values Work", "Energy Mapping", "Advanced Planning"]);
}

#[test]
fn small_catalog_returns_fewer_than_five_without_padding() {
    let catalog = catalog_from(
        vec![question("only", &["VAL"])],
        vec![
            activity("VAL", "Values Work", "Phase A"),
            activity("ADV", "Advanced Planning", "Phase C"),
        ],
    );
    let responses = vec![ResponseOption::Agree];

    let ranked = compute_ranked_activities(&catalog, &responses).expect("valid response vector");
    let (selected, _) = select_top_recommendations(&catalog, &ranked);

    assert_eq!(selected.len(), 2);
}

#[test]
fn payload_joins_descriptions_for_selected_activities() {
    let catalog = reference_catalog();
    let responses = vec![ResponseOption::StronglyAgree; 18];

    let (items, note) =
        build_recommendation_payload(&catalog, &responses).expect("payload builds");

    assert_eq!(items.len(), TOP_K);
    assert!(note.is_none());
    assert_eq!(items[0].name, "Knowdell Values");
    assert_eq!(items[1].name, "Energy Mapping");
    assert!(items.iter().all(|item| !item.description.is_empty()));
    assert!(items.iter().all(|item| item.phase.starts_with("Phase ")));
}

#[test]
fn payload_fails_when_description_is_missing() {
    let questions = vec![question("values", &["VAL"])];
    let activities = vec![activity("VAL", "Values Work", "Phase A")];
    let catalog = Catalog::from_parts(questions, activities, BTreeMap::new())
        .expect("catalog without descriptions");

    let err = build_recommendation_payload(&catalog, &[ResponseOption::Agree])
        .expect_err("missing description is a data error");

    match err {
        SurveyError::MissingDescription { code } => assert_eq!(code, "VAL"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn payload_is_deterministic_for_identical_input() {
    let catalog = reference_catalog();
    let responses: Vec<ResponseOption> = (0..18)
        .map(|index| {
            if index % 3 == 0 {
                ResponseOption::StronglyAgree
            } else if index % 3 == 1 {
                ResponseOption::Disagree
            } else {
                ResponseOption::Agree
            }
        })
        .collect();

    let first = build_recommendation_payload(&catalog, &responses).expect("payload builds");
    let second = build_recommendation_payload(&catalog, &responses).expect("payload builds");

    assert_eq!(first, second);
}

#[test]
fn response_options_round_trip_through_strings() {
    for option in [
        ResponseOption::StronglyDisagree,
        ResponseOption::Disagree,
        ResponseOption::Agree,
        ResponseOption::StronglyAgree,
    ] {
        let parsed: ResponseOption = option.as_str().parse().expect("round trip");
        assert_eq!(parsed, option);
    }

    assert!("somewhat_agree".parse::<ResponseOption>().is_err());
    assert_eq!(ResponseOption::StronglyDisagree.weight(), -2);
    assert_eq!(ResponseOption::StronglyAgree.weight(), 2);
}
