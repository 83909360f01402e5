use std::collections::BTreeSet;

use super::domain::{RankedActivity, RecommendationItem, ResponseOption, SurveyError};
use super::scoring::compute_ranked_activities;
use crate::catalog::Catalog;

pub const TOP_K: usize = 5;

const FOUNDATION_PHASE: &str = "Phase A";
const ADVANCED_PHASE: &str = "Phase C";
const ENERGY_MAPPING_NAME: &str = "Energy Mapping";

/// Pick the top recommendations from a ranked list, injecting prerequisites
/// when an advanced activity ranks highly.
///
/// When the top-K window contains a Phase C activity, the highest-ranked
/// Phase A activity and the "Energy Mapping" activity (whichever of the two
/// exist, in that order) are moved to the front of the selection before the
/// remaining slots fill from the ranking. Selected codes never repeat.
pub fn select_top_recommendations(
    catalog: &Catalog,
    ranked: &[RankedActivity],
) -> (Vec<RankedActivity>, Option<String>) {
    let inject_prerequisites = ranked
        .iter()
        .take(TOP_K)
        .any(|activity| activity.phase == ADVANCED_PHASE);

    let mut selected: Vec<RankedActivity> = Vec::with_capacity(TOP_K);
    let mut seen_codes: BTreeSet<&str> = BTreeSet::new();

    if inject_prerequisites {
        let phase_a = ranked
            .iter()
            .find(|activity| activity.phase == FOUNDATION_PHASE);
        let energy_mapping = catalog
            .activity_named(ENERGY_MAPPING_NAME)
            .and_then(|activity| ranked.iter().find(|entry| entry.code == activity.code));

        for required in [phase_a, energy_mapping].into_iter().flatten() {
            if seen_codes.insert(required.code.as_str()) {
                selected.push(required.clone());
            }
        }
    }

    for activity in ranked {
        if selected.len() >= TOP_K {
            break;
        }
        if seen_codes.insert(activity.code.as_str()) {
            selected.push(activity.clone());
        }
    }

    selected.truncate(TOP_K);

    // The explanatory note for injected prerequisites is drafted but not
    // enabled; the slot stays in the contract so the API shape is stable.
    let prerequisite_note = None;

    (selected, prerequisite_note)
}

/// Run the scorer and selector, then join the selection with the description
/// table. A selected code without a description means the catalog and the
/// description table disagree; that aborts the request instead of silently
/// dropping the field.
pub fn build_recommendation_payload(
    catalog: &Catalog,
    responses: &[ResponseOption],
) -> Result<(Vec<RecommendationItem>, Option<String>), SurveyError> {
    let ranked = compute_ranked_activities(catalog, responses)?;
    let (selected, prerequisite_note) = select_top_recommendations(catalog, &ranked);

    let mut items = Vec::with_capacity(selected.len());
    for activity in selected {
        let description =
            catalog
                .description(&activity.code)
                .ok_or_else(|| SurveyError::MissingDescription {
                    code: activity.code.clone(),
                })?;
        items.push(RecommendationItem {
            name: activity.name,
            description: description.to_string(),
            phase: activity.phase,
        });
    }

    Ok((items, prerequisite_note))
}
