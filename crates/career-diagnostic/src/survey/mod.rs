mod domain;
mod scoring;
mod selection;

pub use domain::{RankedActivity, RecommendationItem, ResponseOption, SurveyError};
pub use scoring::compute_ranked_activities;
pub use selection::{build_recommendation_payload, select_top_recommendations, TOP_K};
