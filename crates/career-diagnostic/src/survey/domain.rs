use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Likert answer to a survey statement. The option set is closed; weights are
/// a fixed lookup rather than anything configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOption {
    StronglyDisagree,
    Disagree,
    Agree,
    StronglyAgree,
}

impl ResponseOption {
    /// Signed contribution of this answer to every activity the question tags.
    pub const fn weight(self) -> i32 {
        match self {
            ResponseOption::StronglyDisagree => -2,
            ResponseOption::Disagree => -1,
            ResponseOption::Agree => 1,
            ResponseOption::StronglyAgree => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ResponseOption::StronglyDisagree => "strongly_disagree",
            ResponseOption::Disagree => "disagree",
            ResponseOption::Agree => "agree",
            ResponseOption::StronglyAgree => "strongly_agree",
        }
    }
}

impl fmt::Display for ResponseOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseOption {
    type Err = SurveyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "strongly_disagree" => Ok(ResponseOption::StronglyDisagree),
            "disagree" => Ok(ResponseOption::Disagree),
            "agree" => Ok(ResponseOption::Agree),
            "strongly_agree" => Ok(ResponseOption::StronglyAgree),
            other => Err(SurveyError::UnknownResponseOption {
                value: other.to_string(),
            }),
        }
    }
}

/// Per-request scoring result for one activity. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedActivity {
    pub code: String,
    pub name: String,
    pub phase: String,
    pub score: i32,
}

/// Externally visible recommendation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecommendationItem {
    pub name: String,
    pub description: String,
    pub phase: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SurveyError {
    #[error("expected {expected} responses, received {received}")]
    ResponseCountMismatch { expected: usize, received: usize },
    #[error("'{value}' is not a recognized response option")]
    UnknownResponseOption { value: String },
    #[error("selected activity '{code}' has no description entry")]
    MissingDescription { code: String },
}
