use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const QUESTIONS_FILE: &str = "questions.json";
pub const ORDER_FILE: &str = "order.csv";
pub const DESCRIPTIONS_FILE: &str = "descriptions.txt";

const DESCRIPTIONS_HEADER: &str = "The Activity Library";

/// One survey statement and the activity codes its response feeds into.
///
/// Question order is load order; responses are paired with questions
/// positionally, so the sequence must never be reordered after loading.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Question {
    pub statement: String,
    pub tags: Vec<String>,
}

/// A catalog activity. `prerequisite` is free text surfaced to operators but
/// not consulted by scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub code: String,
    pub name: String,
    pub phase: String,
    pub prerequisite: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("missing required data file '{filename}'; checked: {searched}")]
    MissingDataFile { filename: String, searched: String },
    #[error("unable to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse '{path}' as a question list: {source}")]
    QuestionFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not parse activity order file: {source}")]
    OrderFormat {
        #[from]
        source: csv::Error,
    },
    #[error("could not extract an activity code from '{raw_name}'")]
    MalformedActivityName { raw_name: String },
    #[error("duplicate activity code '{code}'")]
    DuplicateActivityCode { code: String },
    #[error("descriptions file is missing the activity library header")]
    UnexpectedDescriptionsFormat,
    #[error("descriptions file line '{line}' is not 'CODE: description'")]
    MalformedDescriptionLine { line: String },
    #[error("catalog has no {what}")]
    Empty { what: &'static str },
}

/// Immutable snapshot of the questionnaire, activity list, and description
/// table. Built once at startup and shared read-only across request handlers.
#[derive(Debug, Clone)]
pub struct Catalog {
    questions: Vec<Question>,
    activities: Vec<Activity>,
    descriptions: BTreeMap<String, String>,
}

impl Catalog {
    /// Load all three data files from `data_dir`, falling back to the
    /// process working directory for each file individually.
    pub fn load(data_dir: &Path) -> Result<Self, CatalogError> {
        let questions = load_questions(&resolve_data_path(data_dir, QUESTIONS_FILE)?)?;
        let activities = load_activities(&resolve_data_path(data_dir, ORDER_FILE)?)?;
        let descriptions = load_descriptions(&resolve_data_path(data_dir, DESCRIPTIONS_FILE)?)?;
        Self::from_parts(questions, activities, descriptions)
    }

    /// Assemble a catalog from already-parsed parts, enforcing the snapshot
    /// invariants (unique codes, nothing empty).
    pub fn from_parts(
        questions: Vec<Question>,
        activities: Vec<Activity>,
        descriptions: BTreeMap<String, String>,
    ) -> Result<Self, CatalogError> {
        if questions.is_empty() {
            return Err(CatalogError::Empty { what: "questions" });
        }
        if activities.is_empty() {
            return Err(CatalogError::Empty { what: "activities" });
        }

        let mut seen = std::collections::BTreeSet::new();
        for activity in &activities {
            if !seen.insert(activity.code.as_str()) {
                return Err(CatalogError::DuplicateActivityCode {
                    code: activity.code.clone(),
                });
            }
        }

        Ok(Self {
            questions,
            activities,
            descriptions,
        })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn description(&self, code: &str) -> Option<&str> {
        self.descriptions.get(code).map(String::as_str)
    }

    pub fn activity_named(&self, name: &str) -> Option<&Activity> {
        self.activities.iter().find(|activity| activity.name == name)
    }
}

fn resolve_data_path(data_dir: &Path, filename: &str) -> Result<PathBuf, CatalogError> {
    let candidates = [data_dir.join(filename), PathBuf::from(filename)];

    for candidate in &candidates {
        if candidate.exists() {
            return Ok(candidate.clone());
        }
    }

    let searched = candidates
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(CatalogError::MissingDataFile {
        filename: filename.to_string(),
        searched,
    })
}

fn read_file(path: &Path) -> Result<String, CatalogError> {
    fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn load_questions(path: &Path) -> Result<Vec<Question>, CatalogError> {
    let raw = read_file(path)?;
    serde_json::from_str(&raw).map_err(|source| CatalogError::QuestionFormat {
        path: path.display().to_string(),
        source,
    })
}

#[derive(Debug, Deserialize)]
struct OrderRow {
    #[serde(rename = "Activity")]
    activity: String,
    #[serde(rename = "Phase")]
    phase: String,
    #[serde(rename = "Prerequisite")]
    prerequisite: String,
}

fn load_activities(path: &Path) -> Result<Vec<Activity>, CatalogError> {
    let raw = read_file(path)?;
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());

    let mut activities = Vec::new();
    for record in csv_reader.deserialize::<OrderRow>() {
        let row = record?;
        let (name, code) = split_activity_name(&row.activity)?;
        activities.push(Activity {
            code,
            name,
            phase: row.phase,
            prerequisite: row.prerequisite.trim_matches('`').to_string(),
        });
    }

    Ok(activities)
}

/// Split `"Knowdell Values (VAL)"` into name and uppercase code.
fn split_activity_name(raw_name: &str) -> Result<(String, String), CatalogError> {
    let malformed = || CatalogError::MalformedActivityName {
        raw_name: raw_name.to_string(),
    };

    let open = raw_name.rfind('(').ok_or_else(malformed)?;
    let close = raw_name[open..].find(')').map(|idx| open + idx).ok_or_else(malformed)?;

    let code = raw_name[open + 1..close].trim();
    if code.is_empty() || !code.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(malformed());
    }

    let name = raw_name[..open].trim();
    if name.is_empty() {
        return Err(malformed());
    }

    Ok((name.to_string(), code.to_string()))
}

fn load_descriptions(path: &Path) -> Result<BTreeMap<String, String>, CatalogError> {
    let raw = read_file(path)?;
    let mut lines = raw.lines().filter(|line| !line.trim().is_empty());

    match lines.next() {
        Some(header) if header.contains(DESCRIPTIONS_HEADER) => {}
        _ => return Err(CatalogError::UnexpectedDescriptionsFormat),
    }

    let mut descriptions = BTreeMap::new();
    for line in lines {
        let (code, text) =
            line.split_once(':')
                .ok_or_else(|| CatalogError::MalformedDescriptionLine {
                    line: line.to_string(),
                })?;
        descriptions.insert(code.trim().to_string(), text.trim().to_string());
    }

    Ok(descriptions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn reference_data_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data")
    }

    #[test]
    fn loads_reference_catalog() {
        let catalog = Catalog::load(&reference_data_dir()).expect("reference catalog loads");

        assert_eq!(catalog.questions().len(), 18);
        assert_eq!(catalog.activities().len(), 7);

        let energy = catalog
            .activity_named("Energy Mapping")
            .expect("energy mapping present");
        assert_eq!(energy.code, "NRG");
        assert_eq!(energy.phase, "Phase B");
        assert_eq!(energy.prerequisite, "One Phase A activity");

        for activity in catalog.activities() {
            assert!(
                catalog.description(&activity.code).is_some(),
                "activity {} has a description",
                activity.code
            );
        }
    }

    #[test]
    fn question_tags_reference_known_codes() {
        let catalog = Catalog::load(&reference_data_dir()).expect("reference catalog loads");
        let codes: Vec<&str> = catalog
            .activities()
            .iter()
            .map(|activity| activity.code.as_str())
            .collect();

        for question in catalog.questions() {
            for tag in &question.tags {
                assert!(codes.contains(&tag.as_str()), "unknown tag {tag}");
            }
        }
    }

    #[test]
    fn missing_file_error_names_searched_paths() {
        let dir = TempDir::new().expect("temp dir");
        let err = Catalog::load(dir.path()).expect_err("empty dir cannot load");
        match err {
            CatalogError::MissingDataFile { filename, searched } => {
                assert_eq!(filename, QUESTIONS_FILE);
                assert!(searched.contains(QUESTIONS_FILE));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_activity_cell_without_code() {
        let err = split_activity_name("Knowdell Values").expect_err("no code present");
        assert!(matches!(err, CatalogError::MalformedActivityName { .. }));

        let err = split_activity_name("(VAL)").expect_err("no name present");
        assert!(matches!(err, CatalogError::MalformedActivityName { .. }));
    }

    #[test]
    fn splits_name_and_code() {
        let (name, code) = split_activity_name("Knowdell Values (VAL)").expect("valid cell");
        assert_eq!(name, "Knowdell Values");
        assert_eq!(code, "VAL");
    }

    #[test]
    fn rejects_descriptions_without_header() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join(DESCRIPTIONS_FILE);
        fs::write(&path, "VAL: values work\n").expect("write fixture");

        let err = load_descriptions(&path).expect_err("header required");
        assert!(matches!(err, CatalogError::UnexpectedDescriptionsFormat));
    }

    #[test]
    fn rejects_duplicate_activity_codes() {
        let questions = vec![Question {
            statement: "q".to_string(),
            tags: vec!["VAL".to_string()],
        }];
        let duplicate = Activity {
            code: "VAL".to_string(),
            name: "Knowdell Values".to_string(),
            phase: "Phase A".to_string(),
            prerequisite: "None".to_string(),
        };
        let activities = vec![duplicate.clone(), duplicate];

        let err = Catalog::from_parts(questions, activities, BTreeMap::new())
            .expect_err("duplicate codes rejected");
        assert!(matches!(err, CatalogError::DuplicateActivityCode { .. }));
    }

    #[test]
    fn strips_backticks_from_prerequisites() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join(ORDER_FILE);
        fs::write(
            &path,
            "Order,Activity,Phase,Prerequisite\n1,Mind Mapping (MM),Phase C,`Energy Mapping`\n",
        )
        .expect("write fixture");

        let activities = load_activities(&path).expect("fixture parses");
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].prerequisite, "Energy Mapping");
    }
}
