mod sheets;

pub use sheets::GoogleSheetsSubmissionStore;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::SubmissionConfig;
use crate::survey::TOP_K;

/// Truncated hash length, enough for pseudonymous dedup without storing
/// anything reversible.
const VISITOR_HASH_LEN: usize = 24;

/// One logged survey submission. Recommendations hold activity names only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub submitted_at_utc: String,
    pub submission_id: String,
    pub responses: Vec<String>,
    pub recommendations: Vec<String>,
    pub visitor_hash: Option<String>,
    pub schema_version: String,
}

impl SubmissionRecord {
    pub fn new(
        responses: Vec<String>,
        recommendations: Vec<String>,
        visitor_hash: Option<String>,
        schema_version: String,
    ) -> Self {
        Self {
            submitted_at_utc: Utc::now().to_rfc3339(),
            submission_id: Uuid::new_v4().to_string(),
            responses,
            recommendations,
            visitor_hash,
            schema_version,
        }
    }

    /// Flatten into the spreadsheet row layout: timestamp, id, one column per
    /// response, exactly `TOP_K` recommendation columns (right-padded with
    /// empty strings), visitor hash, schema version.
    pub fn to_row(&self) -> Vec<String> {
        let mut row = Vec::with_capacity(self.responses.len() + TOP_K + 4);
        row.push(self.submitted_at_utc.clone());
        row.push(self.submission_id.clone());
        row.extend(self.responses.iter().cloned());

        for slot in 0..TOP_K {
            row.push(self.recommendations.get(slot).cloned().unwrap_or_default());
        }

        row.push(self.visitor_hash.clone().unwrap_or_default());
        row.push(self.schema_version.clone());
        row
    }
}

/// Header row matching [`SubmissionRecord::to_row`] for a given questionnaire
/// length.
pub fn submission_columns(question_count: usize) -> Vec<String> {
    let mut columns = vec!["submitted_at_utc".to_string(), "submission_id".to_string()];
    columns.extend((1..=question_count).map(|index| format!("q{index}")));
    columns.extend((1..=TOP_K).map(|index| format!("rec_{index}")));
    columns.push("visitor_hash".to_string());
    columns.push("schema_version".to_string());
    columns
}

/// HMAC-SHA256 of `"{ip}|{user_agent}"` keyed by the configured secret,
/// truncated to [`VISITOR_HASH_LEN`] hex characters.
pub fn build_visitor_hash(ip_address: &str, user_agent: Option<&str>, secret: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(ip_address.as_bytes());
    mac.update(b"|");
    mac.update(user_agent.unwrap_or_default().as_bytes());

    let digest = mac.finalize().into_bytes();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex.truncate(VISITOR_HASH_LEN);
    hex
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionStoreError {
    #[error("submission sink runtime unavailable: {0}")]
    Runtime(String),
    #[error("missing Google Sheets spreadsheet id")]
    MissingSpreadsheetId,
    #[error("missing Google service account credentials")]
    MissingCredentials,
    #[error("invalid Google service account credentials: {0}")]
    Credentials(String),
    #[error("sheets append failed: {0}")]
    Backend(String),
    #[error("sheets append timed out after {0:?}")]
    Timeout(Duration),
}

/// Outbound seam for submission logging so the service can be exercised with
/// test doubles. Appends are best-effort from the caller's perspective; the
/// store itself still reports failures so they can be logged.
pub trait SubmissionStore: Send + Sync {
    fn append_submission(&self, record: &SubmissionRecord) -> Result<(), SubmissionStoreError>;
}

/// Default store when submission logging is disabled or misconfigured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSubmissionStore;

impl SubmissionStore for NoopSubmissionStore {
    fn append_submission(&self, _record: &SubmissionRecord) -> Result<(), SubmissionStoreError> {
        Ok(())
    }
}

/// Build the configured submission store. Every misconfiguration degrades to
/// the no-op store with a log line; the sink must never block startup.
pub fn create_submission_store(config: &SubmissionConfig) -> Arc<dyn SubmissionStore> {
    if !config.sheets_enabled {
        info!("Google Sheets submission logging is disabled");
        return Arc::new(NoopSubmissionStore);
    }

    if config.spreadsheet_id.is_none() {
        warn!("GOOGLE_SHEETS_ENABLED is set, but GOOGLE_SHEETS_SPREADSHEET_ID is missing");
        return Arc::new(NoopSubmissionStore);
    }

    if config.service_account_json.is_none() && config.service_account_file.is_none() {
        warn!(
            "GOOGLE_SHEETS_ENABLED is set, but no service account credentials were provided \
             (GOOGLE_SERVICE_ACCOUNT_JSON or GOOGLE_SERVICE_ACCOUNT_FILE)"
        );
        return Arc::new(NoopSubmissionStore);
    }

    match GoogleSheetsSubmissionStore::connect(config) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            warn!(error = %err, "unable to connect the Google Sheets store; submissions will not be logged");
            Arc::new(NoopSubmissionStore)
        }
    }
}
