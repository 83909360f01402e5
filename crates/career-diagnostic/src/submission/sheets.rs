use std::thread;
use std::time::Duration;

use google_sheets4::api::ValueRange;
use google_sheets4::{hyper_rustls, hyper_util, yup_oauth2, Sheets};
use tokio::runtime::Runtime;
use tracing::warn;

use super::{SubmissionRecord, SubmissionStore, SubmissionStoreError};
use crate::config::SubmissionConfig;

type SheetsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);
const RETRY_MAX_EXPONENT: u32 = 10;

/// Exponential backoff delay for the given retry attempt. The exponent is
/// capped so an oversized `GOOGLE_SHEETS_MAX_RETRIES` cannot overflow the
/// multiplier; past the cap every wait is `RETRY_BASE_DELAY * 1024`.
fn retry_delay(attempt: u32) -> Duration {
    RETRY_BASE_DELAY * 2u32.saturating_pow(attempt.min(RETRY_MAX_EXPONENT))
}

/// Google Sheets submission log backed by the generated google-sheets4
/// client. Owns a Tokio runtime so the sync [`SubmissionStore`] trait can
/// drive the async client; callers must invoke it from a blocking context.
pub struct GoogleSheetsSubmissionStore {
    hub: Sheets<SheetsConnector>,
    runtime: Runtime,
    spreadsheet_id: String,
    worksheet_name: String,
    request_timeout: Duration,
    max_retries: u32,
}

impl GoogleSheetsSubmissionStore {
    /// Authenticate with the configured service account and build the hub.
    pub fn connect(config: &SubmissionConfig) -> Result<Self, SubmissionStoreError> {
        let spreadsheet_id = config
            .spreadsheet_id
            .clone()
            .ok_or(SubmissionStoreError::MissingSpreadsheetId)?;

        let runtime =
            Runtime::new().map_err(|err| SubmissionStoreError::Runtime(err.to_string()))?;
        let hub = runtime.block_on(build_hub(config))?;

        Ok(Self {
            hub,
            runtime,
            spreadsheet_id,
            worksheet_name: config.worksheet_name.clone(),
            request_timeout: config.request_timeout,
            max_retries: config.max_retries,
        })
    }

    fn try_append(&self, row: &[String]) -> Result<(), SubmissionStoreError> {
        let values = vec![row
            .iter()
            .map(|cell| serde_json::Value::String(cell.clone()))
            .collect::<Vec<_>>()];
        let request = ValueRange {
            values: Some(values),
            ..Default::default()
        };
        let range = format!("{}!A:Z", self.worksheet_name);

        let call = self
            .hub
            .spreadsheets()
            .values_append(request, &self.spreadsheet_id, &range)
            .value_input_option("RAW")
            .insert_data_option("INSERT_ROWS")
            .doit();

        let outcome = self
            .runtime
            .block_on(async { tokio::time::timeout(self.request_timeout, call).await });

        match outcome {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(SubmissionStoreError::Backend(err.to_string())),
            Err(_) => Err(SubmissionStoreError::Timeout(self.request_timeout)),
        }
    }
}

impl std::fmt::Debug for GoogleSheetsSubmissionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheetsSubmissionStore")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("worksheet_name", &self.worksheet_name)
            .finish_non_exhaustive()
    }
}

impl SubmissionStore for GoogleSheetsSubmissionStore {
    fn append_submission(&self, record: &SubmissionRecord) -> Result<(), SubmissionStoreError> {
        let row = record.to_row();
        let mut attempt: u32 = 0;

        loop {
            match self.try_append(&row) {
                Ok(()) => return Ok(()),
                Err(err) if attempt >= self.max_retries => return Err(err),
                Err(err) => {
                    warn!(attempt, error = %err, "sheets append failed, retrying");
                    thread::sleep(retry_delay(attempt));
                    attempt += 1;
                }
            }
        }
    }
}

async fn build_hub(
    config: &SubmissionConfig,
) -> Result<Sheets<SheetsConnector>, SubmissionStoreError> {
    let key = if let Some(json) = &config.service_account_json {
        yup_oauth2::parse_service_account_key(json)
            .map_err(|err| SubmissionStoreError::Credentials(err.to_string()))?
    } else if let Some(path) = &config.service_account_file {
        yup_oauth2::read_service_account_key(path)
            .await
            .map_err(|err| SubmissionStoreError::Credentials(err.to_string()))?
    } else {
        return Err(SubmissionStoreError::MissingCredentials);
    };

    let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
        .build()
        .await
        .map_err(|err| SubmissionStoreError::Credentials(err.to_string()))?;

    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .map_err(|err| SubmissionStoreError::Runtime(err.to_string()))?
        .https_only()
        .enable_http1()
        .build();
    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(connector);

    Ok(Sheets::new(client, auth))
}
