use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub catalog: CatalogConfig,
    pub cors: CorsConfig,
    pub submissions: SubmissionConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let data_dir = env::var("APP_DATA_DIR")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));

        let allow_origins = parse_cors_origins(env::var("APP_CORS_ALLOW_ORIGINS").ok());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            catalog: CatalogConfig { data_dir },
            cors: CorsConfig { allow_origins },
            submissions: SubmissionConfig::from_env(),
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Location of the questionnaire and activity data files.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub data_dir: PathBuf,
}

/// Origins permitted to call the API from a browser.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
}

pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Normalize the `APP_CORS_ALLOW_ORIGINS` value into an origin list.
///
/// Deployment tooling hands this env var over in several shapes: a plain
/// comma-separated list, values wrapped in quotes, origins with a trailing
/// slash, or a JSON array. All of them are accepted; anything that
/// normalizes to nothing falls back to the localhost frontend origin.
pub fn parse_cors_origins(raw: Option<String>) -> Vec<String> {
    let Some(raw) = raw else {
        return vec![DEFAULT_CORS_ORIGIN.to_string()];
    };

    let trimmed = raw.trim();

    let candidates: Vec<String> = if trimmed.starts_with('[') {
        serde_json::from_str::<Vec<String>>(trimmed).unwrap_or_default()
    } else {
        trimmed.split(',').map(str::to_string).collect()
    };

    let origins: Vec<String> = candidates
        .iter()
        .map(|origin| {
            origin
                .trim()
                .trim_matches(|ch| ch == '"' || ch == '\'')
                .trim_end_matches('/')
                .to_string()
        })
        .filter(|origin| !origin.is_empty())
        .collect();

    if origins.is_empty() {
        vec![DEFAULT_CORS_ORIGIN.to_string()]
    } else {
        origins
    }
}

pub const DEFAULT_WORKSHEET_NAME: &str = "Submissions";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: f64 = 5.0;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_SCHEMA_VERSION: &str = "v1";

/// Controls for the optional Google Sheets submission log.
///
/// These knobs are deployment toggles rather than correctness settings, so
/// unparseable values fall back to their defaults instead of failing startup.
#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    pub sheets_enabled: bool,
    pub spreadsheet_id: Option<String>,
    pub worksheet_name: String,
    pub service_account_json: Option<String>,
    pub service_account_file: Option<String>,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub enable_visitor_hash: bool,
    pub visitor_hash_secret: Option<String>,
    pub schema_version: String,
}

impl SubmissionConfig {
    fn from_env() -> Self {
        let worksheet_name = non_empty(env::var("GOOGLE_SHEETS_WORKSHEET_NAME").ok())
            .unwrap_or_else(|| DEFAULT_WORKSHEET_NAME.to_string());
        let schema_version = non_empty(env::var("SUBMISSION_SCHEMA_VERSION").ok())
            .unwrap_or_else(|| DEFAULT_SCHEMA_VERSION.to_string());

        let timeout_seconds = parse_positive_f64(
            env::var("GOOGLE_SHEETS_REQUEST_TIMEOUT_SECONDS").ok(),
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
        );

        Self {
            sheets_enabled: parse_bool(env::var("GOOGLE_SHEETS_ENABLED").ok(), false),
            spreadsheet_id: non_empty(env::var("GOOGLE_SHEETS_SPREADSHEET_ID").ok()),
            worksheet_name,
            service_account_json: non_empty(env::var("GOOGLE_SERVICE_ACCOUNT_JSON").ok()),
            service_account_file: non_empty(env::var("GOOGLE_SERVICE_ACCOUNT_FILE").ok()),
            request_timeout: Duration::from_secs_f64(timeout_seconds),
            max_retries: parse_u32(env::var("GOOGLE_SHEETS_MAX_RETRIES").ok(), DEFAULT_MAX_RETRIES),
            enable_visitor_hash: parse_bool(env::var("ENABLE_VISITOR_HASH").ok(), false),
            visitor_hash_secret: non_empty(env::var("VISITOR_HASH_SECRET").ok()),
            schema_version,
        }
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_bool(raw: Option<String>, default: bool) -> bool {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_positive_f64(raw: Option<String>, default: f64) -> f64 {
    non_empty(raw)
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|parsed| *parsed > 0.0)
        .unwrap_or(default)
}

fn parse_u32(raw: Option<String>, default: u32) -> u32 {
    non_empty(raw)
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
