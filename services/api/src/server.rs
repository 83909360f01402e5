use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cli::ServeArgs;
use crate::infra::{cors_layer, AppState};
use crate::routes::api_router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use career_diagnostic::catalog::Catalog;
use career_diagnostic::config::AppConfig;
use career_diagnostic::error::AppError;
use career_diagnostic::submission::create_submission_store;
use career_diagnostic::telemetry;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    // The catalog is loaded exactly once; handlers only ever see this
    // immutable snapshot.
    let catalog = Arc::new(Catalog::load(&config.catalog.data_dir)?);
    info!(
        questions = catalog.questions().len(),
        activities = catalog.activities().len(),
        "catalog loaded"
    );

    // Store setup may authenticate against Google over its own runtime, so
    // it must run off the async worker threads.
    let submission_config = Arc::new(config.submissions.clone());
    let store_config = config.submissions.clone();
    let submissions = tokio::task::spawn_blocking(move || create_submission_store(&store_config))
        .await
        .map_err(|err| AppError::Io(std::io::Error::other(err)))?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        catalog,
        submissions,
        submission_config,
    };

    let app = api_router()
        .layer(Extension(state))
        .layer(cors_layer(&config.cors))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "career diagnostic service ready");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
