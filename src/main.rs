use anyhow::Context;
use dotenv::dotenv;
use std::sync::Arc;
use tasks_api::api::auth::ApiKey;
use tasks_api::app_env::AppConfig;
use tasks_api::{SharedData, db, logging, persistence, routes};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let dotenv_loaded = dotenv().is_ok();
    let config = AppConfig::from_env().context("reading configuration")?;

    let otel_exporters = match config.otel {
        Some(ref endpoints) => Some(logging::init_exporters(
            &endpoints.span_export_url,
            &endpoints.metric_export_url,
        )?),
        None => None,
    };
    let env_filter = logging::init_env_filter(&config.log_level)
        .context("parsing the LOG_LEVEL directives")?;
    logging::setup_logging_and_tracing(env_filter, otel_exporters.as_ref())?;

    if !dotenv_loaded {
        warn!("No .env file found, using the process environment only");
    }
    if otel_exporters.is_none() {
        info!("OpenTelemetry export is disabled");
    }

    let db_pool = db::connect_sqlx(config.db_options, config.db_max_connections)
        .await
        .context("connecting to the database")?;
    let app_state = Arc::new(SharedData {
        ext_cxn: persistence::ExternalConnectivity::new(db_pool),
        api_key: ApiKey::new(&config.api_key),
    });
    let router = routes::build_router(app_state);

    let listener = TcpListener::bind(config.listen_address)
        .await
        .with_context(|| format!("binding to {}", config.listen_address))?;
    info!("Starting server on {}", config.listen_address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running the HTTP server")?;

    info!("Server stopped");
    if let Some(exporters) = otel_exporters {
        exporters.shutdown();
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for the shutdown signal: {err}");
        // Without a signal handler the server runs until killed
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested, draining in-flight requests");
}
