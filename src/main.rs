//! Bank Term Deposit Predictor - Main Entry Point
//!
//! Loads the model artifact once, then serves the prediction form and JSON API.

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{Context, Result};
use std::sync::Arc;
use term_deposit_predictor::{
    config::{AppConfig, LoggingConfig},
    metrics::{MetricsReporter, PredictionMetrics},
    models::inference::InferenceEngine,
    server::{self, AppState},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log level")?;

    if logging.format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[actix_web::main]
async fn main() -> Result<()> {
    // Config path may be given as the first argument
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| AppConfig::DEFAULT_PATH.to_string());
    let config = AppConfig::load_from_path(&config_path)?;

    init_logging(&config.logging)?;
    info!(config = %config_path, "Starting Bank Term Deposit Predictor");

    let engine = Arc::new(
        InferenceEngine::new(&config).with_context(|| {
            format!(
                "Failed to load model artifact {}",
                config.model.artifact_path.display()
            )
        })?,
    );
    let info = engine.model_info();
    info!(
        model = %info.name,
        kind = %info.kind,
        features = info.features.len(),
        predict_proba = info.predict_proba,
        "Model ready"
    );

    let metrics = Arc::new(PredictionMetrics::new());

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let state = web::Data::new(AppState::new(
        engine,
        metrics.clone(),
        config.form.title.clone(),
    ));

    let bind_address = config.bind_address();
    info!("Listening on http://{}", bind_address);
    info!("   GET  /             - Prediction form");
    info!("   POST /predict      - Form submission");
    info!("   POST /api/predict  - JSON prediction");
    info!("   GET  /api/model    - Model information");
    info!("   GET  /api/metrics  - Service metrics");
    info!("   GET  /health       - Health check");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(server::configure)
    })
    .workers(config.server.workers.max(1))
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run()
    .await
    .context("HTTP server error")?;

    info!("Server shutting down...");
    metrics.print_summary();

    Ok(())
}
