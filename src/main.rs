use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{Context, Result};
use crate::chart::PngChartRenderer;
use crate::config::{load_config, ConfigError};
use crate::cursor::FileCursorStore;
use crate::pipeline::{ensure_chart_dir, AnalysisPipeline, PipelineSettings};
use crate::polling::PollingService;
use crate::sentiment::VaderScorer;
use crate::twitter::{SocialClient, TwitterApiClient};
use tracing_subscriber::EnvFilter;
use tracing::{error, info};

mod chart;
mod classifier;
mod config;
mod cursor;
mod ledger;
mod models;
mod oauth;
mod pipeline;
mod polling;
mod sentiment;
mod twitter;

#[cfg(test)]
mod tests;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first so its log level can seed the filter
    let loaded = load_config();

    let log_level = match &loaded {
        Ok((settings, _)) => settings.log_level.clone(),
        Err(_) => "info".to_string(),
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    let (app_settings, credentials) = match loaded {
        Ok(loaded) => loaded,
        Err(e @ ConfigError::AuthConfigMissing(_)) => {
            error!("{}", e);
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("Failed to load configuration"),
    };
    info!("Auth tokens are configured");
    info!(
        "The bot has started and will run for {} seconds",
        app_settings.run_seconds
    );
    info!("Using log level: {}", log_level);

    let chart_dir = PathBuf::from(&app_settings.chart_dir);
    ensure_chart_dir(&chart_dir)
        .with_context(|| format!("Failed to create chart folder {}", chart_dir.display()))?;

    let client = TwitterApiClient::new(&app_settings, credentials)
        .with_context(|| "Failed to create API client")?;
    let client: Arc<dyn SocialClient> = Arc::new(client);

    let self_handle = client
        .whoami()
        .await
        .with_context(|| "Failed to retrieve the bot's own handle")?;
    info!("Authentication is performed successfully");
    info!("The application is ran under {} user", self_handle);

    let pipeline = AnalysisPipeline::new(
        client.clone(),
        Arc::new(VaderScorer::new()),
        Arc::new(PngChartRenderer::new()),
        PipelineSettings {
            pages: app_settings.timeline_pages,
            page_size: app_settings.timeline_page_size,
            out_dir: chart_dir,
        },
    );
    let cursor_store = Arc::new(FileCursorStore::new(&app_settings.cursor_file));
    info!("Last mention id is kept in {}", cursor_store.path().display());

    let polling_service = PollingService::new(
        client,
        pipeline,
        cursor_store,
        self_handle,
        &app_settings,
    );

    info!(
        "Starting polling service with interval of {} seconds...",
        app_settings.poll_interval_seconds
    );
    let final_state = polling_service.start_polling().await;
    info!(
        "Analyzed {} user(s) during this run; last mention id {:?}",
        final_state.ledger.analyzed_count(),
        final_state.cursor
    );

    Ok(())
}
