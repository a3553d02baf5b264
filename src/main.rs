//! Hookway webhook ingestion gateway.
//!
//! Main entry point. Loads settings and the path configuration document,
//! wires the pipeline to the document store and serves until shutdown.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use hookway_api::{resolve_config_document, start_server, HttpParameterStore, Settings};
use hookway_core::{Handler, PolicyRegistry};
use hookway_store::HttpDocumentStore;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;

    init_tracing(&settings.rust_log)?;

    info!(?settings, "Starting hookway webhook gateway");

    let document = load_config_document(&settings).await?;
    let registry =
        PolicyRegistry::from_json(&document).context("Failed to parse path configuration")?;
    info!(paths = registry.len(), "Path configuration loaded");

    let store = HttpDocumentStore::new(settings.to_store_config())
        .context("Failed to create document store client")?;

    let handler = Handler::new(Arc::new(store), Arc::new(registry), settings.workspace.as_str());
    let addr = settings.parse_server_addr()?;

    info!(addr = %addr, "Hookway is ready to receive webhooks");

    start_server(handler, addr, settings.request_timeout()).await.context("Server failed")?;

    info!("Hookway shutdown complete");
    Ok(())
}

/// Initializes tracing with the configured filter.
fn init_tracing(filter: &str) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_new(filter).context("Invalid RUST_LOG filter")?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing")
}

/// Reads the path configuration document from its configured source.
async fn load_config_document(settings: &Settings) -> Result<String> {
    let source = settings.config_source()?;

    let parameters = HttpParameterStore::new(
        &settings.parameters_endpoint,
        settings.aws_session_token.clone(),
        Duration::from_secs(settings.store_timeout),
    )
    .context("Failed to create parameter store client")?;

    resolve_config_document(&source, &parameters)
        .await
        .context("Failed to retrieve path configuration")
}
