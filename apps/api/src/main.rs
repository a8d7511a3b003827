mod config;
mod errors;
mod llm_client;
mod matching;
mod routes;
mod state;
#[cfg(test)]
mod test_support;
mod vacancy;

use anyhow::Result;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::build_provider;
use crate::routes::build_router;
use crate::state::AppState;
use crate::vacancy::resolver::VacancyResolver;

/// Redirect hops followed when fetching vacancy pages.
const MAX_REDIRECTS: usize = 10;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed values; a missing API key is allowed)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting vacancy-match v{}", env!("CARGO_PKG_VERSION"));

    // One outbound client for vacancy fetches and provider calls
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;

    let matcher = build_provider(&config.provider, config.language, client.clone());
    match &matcher {
        Some(provider) => info!(
            "Match provider initialized ({}, model: {})",
            provider.name(),
            config.provider.model
        ),
        None => warn!(
            "{} is not set; /match will answer 500 until it is",
            config.provider.kind.api_key_var()
        ),
    }

    let state = AppState {
        resolver: VacancyResolver::new(client),
        matcher,
        config: config.clone(),
    };

    let app = build_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
