mod auth;
mod config;
mod dispatcher;
mod error;
mod handlers;
mod metrics;
mod models;
mod rate_limit;
mod state;
mod transport;
mod validation;

use anyhow::Context;
use clap::Parser; // for cli
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::auth::TokenStore;
use crate::config::{Args, TransportKind};
use crate::dispatcher::NotificationDispatcher;
use crate::rate_limit::{RateLimiters, sweeper};
use crate::state::AppState;
use crate::transport::{LogTransport, ResendTransport, Transport};

// this is main async function with tokio
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional, real deployments set the environment directly
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("location_relay=info,tower_http=info")),
        )
        .init();

    // parse cli arguments
    let args = Args::parse();

    let tokens = TokenStore::from_list(&args.allowed_tokens);
    if tokens.is_empty() {
        tracing::warn!("ALLOWED_TOKENS is empty, every /send-location request will be rejected");
    }

    let transport = build_transport(&args)?;
    let limiters = Arc::new(RateLimiters::new(
        args.ip_rate_limit,
        args.device_rate_limit,
        Duration::from_secs(args.rate_window),
    ));

    // creating shared state
    let state = Arc::new(AppState {
        tokens,
        limiters: Arc::clone(&limiters),
        dispatcher: NotificationDispatcher::new(transport, &args.maps_base_url),
        trust_forwarded_for: args.trust_forwarded_for,
        disclose_auth_reason: args.disclose_auth_reason,
    });

    // spawn the background sweeper
    let sweep_every = Duration::from_secs(args.sweep_interval.max(1));
    tokio::spawn(async move {
        sweeper(limiters, sweep_every).await;
    });

    let app = handlers::router(Arc::clone(&state));

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(
        port = args.port,
        tokens = state.tokens.len(),
        transport = state.dispatcher.transport_name(),
        ip_limit = args.ip_rate_limit,
        device_limit = args.device_rate_limit,
        window_secs = args.rate_window,
        "api_started"
    );

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("server error")?;
    Ok(())
}

fn build_transport(args: &Args) -> anyhow::Result<Arc<dyn Transport>> {
    let transport: Arc<dyn Transport> = match args.transport {
        TransportKind::Resend => {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(args.send_timeout))
                .build()
                .context("failed to build HTTP client")?;
            if args.resend_api_key.is_none() || args.mail_from.is_none() {
                tracing::warn!(
                    "RESEND_API_KEY or MAIL_FROM missing, deliveries will fail until configured"
                );
            }
            Arc::new(ResendTransport::new(
                client,
                &args.resend_api_url,
                args.resend_api_key.clone(),
                args.mail_from.clone(),
            ))
        }
        TransportKind::Log => Arc::new(LogTransport),
    };
    Ok(transport)
}
