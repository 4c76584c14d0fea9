//! Tidings CLI entry point

mod cli;

use crate::cli::{Cli, Commands};
use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tidings::auth::{AuthGateway, Claims, TokenCodec};
use tidings::hub::{Hub, HubConfig, HubRegistry, RetentionPolicy};
use tidings::server::{run_server, AppState, WELL_KNOWN_PATH};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let secret = cli
        .secret
        .context("TIDINGS_SECRET or --secret is required")?;
    let codec = TokenCodec::new(secret.as_bytes(), &cli.algorithm)?;

    match cli.command {
        Commands::Serve {
            bind,
            public_url,
            capacity,
            max_age_secs,
            buffer,
        } => {
            serve(codec, bind, public_url, capacity, max_age_secs, buffer).await
        }
        Commands::Token {
            publish,
            subscribe,
            ttl_secs,
            claims,
        } => token(codec, publish, subscribe, ttl_secs, claims),
    }
}

async fn serve(
    codec: TokenCodec,
    bind: String,
    public_url: Option<String>,
    capacity: usize,
    max_age_secs: Option<u64>,
    buffer: usize,
) -> Result<()> {
    let bind_addr = bind.parse().context("Invalid bind address")?;
    let public_url =
        public_url.unwrap_or_else(|| format!("http://{bind}{WELL_KNOWN_PATH}"));

    let retention = RetentionPolicy {
        capacity,
        max_age: max_age_secs.map(Duration::from_secs),
    };
    retention.validate()?;

    let config = HubConfig {
        public_url,
        retention,
        subscriber_buffer: buffer,
    };

    let hub = Arc::new(Hub::new(AuthGateway::new(codec), config));
    let hubs = Arc::new(HubRegistry::single("default", hub));

    info!("Starting hub server...");
    run_server(bind_addr, AppState { hubs }).await?;

    Ok(())
}

fn token(
    codec: TokenCodec,
    publish: Vec<String>,
    subscribe: Vec<String>,
    ttl_secs: u64,
    claims: Option<String>,
) -> Result<()> {
    let payload = claims
        .map(|raw| serde_json::from_str(&raw).context("Invalid --claims JSON"))
        .transpose()?;

    let claims = Claims::new(
        (!publish.is_empty()).then_some(publish.clone()),
        (!subscribe.is_empty()).then_some(subscribe.clone()),
        payload,
        Duration::from_secs(ttl_secs),
    );

    let token = codec.sign(&claims)?;

    println!("{token}");
    println!();
    if !publish.is_empty() {
        println!("Publish:");
        for selector in &publish {
            println!("  {selector}");
        }
    }
    if !subscribe.is_empty() {
        println!("Subscribe:");
        for selector in &subscribe {
            println!("  {selector}");
        }
    }

    Ok(())
}
