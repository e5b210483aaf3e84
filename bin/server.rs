// Receipt Scanner - Web Server
// POST /api/parse with Axum

use anyhow::{Context, Result};
use clap::Parser;
use receipt_scanner::logging::init_logging;
use receipt_scanner::{build_router, AppState, GatewayConfig, ModelGateway};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "receipt-server", version, about = "Receipt extraction endpoint")]
struct Args {
    /// Address to bind
    #[arg(long, env = "RECEIPT_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "RECEIPT_PORT", default_value_t = 3000)]
    port: u16,

    /// Model override (otherwise RECEIPT_MODEL or the default)
    #[arg(long)]
    model: Option<String>,

    /// Log level (RUST_LOG overrides)
    #[arg(long, default_value = "info")]
    log_level: String,
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    println!("🌐 Receipt Scanner - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut config = GatewayConfig::from_env();
    if let Some(model) = args.model {
        config = config.with_model(model);
    }

    // Credentials are resolved here so a bad setup never reaches the network
    let gateway = ModelGateway::connect(config).context("Cannot start without model credentials")?;
    println!("✓ Model: {} (credentials: {})", gateway.model(), gateway.provider_name());

    let state = AppState::new(Arc::new(gateway));
    let app = build_router(state);

    // Start server
    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: POST http://{}/api/parse", addr);
    println!("\n   Press Ctrl+C to stop\n");
    info!(%addr, "Listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
