use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use voxsession::{AppState, Config, RecognitionService};

#[derive(Parser)]
#[command(name = "voxsession", about = "Recognition session orchestrator")]
struct Args {
    /// Config file (without extension), loaded via the config crate
    #[arg(long, default_value = "config/voxsession")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} starting", cfg.service.name);
    info!("primary vendor: {}", cfg.recognition.vendor);
    if cfg.recognition.backup_enabled {
        info!(
            "backup vendor: {}",
            cfg.recognition.backup_vendor.as_deref().unwrap_or("(none)")
        );
    }

    // Real vendor engines register here; the loopback "mock" vendor is
    // always available.
    let service = Arc::new(RecognitionService::from_config(&cfg));

    let state = AppState::new(service);
    let router = voxsession::create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("listening on {}", addr);

    axum::serve(listener, router)
        .await
        .context("http server failed")?;

    Ok(())
}
