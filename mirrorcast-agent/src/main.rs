//! Mirrorcast agent entry point.
//!
//! ```text
//! mirrorcast-agent                     Run with ./mirrorcast-agent.toml
//! mirrorcast-agent --config <path>     Load a custom config TOML
//! mirrorcast-agent --select <module>   Override the startup selection
//! mirrorcast-agent --gen-config        Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mirrorcast_agent::config::AgentConfig;
use mirrorcast_agent::service::AgentService;
use mirrorcast_agent::transport;
use mirrorcast_core::module::ModuleId;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "mirrorcast-agent", about = "Mirrorcast streaming agent")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "mirrorcast-agent.toml")]
    config: PathBuf,

    /// Module to select at startup (overrides `modules.default`).
    #[arg(short, long)]
    select: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        println!("{}", AgentConfig::default_toml()?);
        return Ok(());
    }

    // Load config.
    let mut config = AgentConfig::load(&cli.config);
    if let Some(id) = cli.select {
        config.modules.default = Some(ModuleId::new(id));
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("mirrorcast-agent v{}", env!("CARGO_PKG_VERSION"));
    info!("platform level: {}", config.platform.platform_level);
    info!("max supervision restarts: {}", config.supervisor.max_restarts);

    let service = AgentService::new(config)?;
    let stop = service.stop_handle();

    // Ctrl-C handler.
    let stop_clone = stop.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received; shutting down");
        stop_clone.cancel();
    });

    // Inbound events from stdin.
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
        if let Err(e) = transport::pump(BufReader::new(tokio::io::stdin()), tx).await {
            warn!("inbound stream failed: {e}");
        }
    });

    service.run(rx).await?;

    Ok(())
}
