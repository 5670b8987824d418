use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use usdx_api::config::{self, AppConfig};
use usdx_api::server::{self, AppState};

#[derive(Parser)]
#[command(name = "usdx-api")]
#[command(about = "US Federal Data Exchange API server")]
#[command(version)]
struct Args {
    /// KEY=VALUE configuration file, loaded before the process environment
    #[arg(long, env = "USDX_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = config::init(AppConfig::load(args.config.as_deref())?)?;
    init_tracing(config.server.debug);

    tracing::info!("Starting US Federal Data Exchange API in {:?} mode", config.environment);

    if config.security.secret_key.is_empty() {
        anyhow::bail!("SECRET_KEY must be set");
    }

    let state = AppState::from_config(config.clone())?;
    server::serve(state).await
}

fn init_tracing(debug: bool) {
    let default = if debug { "info,usdx_api=debug,tower_http=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
