use clap::Parser;
use tracing_subscriber::EnvFilter;
use usdx_api::cli::utils::output_error;
use usdx_api::cli::{Cli, OutputFormat};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("USDX_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_format = OutputFormat::from_cli(&cli);

    if let Err(e) = usdx_api::cli::run(cli).await {
        let message = match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => format!("{e:?}"),
            _ => format!("{e:#}"),
        };
        let _ = output_error(output_format, &message);
        std::process::exit(1);
    }
}
