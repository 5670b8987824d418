pub mod client;
pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER: &str = "http://localhost:6732";

#[derive(Parser)]
#[command(name = "usdx")]
#[command(about = "usdx - command-line client for the US Federal Data Exchange API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, env = "USDX_SERVER", default_value = DEFAULT_SERVER, help = "API base URL")]
    pub server: String,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Check that the server is up")]
    Ping,

    #[command(about = "Create an account and store its token")]
    Signup {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, env = "USDX_PASSWORD", hide_env_values = true, help = "Password")]
        password: Option<String>,
    },

    #[command(about = "Log in and store the token")]
    Login {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, env = "USDX_PASSWORD", hide_env_values = true, help = "Password")]
        password: Option<String>,
    },

    #[command(about = "Request data with a natural-language description")]
    GetData {
        #[arg(help = "What data you need, in plain language")]
        description: String,
        #[arg(long, help = "Bearer token (defaults to the stored token)")]
        token: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let client = client::ApiClient::new(&cli.server)?;

    match cli.command {
        Commands::Ping => commands::ping::handle(&client, output_format).await,
        Commands::Signup { email, password } => {
            commands::auth::signup(&client, email, password, output_format).await
        }
        Commands::Login { email, password } => {
            commands::auth::login(&client, email, password, output_format).await
        }
        Commands::GetData { description, token } => {
            commands::data::get_data(&client, description, token, output_format).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_get_data_with_token() {
        let cli = Cli::try_parse_from([
            "usdx",
            "--server",
            "http://api.example:6732",
            "get-data",
            "Colorado population",
            "--token",
            "abc",
        ])
        .unwrap();

        assert_eq!(cli.server, "http://api.example:6732");
        match cli.command {
            Commands::GetData { description, token } => {
                assert_eq!(description, "Colorado population");
                assert_eq!(token.as_deref(), Some("abc"));
            }
            _ => panic!("expected get-data"),
        }
    }

    #[test]
    fn json_flag_is_global() {
        let cli = Cli::try_parse_from(["usdx", "ping", "--json"]).unwrap();
        assert_eq!(OutputFormat::from_cli(&cli), OutputFormat::Json);
    }
}
