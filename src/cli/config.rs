use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// The last token issued by signup or login
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredToken {
    pub server: String,
    pub email: String,
    pub token: String,
    pub saved_at: DateTime<Utc>,
}

impl StoredToken {
    pub fn new(server: impl Into<String>, email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            email: email.into(),
            token: token.into(),
            saved_at: Utc::now(),
        }
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("USDX_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("usdx").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

fn token_file() -> anyhow::Result<PathBuf> {
    Ok(get_config_dir()?.join("token.json"))
}

pub fn load_token() -> anyhow::Result<Option<StoredToken>> {
    let path = token_file()?;
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

pub fn save_token(token: &StoredToken) -> anyhow::Result<PathBuf> {
    let path = token_file()?;
    fs::write(&path, serde_json::to_string_pretty(token)?)?;
    Ok(path)
}
