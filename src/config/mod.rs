use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 6732;
pub const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-4o-mini";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path} could not be read: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("configuration already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub spaces: SpacesConfig,
    pub llm: LlmConfig,
    pub security: SecurityConfig,
    pub redaction: RedactionSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub ssl_cert_path: Option<PathBuf>,
    pub ssl_key_path: Option<PathBuf>,
    pub static_dir: PathBuf,
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpacesConfig {
    pub key: Option<String>,
    #[serde(skip_serializing)]
    pub secret: Option<String>,
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub secret_key: String,
    pub token_ttl_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionSettings {
    pub technique: String,
    pub level: String,
}

impl SpacesConfig {
    /// Object storage is only used when both credentials are present.
    pub fn is_configured(&self) -> bool {
        matches!((&self.key, &self.secret), (Some(k), Some(s)) if !k.is_empty() && !s.is_empty())
    }

    pub fn endpoint_url(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.digitaloceanspaces.com", self.region))
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Certificate and key paths, only when both are configured and exist on disk.
    pub fn tls_paths(&self) -> Option<(&Path, &Path)> {
        match (&self.ssl_cert_path, &self.ssl_key_path) {
            (Some(cert), Some(key)) if cert.exists() && key.exists() => Some((cert, key)),
            _ => None,
        }
    }
}

impl AppConfig {
    /// Load a KEY=VALUE file into the process environment, then read it.
    ///
    /// An explicit `path` must exist. Without one, `.env` in the working
    /// directory is used if present. Variables already set in the process
    /// environment always win over file values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_fallback(path, Path::new(".env"))
    }

    fn load_with_fallback(path: Option<&Path>, fallback: &Path) -> Result<Self, ConfigError> {
        match path {
            Some(path) => dotenvy::from_path(path).map_err(|source| ConfigError::File {
                path: path.to_path_buf(),
                source,
            })?,
            None => {
                if dotenvy::from_path(fallback).is_ok() {
                    tracing::debug!("Loaded {}", fallback.display());
                }
            }
        }
        Ok(Self::from_env())
    }

    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Some(v) = non_empty("SSL_CERT_PATH") {
            self.server.ssl_cert_path = Some(PathBuf::from(v));
        }
        if let Some(v) = non_empty("SSL_KEY_PATH") {
            self.server.ssl_key_path = Some(PathBuf::from(v));
        }
        if let Some(v) = non_empty("STATIC_DIR") {
            self.server.static_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("DEBUG") {
            self.server.debug = parse_bool(&v).unwrap_or(self.server.debug);
        }

        // Object storage overrides
        self.spaces.key = non_empty("DO_SPACES_KEY").or(self.spaces.key);
        self.spaces.secret = non_empty("DO_SPACES_SECRET").or(self.spaces.secret);
        if let Some(v) = non_empty("DO_SPACES_BUCKET") {
            self.spaces.bucket = v;
        }
        if let Some(v) = non_empty("DO_SPACES_REGION") {
            self.spaces.region = v;
        }
        self.spaces.endpoint = non_empty("DO_SPACES_ENDPOINT").or(self.spaces.endpoint);
        if let Ok(v) = env::var("DO_SPACES_PREFIX") {
            self.spaces.prefix = v;
        }

        // LLM overrides
        self.llm.api_key = non_empty("OPENROUTER_API_KEY").or(self.llm.api_key);
        if let Some(v) = non_empty("OPENROUTER_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = non_empty("OPENROUTER_URL") {
            self.llm.url = v;
        }
        if let Ok(v) = env::var("OPENROUTER_TIMEOUT_SECS") {
            self.llm.timeout_secs = v.parse().unwrap_or(self.llm.timeout_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("SECRET_KEY") {
            self.security.secret_key = v;
        }
        if let Ok(v) = env::var("TOKEN_TTL_DAYS") {
            self.security.token_ttl_days = v.parse().unwrap_or(self.security.token_ttl_days);
        }

        // Redaction overrides
        if let Some(v) = non_empty("REDACTION_TECHNIQUE") {
            self.redaction.technique = v;
        }
        if let Some(v) = non_empty("REDACTION_LEVEL") {
            self.redaction.level = v;
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: DEFAULT_PORT,
                ssl_cert_path: None,
                ssl_key_path: None,
                static_dir: PathBuf::from("static"),
                debug: true,
            },
            spaces: SpacesConfig::default(),
            llm: LlmConfig::default(),
            security: SecurityConfig {
                secret_key: String::new(),
                token_ttl_days: 30,
            },
            redaction: RedactionSettings::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                debug: false,
                ..Self::development().server
            },
            ..Self::development()
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                debug: false,
                ..Self::development().server
            },
            llm: LlmConfig {
                timeout_secs: 120,
                ..LlmConfig::default()
            },
            ..Self::development()
        }
    }
}

impl Default for SpacesConfig {
    fn default() -> Self {
        Self {
            key: None,
            secret: None,
            bucket: "usdx-data".to_string(),
            region: "nyc3".to_string(),
            endpoint: None,
            prefix: String::new(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_OPENROUTER_MODEL.to_string(),
            url: DEFAULT_OPENROUTER_URL.to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for RedactionSettings {
    fn default() -> Self {
        Self {
            technique: "both".to_string(),
            level: "standard".to_string(),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// Global singleton config - installed once at startup by the server binary
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// Install the configuration loaded by the binary. Fails if already set.
pub fn init(config: AppConfig) -> Result<&'static AppConfig, ConfigError> {
    CONFIG
        .try_insert(config)
        .map_err(|_| ConfigError::AlreadyInitialized)
}
