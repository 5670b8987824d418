use anyhow::Context;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, services::ServeFile, trace::TraceLayer};

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::handlers;
use crate::llm::{OpenRouterClient, SharedLlm};
use crate::middleware::jwt_auth_middleware;
use crate::redaction::{self, PiiGuard, RedactionError, Redactor};
use crate::services::{DataCollector, UserService};
use crate::storage::{self, MemoryStore, ObjectKeys, SharedStore};

/// Shared, immutable handler state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenService>,
    pub users: UserService,
    pub collector: DataCollector,
    pub redactor: Arc<Redactor>,
    pub guard: PiiGuard,
}

impl AppState {
    /// Wire state from explicit backends.
    ///
    /// `data_store` is `None` in demo mode; users then live in `user_store` alone.
    pub fn new(
        config: AppConfig,
        user_store: SharedStore,
        data_store: Option<SharedStore>,
        llm: SharedLlm,
    ) -> Result<Self, RedactionError> {
        let keys = ObjectKeys::new(config.spaces.prefix.clone());
        let redactor = redaction::create_redactor(
            llm.clone(),
            &config.redaction.technique,
            &config.redaction.level,
            Vec::new(),
            Vec::new(),
        )?;
        let guard = PiiGuard::new(redactor.config().mask());

        Ok(Self {
            tokens: Arc::new(TokenService::from_config(&config.security)),
            users: UserService::new(user_store, keys.clone()),
            collector: DataCollector::new(data_store, keys, llm),
            redactor: Arc::new(redactor),
            guard,
            config: Arc::new(config),
        })
    }

    /// Wire state against DO Spaces and OpenRouter, falling back to demo mode
    /// when storage credentials are absent.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let llm: SharedLlm = Arc::new(OpenRouterClient::from_config(&config.llm)?);
        if config.llm.api_key.is_none() {
            tracing::warn!("OPENROUTER_API_KEY not set, redaction will withhold all data");
        }

        let (user_store, data_store) = match storage::from_config(&config.spaces)? {
            Some(store) => {
                tracing::info!("Using {}", store.describe());
                (store.clone(), Some(store))
            }
            None => {
                tracing::warn!("DO Spaces not configured, running in demo mode with in-memory users");
                (Arc::new(MemoryStore::new()) as SharedStore, None)
            }
        };

        Ok(Self::new(config, user_store, data_store, llm)?)
    }
}

pub fn router(state: AppState) -> Router {
    let static_dir = state.config.server.static_dir.clone();

    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .merge(static_routes(&static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use handlers::public;

    Router::new()
        .route("/ping", get(public::ping_get))
        .route("/signup", post(public::signup_post))
        .route("/login", post(public::login_post))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::protected;

    Router::new()
        .route("/get_data", post(protected::get_data_post))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn static_routes(dir: &Path) -> Router<AppState> {
    Router::new()
        .route_service("/", ServeFile::new(dir.join("index.html")))
        .route_service("/api_docs.html", ServeFile::new(dir.join("api_docs.html")))
}

/// Bind and serve until ctrl-c. Uses HTTPS when both certificate files exist.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let server = state.config.server.clone();
    let addr: SocketAddr = server
        .bind_addr()
        .parse()
        .with_context(|| format!("invalid bind address {}", server.bind_addr()))?;
    let app = router(state);

    match server.tls_paths() {
        Some((cert, key)) => {
            let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key)
                .await
                .with_context(|| format!("failed to load TLS certificate {}", cert.display()))?;

            let handle = axum_server::Handle::new();
            tokio::spawn({
                let handle = handle.clone();
                async move {
                    shutdown_signal().await;
                    handle.graceful_shutdown(Some(Duration::from_secs(10)));
                }
            });

            tracing::info!("Starting HTTPS server on https://{}", addr);
            axum_server::bind_rustls(addr, tls)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            if server.ssl_cert_path.is_some() || server.ssl_key_path.is_some() {
                tracing::warn!("SSL certificate or key file missing, serving plain HTTP");
            } else {
                tracing::warn!("TLS not configured, serving plain HTTP");
            }

            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind {}", addr))?;
            tracing::info!("Starting HTTP server on http://{}", addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;

    fn config() -> AppConfig {
        let mut config = AppConfig::development();
        config.security.secret_key = "test-secret".into();
        config
    }

    #[test]
    fn state_uses_configured_redaction() {
        let mut config = config();
        config.redaction.technique = "mask".into();
        config.redaction.level = "paranoid".into();

        let state = AppState::new(config, Arc::new(MemoryStore::new()), None, Arc::new(ScriptedLlm::new())).unwrap();
        assert_eq!(state.redactor.config().technique, redaction::RedactionTechnique::Mask);
        assert!(state.collector.is_demo());
    }

    #[test]
    fn unknown_redaction_level_is_rejected() {
        let mut config = config();
        config.redaction.level = "extreme".into();
        let result = AppState::new(config, Arc::new(MemoryStore::new()), None, Arc::new(ScriptedLlm::new()));
        assert!(result.is_err());
    }

    #[test]
    fn demo_mode_without_spaces_credentials() {
        let state = AppState::from_config(config()).unwrap();
        assert!(state.collector.is_demo());
    }
}
