#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use usdx_api::config::AppConfig;
use usdx_api::server::{router, AppState};
use usdx_api::storage::{MemoryStore, SharedStore};
use usdx_api::testing::ScriptedLlm;

pub const SECRET: &str = "integration-test-secret";

pub fn static_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static")
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.secret_key = SECRET.to_string();
    config.server.static_dir = static_dir();
    config
}

/// The full router driven in-process, over in-memory storage and a scripted LLM
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub llm: Arc<ScriptedLlm>,
    router: Router,
}

impl TestApp {
    /// Demo mode: users in memory, no dataset storage
    pub fn demo(llm: ScriptedLlm) -> Result<Self> {
        Self::build(llm, false)
    }

    /// Users and datasets share one in-memory bucket
    pub fn with_storage(llm: ScriptedLlm) -> Result<Self> {
        Self::build(llm, true)
    }

    fn build(llm: ScriptedLlm, with_storage: bool) -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(llm);
        let data_store = with_storage.then(|| store.clone() as SharedStore);

        let state = AppState::new(test_config(), store.clone(), data_store, llm.clone())?;
        let router = router(state.clone());
        Ok(Self { state, store, llm, router })
    }

    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Vec<u8>)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, bytes.to_vec()))
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        let request = Request::builder().method(Method::GET).uri(path).body(Body::empty())?;
        let (status, body) = self.send(request).await?;
        Ok((status, serde_json::from_slice(&body)?))
    }

    pub async fn get_text(&self, path: &str) -> Result<(StatusCode, String)> {
        let request = Request::builder().method(Method::GET).uri(path).body(Body::empty())?;
        let (status, body) = self.send(request).await?;
        Ok((status, String::from_utf8(body)?))
    }

    pub async fn post(&self, path: &str, body: &Value, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.post_raw(path, &serde_json::to_string(body)?, token).await
    }

    pub async fn post_raw(&self, path: &str, body: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let (status, body) = self.send(builder.body(Body::from(body.to_string()))?).await?;
        Ok((status, serde_json::from_slice(&body)?))
    }

    /// Sign up and return the issued token
    pub async fn signup(&self, email: &str, password: &str) -> Result<String> {
        let (status, body) = self
            .post("/signup", &serde_json::json!({"email": email, "password": password}), None)
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "signup failed: {} {}", status, body);
        body["token"].as_str().map(str::to_string).context("signup response had no token")
    }
}

/// The built `usdx-api` binary on a free port, killed on drop
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    pub fn spawn() -> Result<Self> {
        Self::spawn_with(&[("SECRET_KEY", SECRET)])
    }

    pub fn spawn_with(env: &[(&str, &str)]) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_usdx-api"));
        cmd.env("HOST", "127.0.0.1")
            .env("PORT", port.to_string())
            .env("STATIC_DIR", static_dir())
            .env("APP_ENV", "development")
            // Force demo mode and keep the process off the network
            .env_remove("DO_SPACES_KEY")
            .env_remove("DO_SPACES_SECRET")
            .env_remove("OPENROUTER_API_KEY")
            .env_remove("SECRET_KEY")
            .env_remove("SSL_CERT_PATH")
            .env_remove("SSL_KEY_PATH")
            .env_remove("USDX_CONFIG")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());
        for (key, value) in env {
            cmd.env(key, value);
        }

        let child = cmd.spawn().context("failed to spawn server binary")?;
        Ok(Self { port, base_url, child })
    }

    pub async fn wait_ready(&mut self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Some(status) = self.child.try_wait()? {
                anyhow::bail!("server exited early with {}", status);
            }
            if let Ok(resp) = client.get(format!("{}/ping", self.base_url)).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    /// Wait for the process to exit on its own
    pub async fn wait_exit(&mut self, timeout: Duration) -> Result<std::process::ExitStatus> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Some(status) = self.child.try_wait()? {
                return Ok(status);
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("server still running after {:?}", timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
