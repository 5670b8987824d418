use anyhow::anyhow;
use serde_json::{json, Value};

use crate::cli::client::ApiClient;
use crate::cli::config::{save_token, StoredToken};
use crate::cli::utils::{output_success, token_preview};
use crate::cli::OutputFormat;

pub async fn signup(
    client: &ApiClient,
    email: String,
    password: Option<String>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let password = require_password(password)?;
    let body = client.signup(&email, &password).await?;
    store_and_report(client, &email, &body, output_format)
}

pub async fn login(
    client: &ApiClient,
    email: String,
    password: Option<String>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let password = require_password(password)?;
    let body = client.login(&email, &password).await?;
    store_and_report(client, &email, &body, output_format)
}

fn require_password(password: Option<String>) -> anyhow::Result<String> {
    password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| anyhow!("Password required: pass --password or set USDX_PASSWORD"))
}

fn store_and_report(client: &ApiClient, email: &str, body: &Value, output_format: OutputFormat) -> anyhow::Result<()> {
    let token = body
        .get("token")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("Server response did not include a token"))?;
    let message = body.get("message").and_then(Value::as_str).unwrap_or("Authenticated");

    let path = save_token(&StoredToken::new(client.base_url(), email, token))?;
    tracing::debug!("Saved token to {}", path.display());

    output_success(
        output_format,
        &format!("{} as {} (token {})", message, email, token_preview(token)),
        Some(json!({ "email": email, "token": token, "token_file": path })),
    )
}
