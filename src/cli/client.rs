use anyhow::{anyhow, Context};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

/// Thin HTTP client for the four API operations.
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(server: &str) -> anyhow::Result<Self> {
        let base = Url::parse(server).with_context(|| format!("invalid server URL '{}'", server))?;
        // Redaction makes two LLM calls, so allow well beyond a typical request
        let http = Client::builder().timeout(Duration::from_secs(180)).build()?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        Ok(self.base.join(path)?)
    }

    pub async fn ping(&self) -> anyhow::Result<Value> {
        let response = self.http.get(self.url("/ping")?).send().await?;
        read_json(response).await
    }

    pub async fn signup(&self, email: &str, password: &str) -> anyhow::Result<Value> {
        self.post("/signup", json!({"email": email, "password": password}), None).await
    }

    pub async fn login(&self, email: &str, password: &str) -> anyhow::Result<Value> {
        self.post("/login", json!({"email": email, "password": password}), None).await
    }

    pub async fn get_data(&self, description: &str, token: &str) -> anyhow::Result<Value> {
        self.post("/get_data", json!({"description": description}), Some(token)).await
    }

    async fn post(&self, path: &str, body: Value, token: Option<&str>) -> anyhow::Result<Value> {
        let mut request = self.http.post(self.url(path)?).json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .with_context(|| format!("could not reach {}", self.base_url()))?;
        read_json(response).await
    }
}

/// Decode a response body, turning non-2xx statuses into errors carrying the server's message.
async fn read_json(response: Response) -> anyhow::Result<Value> {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(body);
    }

    let message = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed"));
    Err(anyhow!("{} ({})", message, status.as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_onto_base() {
        let client = ApiClient::new("https://usdx.example:6732/").unwrap();
        assert_eq!(client.url("/get_data").unwrap().as_str(), "https://usdx.example:6732/get_data");
        assert_eq!(client.base_url(), "https://usdx.example:6732");
    }

    #[test]
    fn rejects_invalid_server() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
