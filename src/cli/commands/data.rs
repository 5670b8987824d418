use anyhow::anyhow;
use serde_json::Value;

use crate::cli::client::ApiClient;
use crate::cli::config::load_token;
use crate::cli::utils::output_document;
use crate::cli::OutputFormat;

pub async fn get_data(
    client: &ApiClient,
    description: String,
    token: Option<String>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let token = match token {
        Some(token) => token,
        None => {
            let stored = load_token()?.ok_or_else(|| anyhow!("No stored token: run `usdx login` first or pass --token"))?;
            if stored.server != client.base_url() {
                tracing::warn!("Stored token was issued by {}, not {}", stored.server, client.base_url());
            }
            stored.token
        }
    };

    let body = client.get_data(&description, &token).await?;

    if output_format == OutputFormat::Text {
        if let Some(meta) = body.get("metadata") {
            let records = meta.get("records_returned").and_then(Value::as_u64).unwrap_or(0);
            let seconds = meta.get("processing_time_seconds").and_then(Value::as_f64).unwrap_or(0.0);
            println!("{} record(s) in {:.2}s, privacy redaction applied", records, seconds);
        }
        let data = body.get("data").unwrap_or(&body);
        return output_document(output_format, "Data:", data);
    }

    output_document(output_format, "", &body)
}
