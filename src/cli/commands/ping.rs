use crate::cli::client::ApiClient;
use crate::cli::utils::{output_document, output_success};
use crate::cli::OutputFormat;

pub async fn handle(client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let body = client.ping().await?;

    match output_format {
        OutputFormat::Json => output_document(output_format, "", &body),
        OutputFormat::Text => {
            let service = body.get("service").and_then(|v| v.as_str()).unwrap_or("server");
            let timestamp = body.get("timestamp").and_then(|v| v.as_str()).unwrap_or("-");
            output_success(
                output_format,
                &format!("{} at {} is up ({})", service, client.base_url(), timestamp),
                None,
            )
        }
    }
}
