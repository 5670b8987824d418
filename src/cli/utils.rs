use serde_json::{json, Map, Value};

use crate::cli::OutputFormat;

/// Report a completed command. In JSON mode `extra` object fields are merged into the body.
pub fn output_success(format: OutputFormat, message: &str, extra: Option<Value>) -> anyhow::Result<()> {
    if format == OutputFormat::Text {
        println!("✓ {}", message);
        return Ok(());
    }

    let mut body = Map::new();
    body.insert("success".into(), Value::Bool(true));
    body.insert("message".into(), Value::String(message.to_string()));
    if let Some(Value::Object(fields)) = extra {
        body.extend(fields);
    }
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

pub fn output_error(format: OutputFormat, message: &str) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let body = json!({ "success": false, "error": message });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => eprintln!("Error: {}", message),
    }
    Ok(())
}

/// Print a JSON document as-is in JSON mode, or pretty-printed under a heading in text mode
pub fn output_document(format: OutputFormat, heading: &str, document: &Value) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(document)?),
        OutputFormat::Text => {
            println!("{}", heading);
            println!("{}", serde_json::to_string_pretty(document)?);
        }
    }
    Ok(())
}

/// Last few characters of a token, enough to tell tokens apart
pub fn token_preview(token: &str) -> String {
    let tail: String = token.chars().rev().take(8).collect::<Vec<_>>().into_iter().rev().collect();
    format!("…{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_preview_keeps_tail() {
        assert_eq!(token_preview("aaaa.bbbb.cccc12345678"), "…12345678");
        assert_eq!(token_preview("abc"), "…abc");
    }
}
