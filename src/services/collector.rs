use futures::future::join_all;
use serde_json::{json, Value};
use thiserror::Error;

use crate::llm::{extract_json, CompletionRequest, LlmError, SharedLlm};
use crate::storage::{self, ObjectKeys, SharedStore, StorageError};

/// Only this many metadata objects are shown to the matcher.
pub const METADATA_LIMIT: usize = 10;

const MATCHER_SYSTEM_PROMPT: &str =
    "You are a federal data matching system. Analyze requests and return matching dataset IDs as JSON.";

#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("Dataset matcher reply was not JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Resolves a natural-language request to datasets in object storage.
///
/// Every failure path degrades to [`sample_data`], so `collect` never errors.
#[derive(Clone)]
pub struct DataCollector {
    store: Option<SharedStore>,
    keys: ObjectKeys,
    llm: SharedLlm,
}

impl DataCollector {
    /// `store` is `None` in demo mode.
    pub fn new(store: Option<SharedStore>, keys: ObjectKeys, llm: SharedLlm) -> Self {
        Self { store, keys, llm }
    }

    pub fn is_demo(&self) -> bool {
        self.store.is_none()
    }

    pub async fn collect(&self, description: &str) -> Value {
        let Some(store) = &self.store else {
            return json!({
                "note": "Demo mode - cloud storage not configured",
                "sample_data": sample_data(description),
            });
        };

        match self.collect_from(store, description).await {
            Ok(datasets) if !datasets.is_empty() => {
                tracing::info!("Collected {} dataset(s)", datasets.len());
                Value::Array(datasets)
            }
            Ok(_) => {
                tracing::info!("No datasets matched, returning sample data");
                sample_data(description)
            }
            Err(e) => {
                tracing::error!("Data collection failed: {}", e);
                sample_data(description)
            }
        }
    }

    async fn collect_from(&self, store: &SharedStore, description: &str) -> Result<Vec<Value>, CollectError> {
        let metadata = self.load_metadata(store).await?;
        if metadata.is_empty() {
            return Ok(Vec::new());
        }

        let ids = self.match_datasets(description, &metadata).await?;
        tracing::debug!("Matcher selected {:?}", ids);

        let fetches = ids.iter().filter_map(|id| match self.keys.dataset(id) {
            Some(key) => Some(async move { (id, storage::get_json::<Value>(store.as_ref(), &key).await) }),
            None => {
                tracing::warn!("Ignoring unusable dataset id {:?}", id);
                None
            }
        });

        let mut datasets = Vec::with_capacity(ids.len());
        for (id, result) in join_all(fetches).await {
            match result {
                Ok(dataset) => datasets.push(dataset),
                Err(e) => tracing::warn!("Skipping dataset {}: {}", id, e),
            }
        }
        Ok(datasets)
    }

    async fn load_metadata(&self, store: &SharedStore) -> Result<Vec<Value>, CollectError> {
        let keys = store.list(&self.keys.metadata_prefix()).await?;

        let mut metadata = Vec::new();
        for key in keys.iter().filter(|k| k.ends_with(".json")).take(METADATA_LIMIT) {
            match storage::get_json::<Value>(store.as_ref(), key).await {
                Ok(value) => metadata.push(value),
                Err(e) => tracing::warn!("Skipping metadata {}: {}", key, e),
            }
        }
        Ok(metadata)
    }

    async fn match_datasets(&self, description: &str, metadata: &[Value]) -> Result<Vec<String>, CollectError> {
        let request = CompletionRequest::new(MATCHER_SYSTEM_PROMPT, matcher_prompt(description, metadata)?);
        let reply = self.llm.complete(request).await?;
        Ok(dataset_ids(&extract_json(&reply)?))
    }
}

fn matcher_prompt(description: &str, metadata: &[Value]) -> Result<String, serde_json::Error> {
    Ok(format!(
        "Given this data request: \"{}\"\n\n\
         Available datasets:\n{}\n\n\
         Return a JSON list of dataset IDs that best match the request. \
         Format: {{\"dataset_ids\": [\"id1\", \"id2\"]}}",
        description,
        serde_json::to_string_pretty(metadata)?
    ))
}

/// `dataset_ids` from the matcher reply. Missing or non-string entries are dropped.
fn dataset_ids(reply: &Value) -> Vec<String> {
    reply
        .get("dataset_ids")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

/// Fixed two-record sample returned when real data is unavailable.
pub fn sample_data(description: &str) -> Value {
    json!({
        "query": description,
        "source": "US Federal Data Exchange (Sample)",
        "records": [
            {
                "id": "FED-001",
                "category": "census",
                "data": {"location": "Colorado", "population": 5773714, "year": 2023}
            },
            {
                "id": "FED-002",
                "category": "economic",
                "data": {"gdp_growth": 2.5, "unemployment_rate": 3.8, "quarter": "Q4 2023"}
            }
        ],
        "note": "Sample data - configure cloud storage for real datasets"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::testing::ScriptedLlm;
    use std::sync::Arc;

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_json("metadata/census.json", &json!({"id": "census-2023", "title": "Census 2023"}))
            .await
            .unwrap();
        store
            .insert_json("metadata/jobs.json", &json!({"id": "jobs-q4", "title": "Jobs Q4"}))
            .await
            .unwrap();
        store
            .insert_json("data/census-2023.json", &json!({"state": "CO", "population": 5773714}))
            .await
            .unwrap();
        store
    }

    fn collector(store: Arc<MemoryStore>, llm: Arc<ScriptedLlm>) -> DataCollector {
        DataCollector::new(Some(store as SharedStore), ObjectKeys::default(), llm)
    }

    #[tokio::test]
    async fn demo_mode_returns_sample_with_note() {
        let llm = Arc::new(ScriptedLlm::new());
        let collector = DataCollector::new(None, ObjectKeys::default(), llm.clone());

        let result = collector.collect("population").await;
        assert_eq!(result["note"], "Demo mode - cloud storage not configured");
        assert_eq!(result["sample_data"]["query"], "population");
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn matched_datasets_are_fetched() {
        let llm = Arc::new(ScriptedLlm::new().reply(r#"{"dataset_ids": ["census-2023", "missing"]}"#));
        let collector = collector(seeded_store().await, llm.clone());

        let result = collector.collect("Colorado population").await;
        assert_eq!(result, json!([{"state": "CO", "population": 5773714}]));

        let calls = llm.calls();
        assert_eq!(calls[0].system, MATCHER_SYSTEM_PROMPT);
        assert!(calls[0].prompt.contains("Given this data request: \"Colorado population\""));
        assert!(calls[0].prompt.contains("jobs-q4"));
    }

    #[tokio::test]
    async fn empty_metadata_skips_llm() {
        let llm = Arc::new(ScriptedLlm::new());
        let collector = collector(Arc::new(MemoryStore::new()), llm.clone());

        let result = collector.collect("anything").await;
        assert_eq!(result["source"], "US Federal Data Exchange (Sample)");
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn no_matches_fall_back_to_sample() {
        let llm = Arc::new(ScriptedLlm::new().reply("Nothing fits: {\"dataset_ids\": []}"));
        let collector = collector(seeded_store().await, llm);
        assert_eq!(collector.collect("weather").await, sample_data("weather"));
    }

    #[tokio::test]
    async fn llm_failure_falls_back_to_sample() {
        let llm = Arc::new(ScriptedLlm::new().fail("rate limited"));
        let collector = collector(seeded_store().await, llm);
        assert_eq!(collector.collect("jobs").await, sample_data("jobs"));
    }

    #[tokio::test]
    async fn path_like_ids_are_ignored() {
        let llm = Arc::new(ScriptedLlm::new().reply(r#"{"dataset_ids": ["../users/x"]}"#));
        let collector = collector(seeded_store().await, llm);
        assert_eq!(collector.collect("users").await, sample_data("users"));
    }

    #[tokio::test]
    async fn metadata_is_capped() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..15 {
            store
                .insert_json(&format!("metadata/m{:02}.json", i), &json!({"id": format!("ds-{:02}", i)}))
                .await
                .unwrap();
        }
        let llm = Arc::new(ScriptedLlm::new().reply(r#"{"dataset_ids": []}"#));
        let collector = collector(store, llm.clone());
        collector.collect("x").await;

        let prompt = &llm.calls()[0].prompt;
        assert!(prompt.contains("ds-09"));
        assert!(!prompt.contains("ds-10"));
    }

    #[test]
    fn dataset_ids_tolerates_missing_field() {
        assert!(dataset_ids(&json!({"ids": ["a"]})).is_empty());
        assert_eq!(dataset_ids(&json!({"dataset_ids": ["a", 3, "b"]})), vec!["a", "b"]);
    }
}
