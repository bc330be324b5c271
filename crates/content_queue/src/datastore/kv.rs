use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    datastore::{QueueStore, HISTORY_LIMIT},
    HistoryEntry, QueueEntry,
};

/// Queue store backed by a Redis compatible REST endpoint (Upstash / Vercel KV).
///
/// The queue lives under a single string key holding a JSON array; history is a
/// list of JSON documents pushed to the head and trimmed to [`HISTORY_LIMIT`].
#[derive(Debug, Clone)]
pub struct KvQueueStore {
    http: reqwest::Client,
    url: String,
    token: String,
    queue_key: String,
    history_key: String,
}

#[derive(Debug, Deserialize)]
struct KvResponse {
    #[serde(default)]
    result: Value,
    error: Option<String>,
}

impl KvQueueStore {
    pub const QUEUE_KEY: &str = "youtube_queue_v3";
    pub const HISTORY_KEY: &str = "youtube_done_v3";

    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        KvQueueStore {
            http: reqwest::Client::new(),
            url: url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            queue_key: Self::QUEUE_KEY.into(),
            history_key: Self::HISTORY_KEY.into(),
        }
    }

    /// Overrides the keys, used to keep several deployments on one database
    pub fn with_keys(mut self, queue_key: impl Into<String>, history_key: impl Into<String>) -> Self {
        self.queue_key = queue_key.into();
        self.history_key = history_key.into();
        self
    }

    #[tracing::instrument(skip_all, fields(command = %args.first().map(String::as_str).unwrap_or_default()))]
    async fn command(&self, args: &[String]) -> anyhow::Result<Value> {
        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(args)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to reach KV endpoint"))
            .context("Failed to reach KV endpoint")?;

        let status = resp.status();
        let body = resp.text().await.context("Failed to read KV response")?;

        decode_response(status.as_u16(), &body)
    }
}

/// Unwraps the `{"result": ..}` / `{"error": ..}` envelope of the REST api
fn decode_response(status: u16, body: &str) -> anyhow::Result<Value> {
    let parsed = serde_json::from_str::<KvResponse>(body)
        .with_context(|| format!("Unexpected KV response ({status}): {body}"))?;

    if let Some(error) = parsed.error {
        anyhow::bail!("KV command failed ({status}): {error}");
    }
    if !(200..300).contains(&status) {
        anyhow::bail!("KV command failed ({status}): {body}");
    }

    Ok(parsed.result)
}

fn decode_entries(value: Value) -> anyhow::Result<Vec<QueueEntry>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(raw) if raw.trim().is_empty() => Ok(Vec::new()),
        Value::String(raw) => {
            serde_json::from_str(&raw).context("Queue key does not hold a JSON array of entries")
        }
        other => anyhow::bail!("Unexpected value stored under queue key: {other}"),
    }
}

fn decode_history(value: Value) -> anyhow::Result<Vec<HistoryEntry>> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => anyhow::bail!("Unexpected value stored under history key: {other}"),
    };

    Ok(items
        .into_iter()
        .filter_map(|item| {
            let raw = item.as_str()?;
            serde_json::from_str::<HistoryEntry>(raw)
                .inspect_err(|e| tracing::warn!(error = ?e, "Skipping unreadable history record"))
                .ok()
        })
        .collect())
}

impl QueueStore for KvQueueStore {
    async fn load_entries(&self) -> anyhow::Result<Vec<QueueEntry>> {
        let value = self
            .command(&["GET".into(), self.queue_key.clone()])
            .await
            .context("Failed to load queue")?;

        decode_entries(value)
    }

    async fn save_entries(&self, entries: &[QueueEntry]) -> anyhow::Result<()> {
        let payload = serde_json::to_string(entries)?;
        self.command(&["SET".into(), self.queue_key.clone(), payload])
            .await
            .context("Failed to save queue")?;
        Ok(())
    }

    async fn load_history(&self) -> anyhow::Result<Vec<HistoryEntry>> {
        let value = self
            .command(&[
                "LRANGE".into(),
                self.history_key.clone(),
                "0".into(),
                (HISTORY_LIMIT - 1).to_string(),
            ])
            .await
            .context("Failed to load history")?;

        decode_history(value)
    }

    async fn push_history(&self, entry: &HistoryEntry) -> anyhow::Result<()> {
        let payload = serde_json::to_string(entry)?;
        self.command(&["LPUSH".into(), self.history_key.clone(), payload])
            .await
            .context("Failed to record history")?;
        self.command(&[
            "LTRIM".into(),
            self.history_key.clone(),
            "0".into(),
            (HISTORY_LIMIT - 1).to_string(),
        ])
        .await
        .context("Failed to trim history")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VideoRef;
    use serde_json::json;

    #[test]
    fn test_decode_response_returns_result() {
        let value = decode_response(200, r#"{"result":"OK"}"#).unwrap();
        assert_eq!(value, json!("OK"));
    }

    #[test]
    fn test_decode_response_surfaces_error_field() {
        let err = decode_response(400, r#"{"error":"ERR wrong number of arguments"}"#).unwrap_err();
        assert!(err.to_string().contains("wrong number of arguments"));
    }

    #[test]
    fn test_decode_response_rejects_non_json() {
        assert!(decode_response(502, "Bad Gateway").is_err());
    }

    #[test]
    fn test_missing_queue_key_is_empty() {
        assert!(decode_entries(Value::Null).unwrap().is_empty());
        assert!(decode_entries(json!("")).unwrap().is_empty());
    }

    #[test]
    fn test_queue_entries_roundtrip_through_string_value() {
        let entries = vec![QueueEntry::new(VideoRef::new("snF5eGKoiJI"), "acme")];
        let stored = serde_json::to_string(&entries).unwrap();

        let decoded = decode_entries(Value::String(stored)).unwrap();
        assert_eq!(decoded, entries);
    }

    #[test]
    fn test_unreadable_history_records_are_skipped() {
        let good = HistoryEntry::posted(QueueEntry::new(VideoRef::new("snF5eGKoiJI"), "acme"), None);
        let value = json!([serde_json::to_string(&good).unwrap(), "{not json", 42]);

        let history = decode_history(value).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].video_id(), "snF5eGKoiJI");
    }

    #[test]
    fn test_history_under_wrong_type_is_an_error() {
        assert!(decode_history(Value::Null).unwrap().is_empty());
        assert!(decode_history(json!("youtube_done_v3")).is_err());
        assert!(decode_history(json!({"entries": []})).is_err());
    }
}
