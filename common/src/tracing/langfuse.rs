use crate::config::LangfuseConfig;
use crate::error::{DatagenError, Result};
use crate::tracing::sink::{SpanEnd, SpanHandle, TraceSink};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

const INGESTION_PATH: &str = "/api/public/ingestion";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// trace sink posting to the langfuse public ingestion api
pub struct LangfuseSink {
    http: reqwest::Client,
    config: LangfuseConfig,
}

impl LangfuseSink {
    pub fn new(config: LangfuseConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| DatagenError::Trace(format!("failed to build http client: {}", e)))?;

        Ok(Self { http, config })
    }

    async fn send(&self, batch: Vec<Value>) -> Result<()> {
        let url = format!("{}{}", self.config.host, INGESTION_PATH);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.public_key, Some(&self.config.secret_key))
            .json(&json!({ "batch": batch }))
            .send()
            .await
            .map_err(|e| DatagenError::Trace(format!("langfuse ingestion failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DatagenError::Trace(format!(
                "langfuse ingestion returned {}: {}",
                status, detail
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TraceSink for LangfuseSink {
    async fn start_span(&self, trace_name: &str, span_name: &str, input: Value) -> Result<SpanHandle> {
        let handle = SpanHandle::new(span_name);
        self.send(start_batch(&handle, trace_name, &input)).await?;
        Ok(handle)
    }

    async fn end_span(&self, span: &SpanHandle, end: SpanEnd) -> Result<()> {
        self.send(vec![end_event(span, &end)]).await
    }
}

fn event(kind: &str, body: Value) -> Value {
    json!({
        "id": Uuid::new_v4().to_string(),
        "type": kind,
        "timestamp": Utc::now().to_rfc3339(),
        "body": body,
    })
}

fn start_batch(handle: &SpanHandle, trace_name: &str, input: &Value) -> Vec<Value> {
    let now = Utc::now().to_rfc3339();
    vec![
        event(
            "trace-create",
            json!({
                "id": handle.trace_id,
                "name": trace_name,
                "input": input,
                "timestamp": now,
            }),
        ),
        event(
            "span-create",
            json!({
                "id": handle.span_id,
                "traceId": handle.trace_id,
                "name": handle.name,
                "input": input,
                "startTime": now,
            }),
        ),
    ]
}

fn end_event(handle: &SpanHandle, end: &SpanEnd) -> Value {
    let mut body = json!({
        "id": handle.span_id,
        "traceId": handle.trace_id,
        "output": end.output,
        "level": end.level.as_str(),
        "endTime": Utc::now().to_rfc3339(),
    });
    if let Some(message) = &end.status_message {
        body["statusMessage"] = json!(message);
    }
    event("span-update", body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_batch_links_span_to_trace() {
        let handle = SpanHandle::new("Gemini-SQL-Call");
        let batch = start_batch(&handle, "NL-to-SQL-Trace", &json!({"question": "q"}));

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0]["type"], "trace-create");
        assert_eq!(batch[0]["body"]["id"], handle.trace_id.as_str());
        assert_eq!(batch[0]["body"]["name"], "NL-to-SQL-Trace");
        assert_eq!(batch[1]["type"], "span-create");
        assert_eq!(batch[1]["body"]["traceId"], handle.trace_id.as_str());
        assert_eq!(batch[1]["body"]["input"]["question"], "q");
        assert_ne!(batch[0]["id"], batch[1]["id"]);
    }

    #[test]
    fn test_end_event_carries_level_and_status() {
        let handle = SpanHandle::new("Gemini-SQL-Call");

        let ok = end_event(&handle, &SpanEnd::ok(json!({"sql": "SELECT 1"})));
        assert_eq!(ok["type"], "span-update");
        assert_eq!(ok["body"]["level"], "DEFAULT");
        assert_eq!(ok["body"]["output"]["sql"], "SELECT 1");
        assert!(ok["body"].get("statusMessage").is_none());

        let failed = end_event(&handle, &SpanEnd::error(json!({"reason": "No SELECT statement"}), "ERROR"));
        assert_eq!(failed["body"]["level"], "ERROR");
        assert_eq!(failed["body"]["statusMessage"], "ERROR");
    }
}
