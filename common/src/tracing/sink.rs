use crate::config::Config;
use crate::error::Result;
use crate::tracing::langfuse::LangfuseSink;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpanLevel {
    #[default]
    Default,
    Error,
}

impl SpanLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanLevel::Default => "DEFAULT",
            SpanLevel::Error => "ERROR",
        }
    }
}

/// identifies a started span inside its trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanHandle {
    pub trace_id: String,
    pub span_id: String,
    pub name: String,
}

impl SpanHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            span_id: Uuid::new_v4().to_string(),
            name: name.into(),
        }
    }
}

/// terminal update for a span
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpanEnd {
    pub output: Value,
    pub level: SpanLevel,
    pub status_message: Option<String>,
}

impl SpanEnd {
    pub fn ok(output: Value) -> Self {
        Self {
            output,
            level: SpanLevel::Default,
            status_message: None,
        }
    }

    pub fn error(output: Value, message: impl Into<String>) -> Self {
        Self {
            output,
            level: SpanLevel::Error,
            status_message: Some(message.into()),
        }
    }
}

/// receiver for audit traces around llm calls
#[async_trait]
pub trait TraceSink: Send + Sync {
    async fn start_span(&self, trace_name: &str, span_name: &str, input: Value) -> Result<SpanHandle>;

    async fn end_span(&self, span: &SpanHandle, end: SpanEnd) -> Result<()>;
}

/// sink that writes spans as structured log events; with the otlp layer
/// installed these reach the collector
pub struct LogSink;

#[async_trait]
impl TraceSink for LogSink {
    async fn start_span(&self, trace_name: &str, span_name: &str, input: Value) -> Result<SpanHandle> {
        let handle = SpanHandle::new(span_name);
        tracing::info!(
            trace.name = trace_name,
            trace.id = %handle.trace_id,
            span.name = span_name,
            span.id = %handle.span_id,
            input = %input,
            "span started"
        );
        Ok(handle)
    }

    async fn end_span(&self, span: &SpanHandle, end: SpanEnd) -> Result<()> {
        match end.level {
            SpanLevel::Default => tracing::info!(
                trace.id = %span.trace_id,
                span.id = %span.span_id,
                output = %end.output,
                "span ended"
            ),
            SpanLevel::Error => tracing::error!(
                trace.id = %span.trace_id,
                span.id = %span.span_id,
                output = %end.output,
                status = end.status_message.as_deref().unwrap_or(""),
                "span ended with error"
            ),
        }
        Ok(())
    }
}

/// pick the trace sink: langfuse when configured, else log events when the
/// otlp exporter is running, else none
pub fn select_trace_sink(config: &Config, otlp_active: bool) -> Result<Option<Arc<dyn TraceSink>>> {
    if let Some(langfuse) = &config.langfuse {
        tracing::info!(host = %langfuse.host, "langfuse trace sink enabled");
        return Ok(Some(Arc::new(LangfuseSink::new(langfuse.clone())?)));
    }

    if otlp_active {
        tracing::info!("otlp trace sink enabled");
        return Ok(Some(Arc::new(LogSink)));
    }

    tracing::debug!("no trace sink configured");
    Ok(None)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::DatagenError;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Recorded {
        Started { trace: String, span: String, input: Value },
        Ended { span: String, end: SpanEnd },
    }

    /// keeps every span event in memory
    #[derive(Default)]
    pub struct RecordingSink {
        events: Mutex<Vec<Recorded>>,
    }

    impl RecordingSink {
        pub fn events(&self) -> Vec<Recorded> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TraceSink for RecordingSink {
        async fn start_span(&self, trace_name: &str, span_name: &str, input: Value) -> Result<SpanHandle> {
            self.events.lock().unwrap().push(Recorded::Started {
                trace: trace_name.to_string(),
                span: span_name.to_string(),
                input,
            });
            Ok(SpanHandle::new(span_name))
        }

        async fn end_span(&self, span: &SpanHandle, end: SpanEnd) -> Result<()> {
            self.events.lock().unwrap().push(Recorded::Ended {
                span: span.name.clone(),
                end,
            });
            Ok(())
        }
    }

    /// rejects every delivery
    pub struct BrokenSink;

    #[async_trait]
    impl TraceSink for BrokenSink {
        async fn start_span(&self, _: &str, _: &str, _: Value) -> Result<SpanHandle> {
            Err(DatagenError::Trace("collector unreachable".to_string()))
        }

        async fn end_span(&self, _: &SpanHandle, _: SpanEnd) -> Result<()> {
            Err(DatagenError::Trace("collector unreachable".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_log_sink_round_trip() {
        let sink = LogSink;
        let span = sink
            .start_span("NL-to-SQL-Trace", "Gemini-SQL-Call", json!({"question": "q"}))
            .await
            .unwrap();

        assert_eq!(span.name, "Gemini-SQL-Call");
        assert_ne!(span.trace_id, span.span_id);
        assert!(sink
            .end_span(&span, SpanEnd::error(json!({}), "no select"))
            .await
            .is_ok());
    }

    #[test]
    fn test_select_trace_sink() {
        let bare = Config::from_lookup(|_| None).unwrap();
        assert!(select_trace_sink(&bare, false).unwrap().is_none());
        assert!(select_trace_sink(&bare, true).unwrap().is_some());

        let langfuse = Config::from_lookup(|key| match key {
            "LANGFUSE_PUBLIC_KEY" => Some("pk".to_string()),
            "LANGFUSE_SECRET_KEY" => Some("sk".to_string()),
            "LANGFUSE_HOST" => Some("http://localhost:3000".to_string()),
            _ => None,
        })
        .unwrap();
        assert!(select_trace_sink(&langfuse, false).unwrap().is_some());
    }

    #[test]
    fn test_span_end_constructors() {
        let ok = SpanEnd::ok(json!({"sql": "SELECT 1"}));
        assert_eq!(ok.level, SpanLevel::Default);
        assert!(ok.status_message.is_none());

        let err = SpanEnd::error(json!({"reason": "x"}), "ERROR");
        assert_eq!(err.level.as_str(), "ERROR");
        assert_eq!(err.status_message.as_deref(), Some("ERROR"));
    }
}
