use crate::agent::parser::{clean_sql, is_select};
use crate::agent::prompt::{build_sql_system_prompt, build_sql_user_prompt};
use crate::error::{DatagenError, Result};
use crate::llm::{GenerationRequest, LlmClient};
use crate::tracing::{SpanEnd, SpanHandle, TraceSink};
use serde_json::json;
use std::fmt;
use std::sync::Arc;

pub const TRACE_NAME: &str = "NL-to-SQL-Trace";
pub const SPAN_NAME: &str = "Gemini-SQL-Call";

/// prefix of every failed translation rendered as text
pub const ERROR_PREFIX: &str = "Error:";

const NOT_SELECT_MESSAGE: &str = "the llm response does not appear to be a SELECT statement";

/// outcome of a translation: one select statement or a failure message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    Sql(String),
    Error(String),
}

impl Translation {
    pub fn sql(&self) -> Option<&str> {
        match self {
            Translation::Sql(sql) => Some(sql),
            Translation::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Translation::Error(_))
    }
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Translation::Sql(sql) => f.write_str(sql),
            Translation::Error(message) => write!(f, "{} {}", ERROR_PREFIX, message),
        }
    }
}

/// translates questions into a single select statement over a known schema
pub struct SqlTranslator {
    llm: Arc<dyn LlmClient>,
    tracer: Option<Arc<dyn TraceSink>>,
    model: String,
}

impl SqlTranslator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tracer: Option<Arc<dyn TraceSink>>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            tracer,
            model: model.into(),
        }
    }

    /// translate `question` against `schema_ddl`.
    ///
    /// every llm or validation failure comes back as `Translation::Error`; the
    /// only `Err` is a missing trace sink, which fails closed before any call.
    #[tracing::instrument(skip(self, schema_ddl), fields(llm.model = %self.model))]
    pub async fn translate(
        &self,
        question: &str,
        schema_ddl: &str,
        temperature: f32,
    ) -> Result<Translation> {
        let tracer = self
            .tracer
            .as_ref()
            .ok_or(DatagenError::TracingUnavailable)?;

        let span = match tracer
            .start_span(
                TRACE_NAME,
                SPAN_NAME,
                json!({ "question": question, "schema": schema_ddl }),
            )
            .await
        {
            Ok(span) => Some(span),
            Err(e) => {
                tracing::warn!("could not open trace span: {}", e);
                None
            }
        };

        let request = GenerationRequest::new(self.model.as_str(), build_sql_user_prompt(question))
            .system(build_sql_system_prompt(schema_ddl))
            .temperature(temperature);

        let (translation, end) = match self.llm.generate(request).await.and_then(|r| {
            r.text().map(clean_sql)
        }) {
            Ok(sql) if is_select(&sql) => {
                let end = SpanEnd::ok(json!({ "sql": sql }));
                (Translation::Sql(sql), end)
            }
            Ok(sql) => {
                tracing::warn!(response = %sql, "llm response is not a select statement");
                let end = SpanEnd::error(
                    json!({ "sql": sql, "reason": "No SELECT statement" }),
                    "ERROR",
                );
                (Translation::Error(format!("{}.", NOT_SELECT_MESSAGE)), end)
            }
            Err(e) => {
                tracing::warn!("sql generation failed: {}", e);
                let end = SpanEnd::error(json!({ "error": e.to_string() }), "ERROR");
                (Translation::Error(format!("could not generate sql: {}", e)), end)
            }
        };

        if let Some(span) = span {
            close_span(tracer.as_ref(), &span, end).await;
        }

        Ok(translation)
    }
}

async fn close_span(tracer: &dyn TraceSink, span: &SpanHandle, end: SpanEnd) {
    if let Err(e) = tracer.end_span(span, end).await {
        tracing::warn!("could not close trace span: {}", e);
    }
}
