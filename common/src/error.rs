use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatagenError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("llm request failed: {0}")]
    Llm(String),

    #[error("the api response does not contain valid content; it may have been blocked for an unspecified reason")]
    NoContent,

    #[error("the model reached the max tokens limit ({limit}) before completing the response; raise the limit and retry")]
    TokenLimit { limit: u32 },

    #[error("the response for table '{table}' was blocked by the api safety filters")]
    ContentFiltered { table: String },

    #[error("data generation stopped for an unexpected reason: {0}")]
    UnexpectedFinish(String),

    #[error("no valid json array was found in the response: {0}")]
    MissingJsonArray(String),

    #[error("invalid table data: {0}")]
    InvalidTable(String),

    #[error("tracing is not configured; set the langfuse or otlp environment variables")]
    TracingUnavailable,

    #[error("trace delivery failed: {0}")]
    Trace(String),

    #[error("error connecting to the database: {0}")]
    Connection(String),

    #[error("database error: could not execute the query. {0}")]
    Query(String),

    #[error("tracing initialization failed: {0}")]
    Tracing(String),
}

pub type Result<T> = std::result::Result<T, DatagenError>;
