pub mod gemini;
pub mod model;

#[cfg(test)]
pub(crate) mod testing;

pub use gemini::GeminiClient;
pub use model::{
    Candidate, FinishReason, GenerationRequest, GenerationResponse, LlmClient, ResponseFormat,
    SafetyPolicy, DEFAULT_MODEL,
};
