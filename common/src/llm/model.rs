use crate::error::{DatagenError, Result};
use async_trait::async_trait;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SafetyPolicy {
    /// provider defaults
    #[default]
    Default,
    /// disable content blocking; generated rows are synthetic business data
    Permissive,
}

/// provider-neutral generation request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub system_instruction: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
    pub response_format: ResponseFormat,
    pub safety: SafetyPolicy,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system_instruction: None,
            temperature: 0.0,
            max_output_tokens: None,
            response_format: ResponseFormat::Text,
            safety: SafetyPolicy::Default,
        }
    }

    pub fn system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    pub fn json(mut self) -> Self {
        self.response_format = ResponseFormat::Json;
        self
    }

    pub fn permissive(mut self) -> Self {
        self.safety = SafetyPolicy::Permissive;
        self
    }
}

/// why the provider stopped generating a candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Normal,
    TokenLimitExceeded,
    ContentFiltered,
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub text: String,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerationResponse {
    pub candidates: Vec<Candidate>,
}

impl GenerationResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                text: text.into(),
                finish_reason: FinishReason::Normal,
            }],
        }
    }

    pub fn first(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    /// text of the first candidate, or `NoContent` when the provider returned none
    pub fn text(&self) -> Result<&str> {
        self.first()
            .map(|c| c.text.as_str())
            .ok_or(DatagenError::NoContent)
    }
}

/// narrow interface to a hosted language model
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse>;
}
