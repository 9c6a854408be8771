use super::model::{
    Candidate, FinishReason, GenerationRequest, GenerationResponse, LlmClient, ResponseFormat,
    SafetyPolicy,
};
use crate::error::{DatagenError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// client for the google generative language `generateContent` endpoint
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DatagenError::Llm(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    #[tracing::instrument(skip(self, request), fields(llm.model = %request.model, prompt_len = request.prompt.len()))]
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        let body = build_request(&request);

        let response = self
            .http
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DatagenError::Llm(format!("gemini api call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DatagenError::Llm(format!(
                "gemini api returned {}: {}",
                status, detail
            )));
        }

        let payload: GeminiResponse = response
            .json()
            .await
            .map_err(|e| DatagenError::Llm(format!("failed to decode gemini response: {}", e)))?;

        let normalized = normalize(payload);
        tracing::debug!(candidates = normalized.candidates.len(), "gemini call completed");
        Ok(normalized)
    }
}

fn build_request(request: &GenerationRequest) -> GeminiRequest {
    let safety_settings = match request.safety {
        SafetyPolicy::Default => Vec::new(),
        SafetyPolicy::Permissive => HARM_CATEGORIES
            .iter()
            .map(|&category| SafetySetting {
                category,
                threshold: "BLOCK_NONE",
            })
            .collect(),
    };

    GeminiRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: request.prompt.clone(),
            }],
        }],
        system_instruction: request.system_instruction.as_ref().map(|s| Content {
            role: None,
            parts: vec![Part { text: s.clone() }],
        }),
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_output_tokens,
            response_mime_type: match request.response_format {
                ResponseFormat::Json => Some("application/json"),
                ResponseFormat::Text => None,
            },
        },
        safety_settings,
    }
}

fn normalize(payload: GeminiResponse) -> GenerationResponse {
    let candidates = payload
        .candidates
        .into_iter()
        .map(|candidate| {
            let text = candidate
                .content
                .unwrap_or_default()
                .parts
                .into_iter()
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .join("");

            Candidate {
                text,
                finish_reason: finish_reason(candidate.finish_reason.as_deref()),
            }
        })
        .collect();

    GenerationResponse { candidates }
}

fn finish_reason(raw: Option<&str>) -> FinishReason {
    match raw {
        Some("STOP") => FinishReason::Normal,
        Some("MAX_TOKENS") => FinishReason::TokenLimitExceeded,
        Some("SAFETY") => FinishReason::ContentFiltered,
        Some(other) => FinishReason::Other(other.to_string()),
        None => FinishReason::Other("FINISH_REASON_UNSPECIFIED".to_string()),
    }
}
