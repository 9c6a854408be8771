use super::model::{GenerationRequest, GenerationResponse, LlmClient};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Mutex;

type Responder = dyn Fn(&GenerationRequest) -> Result<GenerationResponse> + Send + Sync;

/// in-process llm that answers from a closure and records every request
pub struct ScriptedLlm {
    responder: Box<Responder>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedLlm {
    pub fn new(
        responder: impl Fn(&GenerationRequest) -> Result<GenerationResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// always answer with `text` and a normal finish
    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(GenerationResponse::from_text(text.clone())))
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        self.requests.lock().unwrap().push(request.clone());
        (self.responder)(&request)
    }
}
