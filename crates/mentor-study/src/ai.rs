use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use mentor_core::config::AI_TIMEOUT_SECS;

use crate::error::{Result, StudyError};

/// Narrow seam to the generative backend. The core only sees text in,
/// text out; prompt construction and parsing stay with the callers.
#[async_trait]
pub trait AiAdapter: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiChat {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
        }
    }
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Deserialize)]
struct ApiMessage {
    content: String,
}

#[async_trait]
impl AiAdapter for OpenAiChat {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        // Callers that need JSON say so in the prompt and validate the reply;
        // the adapter itself promises nothing about the shape.
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are an educational assistant for class 11 and 12 students."
                },
                { "role": "user", "content": prompt }
            ],
        });

        debug!(model = %self.model, "sending generation request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .timeout(Duration::from_secs(AI_TIMEOUT_SECS))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StudyError::Timeout
                } else {
                    StudyError::Http(e)
                }
            })?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "generation API error");
            return Err(StudyError::Provider(format!("status {status}: {text}")));
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .map_err(|e| StudyError::InvalidJson(e.to_string()))?;

        api_resp
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| StudyError::Provider("empty choices".into()))
    }
}
