use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

use super::prompts::SYSTEM_PROMPT;
use super::CompletionService;
use crate::error::CompletionError;

/// Connection settings for an Azure OpenAI chat deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    /// Resource endpoint, e.g. "https://my-resource.openai.azure.com"
    pub endpoint: String,
    pub deployment: String,
    pub api_version: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://gptmodelbargain.openai.azure.com".to_string(),
            deployment: "gpt-35-turbo".to_string(),
            api_version: "2024-08-01-preview".to_string(),
            temperature: 0.7,
            max_tokens: 800,
            timeout_secs: 60,
        }
    }
}

impl CompletionSettings {
    pub fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Completion service backed by Azure OpenAI chat completions
pub struct AzureOpenAiClient {
    client: reqwest::Client,
    settings: CompletionSettings,
}

impl AzureOpenAiClient {
    pub fn new(settings: CompletionSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        info!("Completion service: {}", settings.url());

        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }
}

#[async_trait]
impl CompletionService for AzureOpenAiClient {
    async fn generate_medical_response(
        &self,
        user_text: &str,
        credential: &str,
    ) -> Result<String, CompletionError> {
        let request = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user_text,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let response = self
            .client
            .post(self.settings.url())
            .header("api-key", credential)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Error generating response: {}", e);
                CompletionError::RequestFailed(format!("HTTP request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            error!("Completion service returned {}", status);
            return Err(CompletionError::RequestFailed(format!(
                "Failed to generate response ({status})"
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::RequestFailed(format!("Response parse error: {e}")))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CompletionError::RequestFailed("Response contained no choices".to_string()))
    }

    fn name(&self) -> &str {
        "azure-openai"
    }
}
