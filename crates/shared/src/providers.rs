use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::ProviderSettings;
use crate::error::ProviderError;
use crate::models::ProviderKind;

/// Per-call hints passed to a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub system: Option<String>,
}

impl GenerationOptions {
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self {
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            top_p: settings.top_p,
            system: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::from_settings(&ProviderSettings::default())
    }
}

/// A text-generation backend.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, ProviderError>;
}

const OPENAI_SYSTEM: &str = "Je bent een expert Nederlandse jacht schrijver. Je MOET altijd \
    artikelen van minimaal 600 woorden schrijven. Kwaliteit EN lengte zijn beide essentieel. \
    Schrijf uitgebreid, gedetailleerd en informatief.";

const CLAUDE_SYSTEM: &str = "Je bent een ervaren Nederlandse jacht expert en schrijver. Je \
    specialiteit is het schrijven van uitgebreide, gedetailleerde artikelen van minimaal 600 \
    woorden. Elk artikel moet informatief, praktisch en volledig zijn.";

fn build_client(settings: &ProviderSettings) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(settings.timeout_secs))
        .build()
        .map_err(|e| ProviderError::Rejected(format!("Failed to create HTTP client: {}", e)))
}

/// Map a non-success HTTP status to the error kind the router cares about.
fn status_error(status: StatusCode, body: String) -> ProviderError {
    let message = format!("{} - {}", status, body);
    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        ProviderError::Transient(message)
    } else {
        ProviderError::Rejected(message)
    }
}

fn non_empty(text: Option<String>) -> Result<String, ProviderError> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ProviderError::Rejected("empty completion".to_string())),
    }
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    frequency_penalty: f32,
    presence_penalty: f32,
}

impl OpenAiProvider {
    pub fn new(api_key: String, settings: &ProviderSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(settings)?,
            api_key,
            model: settings.openai_model.clone(),
            base_url: settings.openai_base_url.trim_end_matches('/').to_string(),
            frequency_penalty: settings.frequency_penalty,
            presence_penalty: settings.presence_penalty,
        })
    }
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, ProviderError> {
        let system = options.system.clone().unwrap_or_else(|| OPENAI_SYSTEM.to_string());
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system,
                },
                Message {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(status_error(status, error_text));
        }

        let chat = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ProviderError::Rejected(format!("Failed to parse OpenAI response: {}", e)))?;

        non_empty(chat.choices.into_iter().next().and_then(|c| c.message.content))
    }
}

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    text: String,
}

pub struct ClaudeProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ClaudeProvider {
    pub fn new(api_key: String, settings: &ProviderSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(settings)?,
            api_key,
            model: settings.claude_model.clone(),
            base_url: settings.claude_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GenerationProvider for ClaudeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, ProviderError> {
        let request = ClaudeRequest {
            model: self.model.clone(),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            system: options.system.clone().unwrap_or_else(|| CLAUDE_SYSTEM.to_string()),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(status_error(status, error_text));
        }

        let claude_response = response
            .json::<ClaudeResponse>()
            .await
            .map_err(|e| ProviderError::Rejected(format!("Failed to parse Claude response: {}", e)))?;

        non_empty(claude_response.content.into_iter().next().map(|c| c.text))
    }
}
