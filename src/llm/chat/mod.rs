pub mod mock;
pub mod openai;

use async_trait::async_trait;
use serde::{ Deserialize, Serialize };
use std::sync::Arc;
use thiserror::Error;
use super::{ LlmConfig, LlmType };
use self::openai::OpenAIChatClient;
use crate::models::chat::ChatMessage;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub response: String,
}

/// Failures of a chat-completion call, as seen by the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Gateway client is not configured: {0}")]
    NotConfigured(String),

    #[error("Gateway did not answer within {0:?}")]
    Timeout(std::time::Duration),

    #[error("Network error talking to the gateway: {0}")]
    Network(String),

    #[error("Gateway rejected the credentials (HTTP {0})")]
    Unauthorized(u16),

    #[error("Gateway rate limit exceeded")]
    RateLimited,

    #[error("Gateway returned HTTP {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },

    #[error("Gateway response could not be decoded: {0}")]
    Malformed(String),

    #[error("Gateway returned no completion")]
    EmptyResponse,
}

impl GatewayError {
    /// Stable identifier used in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Timeout(_) => "gateway_timeout",
            GatewayError::Unauthorized(_) => "gateway_unauthorized",
            GatewayError::RateLimited => "gateway_rate_limited",
            _ => "gateway_error",
        }
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends `messages` in order and returns the first choice's text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<CompletionResponse, GatewayError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, GatewayError> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::OpenRouter | LlmType::OpenAI => {
            let specific_client = OpenAIChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}
