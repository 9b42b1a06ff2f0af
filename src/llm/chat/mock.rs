//! In-process gateway for tests.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{ ChatClient, CompletionResponse, GatewayError };
use crate::models::chat::ChatMessage;

/// Records every message list it is sent and answers with a fixed outcome.
pub struct MockChatClient {
    outcome: Result<String, GatewayError>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockChatClient {
    pub fn replying(response: impl Into<String>) -> Self {
        Self {
            outcome: Ok(response.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: GatewayError) -> Self {
        Self {
            outcome: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<CompletionResponse, GatewayError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }
        self.outcome.clone().map(|response| CompletionResponse { response })
    }

    fn get_model(&self) -> String {
        "mock".to_string()
    }

    fn get_base_url(&self) -> Option<String> {
        None
    }
}
