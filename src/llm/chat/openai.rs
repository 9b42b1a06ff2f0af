use async_trait::async_trait;
use log::{ debug, warn };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };
use std::time::Duration;

use super::{ ChatClient, CompletionResponse, GatewayError };
use crate::llm::LlmConfig;
use crate::models::chat::ChatMessage;

const MAX_ERROR_BODY_CHARS: usize = 512;

/// Client for `/chat/completions` on OpenAI-compatible APIs (OpenRouter, OpenAI).
pub struct OpenAIChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
    request_timeout: Duration,
}

#[derive(Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

impl OpenAIChatClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        request_timeout: Duration
    ) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e|
                GatewayError::NotConfigured(format!("Invalid API key format: {}", e))
            )?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(request_timeout)
            .build()
            .map_err(|e| GatewayError::NotConfigured(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            model,
            base_url,
            request_timeout,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, GatewayError> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GatewayError::NotConfigured("API key is required".to_string()))?;
        let model = config.completion_model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| GatewayError::NotConfigured("Model name is required".to_string()))?;
        let base_url = config.base_url
            .clone()
            .unwrap_or_else(|| config.llm_type.default_base_url().to_string());

        Self::new(api_key, model, base_url, config.request_timeout)
    }

    fn completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else {
            format!("{}/chat/completions", base)
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(self.request_timeout)
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

fn status_error(status: u16, body: String) -> GatewayError {
    match status {
        401 | 403 => GatewayError::Unauthorized(status),
        429 => GatewayError::RateLimited,
        _ =>
            GatewayError::Status {
                status,
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            },
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<CompletionResponse, GatewayError> {
        let url = self.completions_url();
        let req = OpenAIChatRequest {
            model: &self.model,
            messages,
        };
        debug!("POST {} model={} messages={}", url, self.model, messages.len());

        let resp = self.http
            .post(&url)
            .json(&req)
            .send().await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("Gateway answered HTTP {}: {}", status, body);
            return Err(status_error(status.as_u16(), body));
        }

        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        let parsed: OpenAIResponse = serde_json::from_str(&body).map_err(|e|
            GatewayError::Malformed(e.to_string())
        )?;

        let content = parsed.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GatewayError::EmptyResponse)?;

        Ok(CompletionResponse { response: content })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}
