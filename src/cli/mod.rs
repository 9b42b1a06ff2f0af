use crate::assistant::DEFAULT_MAX_UPLOAD_BYTES;
use crate::llm::{ LlmConfig, LlmType };
use clap::Parser;
use std::error::Error;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Server Args ---
    /// Host address and port for the HTTP API to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:8000")]
    pub server_addr: String,

    /// Largest accepted request body in bytes (multipart overhead included).
    #[arg(long, env = "MAX_BODY_BYTES", default_value = "33554432")]
    pub max_body_bytes: usize,

    /// Uploads of this many bytes or more are answered with the file-too-large message.
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    // --- Chat LLM Provider Args ---
    /// Type of chat-completion provider (openrouter, openai)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "openrouter")]
    pub chat_llm_type: String,

    /// Base URL of the provider API (e.g., https://openrouter.ai/api/v1)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, the provider type picks one
    pub chat_base_url: Option<String>,

    /// API key sent as a bearer token to the provider.
    #[arg(long, env = "OPENROUTER_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    /// Model identifier passed with every completion (e.g., openai/gpt-4o-mini)
    #[arg(long, env = "MODEL_NAME", default_value = "")]
    pub model_name: String,

    /// Seconds to wait for the provider before giving up on a request.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "120")]
    pub request_timeout_secs: u64,

    // --- TLS Args ---
    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

impl Args {
    pub fn llm_config(&self) -> Result<LlmConfig, Box<dyn Error + Send + Sync>> {
        let llm_type: LlmType = self.chat_llm_type
            .parse()
            .map_err(|e| format!("Invalid chat LLM type: {}", e))?;

        if self.api_key.trim().is_empty() {
            return Err("OPENROUTER_API_KEY (--api-key) must be set".into());
        }
        if self.model_name.trim().is_empty() {
            return Err("MODEL_NAME (--model-name) must be set".into());
        }
        if self.request_timeout_secs == 0 {
            return Err("REQUEST_TIMEOUT_SECS must be greater than zero".into());
        }

        Ok(LlmConfig {
            llm_type,
            api_key: Some(self.api_key.clone()),
            completion_model: Some(self.model_name.clone()),
            base_url: self.chat_base_url.clone().filter(|u| !u.trim().is_empty()),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["upload-assistant"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn builds_llm_config_from_flags() {
        let args = parse(
            &[
                "--api-key",
                "sk-or-test",
                "--model-name",
                "openai/gpt-4o-mini",
                "--request-timeout-secs",
                "30",
            ]
        );
        let config = args.llm_config().unwrap();
        assert_eq!(config.llm_type, LlmType::OpenRouter);
        assert_eq!(config.api_key.as_deref(), Some("sk-or-test"));
        assert_eq!(config.completion_model.as_deref(), Some("openai/gpt-4o-mini"));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn upload_limit_defaults_to_ten_mebibytes() {
        let args = parse(&["--api-key", "k", "--model-name", "m"]);
        assert_eq!(args.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn rejects_missing_credentials_and_model() {
        let args = parse(&["--api-key", "", "--model-name", "m"]);
        assert!(args.llm_config().is_err());

        let args = parse(&["--api-key", "k", "--model-name", " "]);
        assert!(args.llm_config().is_err());
    }

    #[test]
    fn rejects_unknown_provider() {
        let args = parse(&["--api-key", "k", "--model-name", "m", "--chat-llm-type", "ollama"]);
        assert!(args.llm_config().is_err());
    }
}
