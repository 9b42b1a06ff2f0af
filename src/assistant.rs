use crate::config::prompt::{
    csv_insight_prompt,
    FILE_TOO_LARGE_RESPONSE,
    SYSTEM_PROMPT,
    UNSUPPORTED_FILE_RESPONSE,
};
use crate::history::parse_history;
use crate::llm::chat::{ ChatClient, GatewayError };
use crate::models::chat::{ ChatMessage, ContentPart, ImageUrl };
use crate::upload::{ summarize_csv, CsvError, FileKind, UploadedFile };

use base64::{ engine::general_purpose::STANDARD, Engine as _ };
use log::{ error, info, warn };
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Fields of one `POST /api/upload` call.
#[derive(Debug, Default, Clone)]
pub struct UploadRequest {
    pub file: Option<UploadedFile>,
    pub prompt: Option<String>,
    pub history: Option<String>,
}

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error(transparent)]
    Csv(#[from] CsvError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("CSV summary task failed: {0}")]
    Task(String),
}

/// Turns uploads into chat-completion calls.
#[derive(Clone)]
pub struct Assistant {
    chat_client: Arc<dyn ChatClient>,
    max_upload_bytes: usize,
}

impl Assistant {
    pub fn new(chat_client: Arc<dyn ChatClient>, max_upload_bytes: usize) -> Self {
        Self { chat_client, max_upload_bytes }
    }

    pub fn model(&self) -> String {
        self.chat_client.get_model()
    }

    /// Answers one upload. Oversized and unsupported files are answered
    /// locally; every other branch makes exactly one gateway call.
    pub async fn handle(&self, request: UploadRequest) -> Result<String, AssistantError> {
        let request_id = Uuid::new_v4();
        let prompt = request.prompt.unwrap_or_default();

        let file = match request.file {
            Some(file) => file,
            None => {
                let history = match parse_history(request.history.as_deref()) {
                    Ok(history) => history,
                    Err(e) => {
                        warn!("[{}] Ignoring malformed history: {}", request_id, e);
                        Vec::new()
                    }
                };
                info!("[{}] Text prompt with {} history message(s)", request_id, history.len());
                let messages = build_conversation(history, &prompt);
                return self.ask(request_id, &messages).await;
            }
        };

        if file.len() >= self.max_upload_bytes {
            info!(
                "[{}] Rejecting '{}' ({} bytes): limit is {} bytes",
                request_id,
                file.file_name,
                file.len(),
                self.max_upload_bytes
            );
            return Ok(FILE_TOO_LARGE_RESPONSE.to_string());
        }

        match file.kind() {
            FileKind::Image => {
                info!("[{}] Image upload '{}' ({})", request_id, file.file_name, file.content_type);
                let message = build_image_message(&prompt, &file.content_type, &file.bytes);
                self.ask(request_id, &[message]).await
            }
            FileKind::Csv => {
                info!("[{}] CSV upload '{}' ({} bytes)", request_id, file.file_name, file.len());
                let bytes = file.bytes;
                let summary = tokio::task::spawn_blocking(move || summarize_csv(&bytes)).await
                    .map_err(|e| AssistantError::Task(e.to_string()))?
                    .map_err(|e| {
                        error!("[{}] CSV could not be summarised: {}", request_id, e);
                        e
                    })?;
                let message = ChatMessage::user(csv_insight_prompt(&prompt, &summary));
                self.ask(request_id, &[message]).await
            }
            FileKind::Other => {
                info!(
                    "[{}] Unsupported upload '{}' ({})",
                    request_id,
                    file.file_name,
                    file.content_type
                );
                Ok(UNSUPPORTED_FILE_RESPONSE.to_string())
            }
        }
    }

    async fn ask(&self, request_id: Uuid, messages: &[ChatMessage]) -> Result<String, AssistantError> {
        match self.chat_client.complete(messages).await {
            Ok(completion) => {
                info!("[{}] Gateway answered ({} chars)", request_id, completion.response.len());
                Ok(completion.response)
            }
            Err(e) => {
                error!("[{}] Gateway call failed: {}", request_id, e);
                Err(e.into())
            }
        }
    }
}

/// `[system, ...history, user(prompt)]`
pub fn build_conversation(history: Vec<ChatMessage>, prompt: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(SYSTEM_PROMPT));
    messages.extend(history);
    messages.push(ChatMessage::user(prompt));
    messages
}

pub fn build_image_message(prompt: &str, content_type: &str, bytes: &[u8]) -> ChatMessage {
    ChatMessage::user_parts(
        vec![
            ContentPart::Text { text: prompt.to_string() },
            ContentPart::ImageUrl {
                image_url: ImageUrl { url: data_url(content_type, bytes) },
            }
        ]
    )
}

pub fn data_url(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::chat::mock::MockChatClient;
    use crate::models::chat::{ MessageContent, Role };

    fn assistant(mock: &Arc<MockChatClient>) -> Assistant {
        Assistant::new(mock.clone(), 1024)
    }

    #[test]
    fn data_url_embeds_mime_and_base64() {
        assert_eq!(data_url("image/png", b"hi"), "data:image/png;base64,aGk=");
    }

    #[tokio::test]
    async fn text_prompt_replays_history_after_system_prompt() {
        let mock = Arc::new(MockChatClient::replying("### ok"));
        let history = r#"[{"role":"user","content":"first"},{"role":"assistant","content":"reply"}]"#;
        let answer = assistant(&mock)
            .handle(UploadRequest {
                file: None,
                prompt: Some("second".into()),
                history: Some(history.into()),
            }).await
            .unwrap();
        assert_eq!(answer, "### ok");

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        let roles: Vec<Role> = calls[0]
            .iter()
            .map(|m| m.role)
            .collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(calls[0][0], ChatMessage::system(SYSTEM_PROMPT));
        assert_eq!(calls[0][3], ChatMessage::user("second"));
    }

    #[tokio::test]
    async fn malformed_history_falls_back_to_system_prompt_only() {
        let mock = Arc::new(MockChatClient::replying("ok"));
        assistant(&mock)
            .handle(UploadRequest {
                file: None,
                prompt: Some("hello".into()),
                history: Some("[{'role': 'user'".into()),
            }).await
            .unwrap();
        assert_eq!(mock.calls()[0], vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user("hello")]);
    }

    #[tokio::test]
    async fn missing_prompt_is_sent_as_empty_text() {
        let mock = Arc::new(MockChatClient::replying("ok"));
        assistant(&mock).handle(UploadRequest::default()).await.unwrap();
        assert_eq!(mock.calls()[0][1], ChatMessage::user(""));
    }

    #[tokio::test]
    async fn image_is_sent_alone_as_data_url() {
        let mock = Arc::new(MockChatClient::replying("a cat"));
        let answer = assistant(&mock)
            .handle(UploadRequest {
                file: Some(UploadedFile::new("cat.png", "image/png", vec![0x89, b'P', b'N', b'G'])),
                prompt: Some("describe".into()),
                history: Some(r#"[{"role":"user","content":"ignored"}]"#.into()),
            }).await
            .unwrap();
        assert_eq!(answer, "a cat");

        let calls = mock.calls();
        assert_eq!(calls[0].len(), 1);
        match &calls[0][0].content {
            MessageContent::Parts(parts) => {
                assert_eq!(parts[0], ContentPart::Text { text: "describe".into() });
                match &parts[1] {
                    ContentPart::ImageUrl { image_url } => {
                        assert!(image_url.url.starts_with("data:image/png;base64,"));
                    }
                    other => panic!("expected image part, got {:?}", other),
                }
            }
            other => panic!("expected parts, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn csv_summary_is_appended_to_prompt() {
        let mock = Arc::new(MockChatClient::replying("insights"));
        assistant(&mock)
            .handle(UploadRequest {
                file: Some(UploadedFile::new("data.csv", "text/csv", b"A,B,C\n1,2,3\n4,5,6\n".to_vec())),
                prompt: Some("Analyse".into()),
                history: None,
            }).await
            .unwrap();

        let calls = mock.calls();
        assert_eq!(calls[0].len(), 1);
        assert_eq!(calls[0][0].role, Role::User);
        let text = calls[0][0].content.as_text();
        assert!(text.starts_with("Analyse\nThe following is a summary of the CSV data:\n"));
        assert!(text.contains("mean"));
        assert!(text.contains("Columns:\nA, B, C"));
    }

    #[tokio::test]
    async fn broken_csv_is_an_error_without_gateway_call() {
        let mock = Arc::new(MockChatClient::replying("unused"));
        let err = assistant(&mock)
            .handle(UploadRequest {
                file: Some(UploadedFile::new("data.csv", "text/csv", vec![0xff, 0xfe])),
                ..UploadRequest::default()
            }).await
            .unwrap_err();
        assert!(matches!(err, AssistantError::Csv(CsvError::Encoding(_))));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn other_files_are_answered_locally() {
        let mock = Arc::new(MockChatClient::replying("unused"));
        let small = assistant(&mock)
            .handle(UploadRequest {
                file: Some(UploadedFile::new("doc.pdf", "application/pdf", vec![0; 10])),
                ..UploadRequest::default()
            }).await
            .unwrap();
        assert_eq!(small, UNSUPPORTED_FILE_RESPONSE);

        let large = assistant(&mock)
            .handle(UploadRequest {
                file: Some(UploadedFile::new("doc.pdf", "application/pdf", vec![0; 1024])),
                ..UploadRequest::default()
            }).await
            .unwrap();
        assert_eq!(large, FILE_TOO_LARGE_RESPONSE);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn oversized_image_never_reaches_gateway() {
        let mock = Arc::new(MockChatClient::replying("unused"));
        let answer = assistant(&mock)
            .handle(UploadRequest {
                file: Some(UploadedFile::new("big.png", "image/png", vec![0; 2048])),
                ..UploadRequest::default()
            }).await
            .unwrap();
        assert_eq!(answer, FILE_TOO_LARGE_RESPONSE);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn gateway_errors_are_propagated() {
        let mock = Arc::new(MockChatClient::failing(GatewayError::RateLimited));
        let err = assistant(&mock)
            .handle(UploadRequest {
                prompt: Some("hi".into()),
                ..UploadRequest::default()
            }).await
            .unwrap_err();
        assert!(matches!(err, AssistantError::Gateway(GatewayError::RateLimited)));
    }
}
