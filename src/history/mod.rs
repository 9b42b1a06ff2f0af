use crate::models::chat::ChatMessage;
use log::debug;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("history is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("history entry {index} is not a role/content record: {source}")]
    InvalidEntry {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("history must be a JSON array of messages")]
    NotAnArray,
}

/// Decodes the client-supplied conversation.
///
/// Accepts a JSON array of `{role, content}` records where `role` is one of
/// `system`, `user` or `assistant`. A missing or blank value is an empty
/// history. Any malformed entry rejects the whole history.
pub fn parse_history(raw: Option<&str>) -> Result<Vec<ChatMessage>, HistoryError> {
    let raw = match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => {
            return Ok(Vec::new());
        }
    };

    let value: serde_json::Value = serde_json::from_str(raw).map_err(HistoryError::InvalidJson)?;
    let entries = match value {
        serde_json::Value::Array(entries) => entries,
        _ => {
            return Err(HistoryError::NotAnArray);
        }
    };

    let mut messages = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let message: ChatMessage = serde_json::from_value(entry).map_err(|source| HistoryError::InvalidEntry {
            index,
            source,
        })?;
        debug!("history[{}] {}: {} chars", index, message.role, message.content.as_text().len());
        messages.push(message);
    }

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::{ MessageContent, Role };

    #[test]
    fn missing_and_blank_history_are_empty() {
        assert!(parse_history(None).unwrap().is_empty());
        assert!(parse_history(Some("   ")).unwrap().is_empty());
        assert!(parse_history(Some("[]")).unwrap().is_empty());
    }

    #[test]
    fn parses_role_content_records_in_order() {
        let raw =
            r####"[{"role":"user","content":"hi"},{"role":"assistant","content":"### Hello"}]"####;
        let history = parse_history(Some(raw)).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, MessageContent::Text("### Hello".into()));
    }

    #[test]
    fn python_literal_is_rejected() {
        let raw = "[{'role': 'user', 'content': 'hi'}]";
        assert!(matches!(parse_history(Some(raw)), Err(HistoryError::InvalidJson(_))));
    }

    #[test]
    fn object_instead_of_array_is_rejected() {
        let raw = r#"{"role":"user","content":"hi"}"#;
        assert!(matches!(parse_history(Some(raw)), Err(HistoryError::NotAnArray)));
    }

    #[test]
    fn one_bad_role_rejects_everything() {
        let raw = r#"[{"role":"user","content":"hi"},{"role":"admin","content":"x"}]"#;
        match parse_history(Some(raw)) {
            Err(HistoryError::InvalidEntry { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn missing_content_is_rejected() {
        let raw = r#"[{"role":"user"}]"#;
        assert!(matches!(parse_history(Some(raw)), Err(HistoryError::InvalidEntry { .. })));
    }
}
