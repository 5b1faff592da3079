pub mod cli_client;
pub mod http_client;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a conversation sent to a generation backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    Json,
}

/// Abstract interface for a text-generation backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Short backend label used in logs.
    fn name(&self) -> &str;

    /// Sends the conversation to `model` and returns the raw response text.
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        format: ResponseFormat,
    ) -> Result<String>;
}

#[async_trait]
impl<C: CompletionClient + ?Sized> CompletionClient for Box<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        format: ResponseFormat,
    ) -> Result<String> {
        (**self).complete(model, messages, format).await
    }
}

/// Extracts the body of the first fenced code block, or the trimmed input
/// when there is none.
pub fn clean_response(input: &str) -> String {
    if let Some(start) = input.find("```") {
        let after = &input[start + 3..];
        // Skip language identifier (e.g. "json")
        let start_content = after.find('\n').map(|newline| newline + 1).unwrap_or(0);

        if let Some(end) = after[start_content..].find("```") {
            return after[start_content..start_content + end].trim().to_string();
        }
    }
    input.trim().to_string()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_response_strips_fences() {
        let raw = "Sure!\n```json\n{\"a\": 1}\n```\nBye";
        assert_eq!(clean_response(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_clean_response_passthrough() {
        assert_eq!(clean_response("  {\"a\": 1} "), "{\"a\": 1}");
    }
}
