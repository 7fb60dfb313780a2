//! Candidate generation: one provider call, then code extraction.

use tracing::debug;

use crate::ai::{Message, SharedProvider, extract_code_from_response};
use crate::types::{ForgeError, Result};

#[derive(Clone)]
pub struct Generator {
    provider: SharedProvider,
}

impl Generator {
    pub fn new(provider: SharedProvider) -> Self {
        Self { provider }
    }

    /// Send the messages once and extract the test class from the reply.
    ///
    /// An absent or blank reply is a transport failure. A reply without a
    /// recognisable code block yields an empty string.
    pub async fn generate(&self, messages: &[Message]) -> Result<String> {
        let response = self.provider.complete(messages).await?;

        let content = match response.content {
            Some(content) if !content.trim().is_empty() => content,
            _ => {
                return Err(ForgeError::NoResponse {
                    provider: self.provider.name().to_string(),
                });
            }
        };

        debug!(
            "{} ({}) reply: {} input / {} output tokens in {}ms",
            self.provider.name(),
            self.provider.model(),
            response.usage.input_tokens,
            response.usage.output_tokens,
            response.timing.total_ms
        );

        Ok(extract_code_from_response(&content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::scripted::ScriptedProvider;
    use std::sync::Arc;

    fn messages() -> Vec<Message> {
        vec![Message::system("sys"), Message::user("write a test")]
    }

    #[tokio::test]
    async fn test_extracts_fenced_code() {
        let provider = Arc::new(ScriptedProvider::new([Some(
            "Here you go:\n```java\npublic class T {}\n```\nDone.",
        )]));
        let generator = Generator::new(provider.clone());

        let code = generator.generate(&messages()).await.unwrap();
        assert_eq!(code.trim(), "public class T {}");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_prose_only_reply_is_empty() {
        let provider = Arc::new(ScriptedProvider::new([Some("I cannot help with that.")]));
        let code = Generator::new(provider).generate(&messages()).await.unwrap();
        assert!(code.is_empty());
    }

    #[tokio::test]
    async fn test_absent_content_is_no_response() {
        let provider = Arc::new(ScriptedProvider::new([None]));
        let err = Generator::new(provider).generate(&messages()).await.unwrap_err();
        assert!(matches!(err, ForgeError::NoResponse { .. }));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_blank_content_is_no_response() {
        let provider = Arc::new(ScriptedProvider::new([Some("   \n")]));
        let err = Generator::new(provider).generate(&messages()).await.unwrap_err();
        assert!(matches!(err, ForgeError::NoResponse { .. }));
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let provider = Arc::new(ScriptedProvider::failing("503 upstream"));
        let err = Generator::new(provider).generate(&messages()).await.unwrap_err();
        assert!(err.is_transport());
    }
}
