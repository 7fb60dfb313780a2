//! AI Integration Layer
//!
//! Completion providers, prompt rendering, prompt size estimation and code
//! extraction from model replies.

pub mod extract;
pub mod prompt;
pub mod provider;
pub mod tokenizer;

pub use extract::extract_code_from_response;
pub use prompt::{PromptBuilder, PromptSection, PromptTemplates};
pub use provider::{
    CompletionProvider, LlmResponse, Message, ProviderConfig, ResponseMetadata, ResponseTiming,
    Role, SharedProvider, TokenUsage, create_provider,
};
pub use tokenizer::{TokenBudget, TokenCounter};
