//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//!
//! ## Error Classes
//!
//! - **ConfigurationFatal**: unbuilt project, ambiguous class name. Aborts the
//!   whole task before any job runs.
//! - **JobNotFound**: unresolved class or method. The job is skipped.
//! - **TransportFailure**: the completion provider produced nothing usable.
//!   Caught at the job boundary.
//!
//! Validation failures and prompt-budget overruns are not errors; they are
//! values (`ValidationOutcome`, `RepairStep`) that drive the repair loop.

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Categories for provider transport failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited by the provider
    RateLimit,
    /// Context/token limit exceeded on the provider side
    TokenLimit,
    /// Authentication failed
    Auth,
    /// Network/connectivity issues
    Network,
    /// Provider unavailable
    Unavailable,
    /// Invalid request
    BadRequest,
    /// Temporary server issues
    Transient,
    /// Unknown error
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::TokenLimit => write!(f, "TOKEN_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// Provider transport error with category and provider context
#[derive(Debug, Clone)]
pub struct LlmError {
    pub category: ErrorCategory,
    pub message: String,
    pub provider: Option<String>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
        }
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps provider failures onto [`ErrorCategory`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an HTTP status code returned by a provider endpoint
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        match status {
            429 => LlmError::with_provider(ErrorCategory::RateLimit, message, provider),
            401 | 403 => LlmError::with_provider(ErrorCategory::Auth, message, provider),
            400 => {
                let lower = message.to_lowercase();
                if lower.contains("context length") || lower.contains("maximum context") {
                    LlmError::with_provider(ErrorCategory::TokenLimit, message, provider)
                } else {
                    LlmError::with_provider(ErrorCategory::BadRequest, message, provider)
                }
            }
            500 | 502 | 503 | 504 => {
                LlmError::with_provider(ErrorCategory::Transient, message, provider)
            }
            404 => LlmError::with_provider(ErrorCategory::Unavailable, message, provider),
            _ => LlmError::with_provider(ErrorCategory::Unknown, message, provider),
        }
    }

    /// Classify a reqwest transport error (no HTTP status available)
    pub fn classify_transport(err: &reqwest::Error, provider: &str) -> LlmError {
        let category = if err.is_timeout() || err.is_connect() {
            ErrorCategory::Network
        } else if err.is_decode() {
            ErrorCategory::BadRequest
        } else {
            ErrorCategory::Unknown
        };
        LlmError::with_provider(category, err.to_string(), provider)
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ForgeError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Configuration Fatal
    // -------------------------------------------------------------------------
    /// Build output directory does not exist
    #[error(
        "Project is not compiled: build output {path} does not exist. Build the project first"
    )]
    ProjectNotBuilt { path: String },

    /// A simple class name maps to more than one fully-qualified name
    #[error("Multiple classes named {name}: {candidates:?}. Use the fully qualified name")]
    AmbiguousClass {
        name: String,
        candidates: Vec<String>,
    },

    #[error("Config error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Job Not Found
    // -------------------------------------------------------------------------
    #[error("Class not found: {0}")]
    ClassNotFound(String),

    #[error("Method {method} not found in class {class}")]
    MethodNotFound { class: String, method: String },

    // -------------------------------------------------------------------------
    // Transport Failures
    // -------------------------------------------------------------------------
    /// Structured provider error
    #[error("LLM error: {0}")]
    Llm(LlmError),

    /// Simple provider error
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// The provider returned no content at all
    #[error("No response from completion provider ({provider})")]
    NoResponse { provider: String },

    // -------------------------------------------------------------------------
    // Engine Errors
    // -------------------------------------------------------------------------
    #[error("Prompt context not initialized: call set_context before generate")]
    NotInitialized,

    #[error("Toolchain error ({tool}): {message}")]
    Toolchain { tool: String, message: String },

    #[error("Parse error in {path}: {message}")]
    Parse { message: String, path: String },
}

impl From<LlmError> for ForgeError {
    fn from(err: LlmError) -> Self {
        ForgeError::Llm(err)
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl ForgeError {
    /// Create a toolchain error
    pub fn toolchain(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Toolchain {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Errors that abort the whole task before any job runs
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ProjectNotBuilt { .. } | Self::AmbiguousClass { .. } | Self::Config(_)
        )
    }

    /// Errors that skip a single job with a warning
    pub fn is_job_not_found(&self) -> bool {
        matches!(self, Self::ClassNotFound(_) | Self::MethodNotFound { .. })
    }

    /// Errors raised while talking to the completion provider
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Llm(_) | Self::LlmApi(_) | Self::NoResponse { .. }
        )
    }

    /// Provider failure category, when the provider reported one
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Llm(err) => Some(err.category),
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::TokenLimit.to_string(), "TOKEN_LIMIT");
        assert_eq!(ErrorCategory::Auth.to_string(), "AUTH");
    }

    #[test]
    fn test_classify_http_status() {
        let rate_limit = ErrorClassifier::classify_http_status(429, "Rate limited", "test");
        assert_eq!(rate_limit.category, ErrorCategory::RateLimit);

        let auth = ErrorClassifier::classify_http_status(401, "Unauthorized", "test");
        assert_eq!(auth.category, ErrorCategory::Auth);

        let server_error = ErrorClassifier::classify_http_status(503, "Server error", "test");
        assert_eq!(server_error.category, ErrorCategory::Transient);

        let context = ErrorClassifier::classify_http_status(
            400,
            "This model's maximum context length is 8192 tokens",
            "openai",
        );
        assert_eq!(context.category, ErrorCategory::TokenLimit);
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::with_provider(ErrorCategory::RateLimit, "Too many requests", "openai");
        assert_eq!(err.to_string(), "[openai:RATE_LIMIT] Too many requests");

        let err_no_provider = LlmError::new(ErrorCategory::Network, "Connection failed");
        assert_eq!(err_no_provider.to_string(), "[NETWORK] Connection failed");
    }

    #[test]
    fn test_error_classes() {
        let fatal = ForgeError::AmbiguousClass {
            name: "Foo".to_string(),
            candidates: vec!["a.Foo".to_string(), "b.Foo".to_string()],
        };
        assert!(fatal.is_fatal());
        assert!(!fatal.is_job_not_found());

        assert!(ForgeError::ProjectNotBuilt { path: "target/classes".into() }.is_fatal());

        let missing = ForgeError::MethodNotFound {
            class: "com.x.Calc".to_string(),
            method: "9".to_string(),
        };
        assert!(missing.is_job_not_found());
        assert!(!missing.is_fatal());

        let transport = ForgeError::NoResponse {
            provider: "openai".to_string(),
        };
        assert!(transport.is_transport());
        assert!(!transport.is_fatal());
        assert_eq!(transport.category(), None);

        let limited: ForgeError =
            ErrorClassifier::classify_http_status(429, "slow down", "openai").into();
        assert_eq!(limited.category(), Some(ErrorCategory::RateLimit));
    }

    #[test]
    fn test_ambiguous_message_lists_candidates() {
        let err = ForgeError::AmbiguousClass {
            name: "Foo".to_string(),
            candidates: vec!["a.Foo".to_string(), "b.Foo".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("a.Foo"));
        assert!(msg.contains("b.Foo"));
    }
}
