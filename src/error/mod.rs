//! Error types for the intake core.

use thiserror::Error;

/// Primary error type for all intake operations.
#[derive(Error, Debug)]
pub enum IntakeError {
    /// A required request field is missing or malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Capability error during {stage}: {message}")]
    Capability { stage: String, message: String },

    /// An agent or prompt resource could not be built on first use.
    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Output does not match schema {schema}: {message}")]
    SchemaMismatch { schema: String, message: String },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Audio store error: {0}")]
    AudioStore(String),
}

/// Broad error category, one per entry of the failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Capability,
    Initialization,
    Configuration,
}

impl IntakeError {
    /// Create a capability error for a named stage.
    pub fn capability(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Capability {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a schema mismatch error.
    pub fn schema_mismatch(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            schema: schema.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Initialization(_) => ErrorCategory::Initialization,
            Self::Configuration(_) => ErrorCategory::Configuration,
            _ => ErrorCategory::Capability,
        }
    }

    /// HTTP-style status code used by response envelopes.
    pub fn status_code(&self) -> u16 {
        match self.category() {
            ErrorCategory::Validation => 422,
            _ => 500,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, IntakeError>;
