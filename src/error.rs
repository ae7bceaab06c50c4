//! Error types for Nexus Hub
//!
//! Every failure carries a numeric code (`E<nnn>`) grouped by area, a
//! process exit code derived from that group, and, where there is one, a
//! hint telling the user what to run next.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for hub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Record store errors (3xx)
    RecordCorrupt = 300,
    RecordSerialize = 301,

    // Profile errors (4xx)
    UnknownFlag = 400,
    UnknownSection = 401,
    UnknownTheme = 402,
    UnknownRole = 403,
    InvalidInput = 404,
    SourceNotFound = 405,

    // Assistant errors (5xx)
    AssistantDisabled = 500,
    AssistantRequest = 501,
    AssistantTimeout = 502,
    AssistantResponse = 503,
    AssistantAuth = 504,
    AssistantRateLimited = 505,

    // Internal errors (9xx)
    InternalError = 900,
    NotSupported = 902,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            300..=399 => 30, // Record store errors
            400..=499 => 40, // Profile errors
            500..=599 => 50, // Assistant errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for the hub
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// An explicit `--config` path that does not exist
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Record Store Errors
    // ─────────────────────────────────────────────────────────────

    /// A stored record could not be interpreted
    #[error("Record '{key}' is corrupt: {message}")]
    RecordCorrupt { key: String, message: String },

    /// A record could not be encoded for storage
    #[error("Failed to encode record '{key}'")]
    RecordSerialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    // ─────────────────────────────────────────────────────────────
    // Profile Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Unknown visibility flag: {name}")]
    UnknownFlag { name: String },

    #[error("Unknown dashboard section: {name}")]
    UnknownSection { name: String },

    #[error("Unknown theme: {name}")]
    UnknownTheme { name: String },

    #[error("Unknown role: {name}")]
    UnknownRole { name: String },

    #[error("Invalid {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("Knowledge source {id} not found")]
    SourceNotFound { id: u64 },

    // ─────────────────────────────────────────────────────────────
    // Assistant Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Assistant is disabled")]
    AssistantDisabled,

    #[error("Assistant request '{operation}' failed: {message}")]
    AssistantRequest { operation: String, message: String },

    #[error("Assistant request '{operation}' timed out after {timeout_secs}s")]
    AssistantTimeout { operation: String, timeout_secs: u64 },

    /// The collaborator answered but the payload did not match the schema
    #[error("Assistant returned an unusable response for '{operation}': {message}")]
    AssistantResponse { operation: String, message: String },

    #[error("Assistant rejected credentials: {message}")]
    AssistantAuth { message: String },

    #[error("Assistant rate limited")]
    AssistantRateLimited,

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,

            Error::RecordCorrupt { .. } => ErrorCode::RecordCorrupt,
            Error::RecordSerialize { .. } => ErrorCode::RecordSerialize,

            Error::UnknownFlag { .. } => ErrorCode::UnknownFlag,
            Error::UnknownSection { .. } => ErrorCode::UnknownSection,
            Error::UnknownTheme { .. } => ErrorCode::UnknownTheme,
            Error::UnknownRole { .. } => ErrorCode::UnknownRole,
            Error::InvalidInput { .. } => ErrorCode::InvalidInput,
            Error::SourceNotFound { .. } => ErrorCode::SourceNotFound,

            Error::AssistantDisabled => ErrorCode::AssistantDisabled,
            Error::AssistantRequest { .. } => ErrorCode::AssistantRequest,
            Error::AssistantTimeout { .. } => ErrorCode::AssistantTimeout,
            Error::AssistantResponse { .. } => ErrorCode::AssistantResponse,
            Error::AssistantAuth { .. } => ErrorCode::AssistantAuth,
            Error::AssistantRateLimited => ErrorCode::AssistantRateLimited,

            Error::NotSupported(_) => ErrorCode::NotSupported,
            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::AssistantRequest { .. }
                | Error::AssistantTimeout { .. }
                | Error::AssistantRateLimited
                | Error::Io(_)
                | Error::IoRead { .. }
                | Error::IoWrite { .. }
        )
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'nexus-hub config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'nexus-hub config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the configuration file and fix the invalid values."
            ),

            Error::IoWrite { .. } => Some(
                "Check that the data directory exists and is writable (see [storage] data_dir)."
            ),

            Error::UnknownFlag { .. } => Some(
                "Run 'nexus-hub visibility' to list every flag by name."
            ),
            Error::UnknownSection { .. } => Some(
                "Sections are: professional, academic, personal, accessibility."
            ),
            Error::UnknownTheme { .. } => Some(
                "Themes are: pink, rose, orange, yellow, green, blue, indigo, purple, default."
            ),
            Error::UnknownRole { .. } => Some("Roles are: student, worker."),
            Error::SourceNotFound { .. } => Some(
                "Run 'nexus-hub source list' to see knowledge source ids."
            ),

            Error::AssistantDisabled => Some(
                "Set [assistant] enabled = true in the configuration to use AI features."
            ),
            Error::AssistantAuth { .. } => Some(
                "Check [assistant] api_key or the NEXUS_ASSISTANT_API_KEY environment variable."
            ),
            Error::AssistantTimeout { .. } => Some(
                "The assistant may be overloaded. Try again or raise [assistant] timeout_secs."
            ),
            Error::AssistantRateLimited => Some("Wait a moment before sending another request."),

            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!("\x1b[31mError [{}]\x1b[0m: {}\n", self.code().as_str(), self);

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Error::ConfigNotFound { path: path.into() }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: None,
        }
    }

    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn record_corrupt(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::RecordCorrupt {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn assistant_request(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::AssistantRequest {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn assistant_response(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::AssistantResponse {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
