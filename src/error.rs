//! Error types for the assistant pipeline.
//!
//! [`GenerationError`] classifies a single failed call to a text-generation
//! endpoint. Each variant carries a stable error code (SCREAMING_SNAKE_CASE)
//! accessible via [`GenerationError::code()`]; the response generator maps
//! these classes to user-facing messages and never lets them escape.
//!
//! [`AssistError`] is the crate-level error for everything else
//! (configuration, speech output, I/O).

/// Stable error codes for programmatic error handling.
pub mod error_codes {
    /// Authentication failed (HTTP 401 or missing API key).
    pub const AUTH_FAILED: &str = "AUTH_FAILED";

    /// The model is still loading on the inference service (HTTP 503).
    pub const MODEL_LOADING: &str = "MODEL_LOADING";

    /// The request did not complete within the configured timeout.
    pub const TIMEOUT_ERROR: &str = "TIMEOUT_ERROR";

    /// The host reports no network connectivity.
    pub const OFFLINE: &str = "OFFLINE";

    /// The endpoint answered with a non-success status.
    pub const HTTP_STATUS: &str = "HTTP_STATUS";

    /// The request could not be sent or the response could not be read.
    pub const REQUEST_FAILED: &str = "REQUEST_FAILED";

    /// The response body was not valid JSON.
    pub const MALFORMED_RESPONSE: &str = "MALFORMED_RESPONSE";
}

/// Failure of one outbound text-generation call.
///
/// The Display impl formats as `[CODE] message`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    /// Authentication failed (HTTP 401 or missing API key).
    #[error("[{}] {}", error_codes::AUTH_FAILED, .0)]
    Auth(String),

    /// HTTP 503 whose error payload says the model is loading.
    #[error("[{}] {message}", error_codes::MODEL_LOADING)]
    ModelLoading {
        /// Error text reported by the service.
        message: String,
        /// Service estimate of the remaining load time, in seconds.
        estimated_secs: Option<f64>,
    },

    /// The request exceeded the configured timeout.
    #[error("[{}] {}", error_codes::TIMEOUT_ERROR, .0)]
    Timeout(String),

    /// No network connectivity.
    #[error("[{}] {}", error_codes::OFFLINE, .0)]
    Offline(String),

    /// Non-success HTTP status other than the classified ones.
    #[error("[{}] HTTP {status}: {message}", error_codes::HTTP_STATUS)]
    HttpStatus {
        /// Status code returned by the endpoint.
        status: u16,
        /// Error text (or raw body) returned by the endpoint.
        message: String,
    },

    /// Connection, send or body-read failure.
    #[error("[{}] {}", error_codes::REQUEST_FAILED, .0)]
    Request(String),

    /// A 2xx response whose body was not JSON.
    #[error("[{}] {}", error_codes::MALFORMED_RESPONSE, .0)]
    Malformed(String),
}

impl GenerationError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Auth(_) => error_codes::AUTH_FAILED,
            Self::ModelLoading { .. } => error_codes::MODEL_LOADING,
            Self::Timeout(_) => error_codes::TIMEOUT_ERROR,
            Self::Offline(_) => error_codes::OFFLINE,
            Self::HttpStatus { .. } => error_codes::HTTP_STATUS,
            Self::Request(_) => error_codes::REQUEST_FAILED,
            Self::Malformed(_) => error_codes::MALFORMED_RESPONSE,
        }
    }

    /// Returns true only for the "model is currently loading" class.
    ///
    /// Every other failure is either terminal (auth, timeout, offline) or is
    /// handled by cascading to the next endpoint rather than retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ModelLoading { .. })
    }
}

/// Top-level error type for the assistant crate.
#[derive(Debug, thiserror::Error)]
pub enum AssistError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Speech synthesis error.
    #[error("speech error: {0}")]
    Speech(String),

    /// Input capture error.
    #[error("capture error: {0}")]
    Capture(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AssistError>;
