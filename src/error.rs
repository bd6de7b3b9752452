/*!
 * Error types for Orbit Uplink
 */

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, UplinkError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FATAL: i32 = 2;

/// Point in the upload conversation at which the server answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStage {
    /// Reply to the metadata frame
    Handshake,
    /// Reply after the payload has been streamed
    Final,
}

impl fmt::Display for ResponseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseStage::Handshake => write!(f, "handshake"),
            ResponseStage::Final => write!(f, "final acknowledgement"),
        }
    }
}

#[derive(Error, Debug)]
pub enum UplinkError {
    /// Source file does not exist
    #[error("Source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Could not establish the connection
    #[error("Connection to {addr} failed: {source}")]
    Connection {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// I/O error while talking to the server or reading the source
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Server answered with a well-formed, non-"ok" status
    #[error("Upload rejected at {stage}: status \"{status}\"{}", format_message(.message))]
    Rejected {
        stage: ResponseStage,
        status: String,
        message: Option<String>,
    },

    /// Response was not a JSON object carrying a string `status`
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Metadata could not be serialized for the handshake frame
    #[error("Failed to encode metadata: {0}")]
    Encode(String),

    /// Serialized metadata does not fit a u32 length prefix
    #[error("Metadata frame too large: {0} bytes")]
    FrameTooLarge(usize),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker thread panicked or could not be spawned
    #[error("Worker {0} did not complete")]
    WorkerPanicked(usize),
}

fn format_message(message: &Option<String>) -> String {
    match message {
        Some(msg) => format!(" ({})", msg),
        None => String::new(),
    }
}

impl UplinkError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        EXIT_FATAL
    }

    /// Check if this error is a network-related error
    pub fn is_network_error(&self) -> bool {
        match self {
            UplinkError::Connection { .. } => true,
            UplinkError::Io(io_err) => {
                use io::ErrorKind::*;
                matches!(
                    io_err.kind(),
                    ConnectionRefused
                        | ConnectionReset
                        | ConnectionAborted
                        | NotConnected
                        | BrokenPipe
                        | TimedOut
                        | UnexpectedEof
                )
            }
            _ => false,
        }
    }

    /// Check if the server itself turned the upload down
    pub fn is_rejection(&self) -> bool {
        matches!(self, UplinkError::Rejected { .. })
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            UplinkError::SourceNotFound(_) => ErrorCategory::Validation,
            UplinkError::Connection { .. } => ErrorCategory::Network,
            UplinkError::Io(_) if self.is_network_error() => ErrorCategory::Network,
            UplinkError::Io(_) => ErrorCategory::IoError,
            UplinkError::Rejected { .. }
            | UplinkError::MalformedResponse(_)
            | UplinkError::Encode(_)
            | UplinkError::FrameTooLarge(_) => ErrorCategory::Protocol,
            UplinkError::Config(_) => ErrorCategory::Configuration,
            UplinkError::WorkerPanicked(_) => ErrorCategory::Concurrency,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Input validation errors (missing source file)
    Validation,
    /// Connection-level failures
    Network,
    /// Server rejections and unparseable replies
    Protocol,
    /// Local I/O errors
    IoError,
    /// Configuration errors
    Configuration,
    /// Worker thread failures
    Concurrency,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Protocol => write!(f, "protocol"),
            ErrorCategory::IoError => write!(f, "io"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Concurrency => write!(f, "concurrency"),
        }
    }
}

impl From<serde_json::Error> for UplinkError {
    fn from(err: serde_json::Error) -> Self {
        UplinkError::MalformedResponse(format!("JSON parse error: {}", err))
    }
}

impl From<toml::de::Error> for UplinkError {
    fn from(err: toml::de::Error) -> Self {
        UplinkError::Config(format!("TOML parse error: {}", err))
    }
}
