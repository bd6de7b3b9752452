/*!
 * Orbit Uplink - parallel upload load generator
 *
 * Uploads one source file to a media-upload server from many worker
 * threads at once. Each worker:
 * - fingerprints the file (MD5 + length)
 * - sends a length-prefixed JSON metadata frame under its own logical name
 * - streams the raw payload once the server accepts the handshake
 * - reports success only if the server acknowledges the upload
 *
 * The orchestrator fans the workers out, joins them and tallies outcomes.
 */

pub mod cli_style;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod stats;

// Re-export commonly used types
pub use config::{LogLevel, ServerAddress, UploadConfig};
pub use crate::core::orchestrator::UploadOrchestrator;
pub use crate::core::worker::{Connector, TcpConnector, UploadOutcome, UploadTask, UploadWorker};
pub use error::{Result, UplinkError};
pub use stats::RunSummary;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
