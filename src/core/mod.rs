/*!
 * Upload core: fingerprinting, wire protocol, workers and fan-out
 */

pub mod fingerprint;
pub mod orchestrator;
pub mod progress;
pub mod protocol;
pub mod worker;

pub use fingerprint::FileFingerprint;
pub use orchestrator::{run, UploadOrchestrator};
pub use progress::{LogSink, NullSink, ProgressEvent, ProgressPublisher, ProgressSink};
pub use protocol::{ServerResponse, UploadMetadata};
pub use worker::{Connector, TcpConnector, UploadOutcome, UploadTask, UploadWorker};
