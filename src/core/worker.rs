/*!
 * Single upload attempt
 *
 * A worker fingerprints the source, performs the metadata handshake,
 * streams the payload and reads the final acknowledgement over one
 * connection. Every failure is contained: `attempt` only ever answers
 * true or false.
 */

use std::fs::File;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::ServerAddress;
use crate::core::fingerprint::FileFingerprint;
use crate::core::progress::{DecileTracker, LogSink, ProgressEvent, ProgressSink};
use crate::core::protocol::{
    logical_filename, read_response, write_metadata_frame, ServerResponse, UploadMetadata,
    PAYLOAD_CHUNK_SIZE,
};
use crate::error::{ResponseStage, Result, UplinkError};

/// Immutable input for one upload attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub source: PathBuf,
    pub worker_index: usize,
    pub address: ServerAddress,
}

impl UploadTask {
    pub fn new(source: impl Into<PathBuf>, worker_index: usize, address: ServerAddress) -> Self {
        Self {
            source: source.into(),
            worker_index,
            address,
        }
    }

    /// Name the server sees for this worker's copy of the file
    pub fn logical_filename(&self) -> String {
        logical_filename(&self.source, self.worker_index)
    }
}

/// Opens the byte stream a worker talks over
pub trait Connector: Send + Sync {
    type Stream: Read + Write;

    fn connect(&self, address: &ServerAddress) -> io::Result<Self::Stream>;
}

/// Plain TCP connections
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&self, address: &ServerAddress) -> io::Result<TcpStream> {
        TcpStream::connect((address.host.as_str(), address.port))
    }
}

/// Result of one attempt, paired with its worker index
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub worker_index: usize,
    pub success: bool,
    pub filename: String,
    /// Payload bytes written to the connection
    pub bytes_sent: u64,
    /// Time from connect to final response (or failure)
    pub duration: Duration,
    /// Source ran out before the advertised size was sent
    pub short_read: bool,
    /// Server-assigned id from the final acknowledgement
    pub video_id: Option<String>,
    /// Error text for failed attempts
    pub error: Option<String>,
}

impl UploadOutcome {
    /// Outcome for a worker that never produced one of its own
    pub fn failed(worker_index: usize, filename: String, err: &UplinkError) -> Self {
        Self {
            worker_index,
            success: false,
            filename,
            bytes_sent: 0,
            duration: Duration::ZERO,
            short_read: false,
            video_id: None,
            error: Some(err.to_string()),
        }
    }
}

/// Bookkeeping that survives an error partway through the attempt
#[derive(Debug, Default)]
struct TransferState {
    bytes_sent: u64,
    short_read: bool,
    started: Option<Instant>,
}

impl TransferState {
    fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }
}

/// Runs upload attempts against a server
pub struct UploadWorker<C = TcpConnector> {
    connector: C,
    sink: Arc<dyn ProgressSink>,
}

impl UploadWorker<TcpConnector> {
    /// TCP worker that narrates progress through `tracing`
    pub fn new() -> Self {
        Self::with_connector(TcpConnector)
    }
}

impl Default for UploadWorker<TcpConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> UploadWorker<C> {
    pub fn with_connector(connector: C) -> Self {
        Self {
            connector,
            sink: Arc::new(LogSink),
        }
    }

    /// Replace the progress sink
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Run one attempt and report only whether it succeeded
    pub fn attempt(&self, task: &UploadTask) -> bool {
        self.run(task).success
    }

    /// Run one attempt; errors are logged and folded into the outcome
    pub fn run(&self, task: &UploadTask) -> UploadOutcome {
        let worker = task.worker_index;
        let filename = task.logical_filename();
        info!(worker, %filename, source = %task.source.display(), "Starting upload");

        let mut state = TransferState::default();
        let result = self.upload(task, &filename, &mut state);

        let mut outcome = UploadOutcome {
            worker_index: worker,
            success: false,
            filename,
            bytes_sent: state.bytes_sent,
            duration: state.elapsed(),
            short_read: state.short_read,
            video_id: None,
            error: None,
        };

        match result {
            Ok(response) => {
                outcome.success = true;
                outcome.video_id = response.video_id().map(str::to_string);
                self.sink.emit(ProgressEvent::upload_complete(
                    worker,
                    outcome.bytes_sent,
                    outcome.duration.as_millis() as u64,
                    outcome.video_id.clone(),
                ));
            }
            Err(e) => {
                if e.is_rejection() {
                    warn!(worker, category = %e.category(), "{}", e);
                } else {
                    error!(worker, category = %e.category(), "Error: {}", e);
                }
                self.sink.emit(ProgressEvent::upload_failed(
                    worker,
                    e.to_string(),
                    outcome.bytes_sent,
                ));
                outcome.error = Some(e.to_string());
            }
        }

        outcome
    }

    /// The conversation itself; the stream is dropped (closed) on every return
    fn upload(
        &self,
        task: &UploadTask,
        filename: &str,
        state: &mut TransferState,
    ) -> Result<ServerResponse> {
        let worker = task.worker_index;

        if !task.source.exists() {
            return Err(UplinkError::SourceNotFound(task.source.clone()));
        }

        let fingerprint = FileFingerprint::compute(&task.source)?;
        let metadata = UploadMetadata::for_worker(filename.to_string(), &fingerprint, worker);
        info!(worker, %filename, size = fingerprint.size, "Fingerprinted source");
        debug!(worker, hash = %fingerprint.hash, "Source hash");

        state.started = Some(Instant::now());
        let mut stream = self
            .connector
            .connect(&task.address)
            .map_err(|source| UplinkError::Connection {
                addr: task.address.to_string(),
                source,
            })?;

        let frame_len = write_metadata_frame(&mut stream, &metadata)?;
        debug!(worker, frame_len, "Sent metadata frame");

        let handshake = read_response(&mut stream)?;
        debug!(worker, status = %handshake.status, message = handshake.message().unwrap_or(""), "Server response");
        if !handshake.is_ok() {
            return Err(rejection(ResponseStage::Handshake, &handshake));
        }

        self.sink.emit(ProgressEvent::upload_start(
            worker,
            filename.to_string(),
            fingerprint.size,
        ));
        self.stream_payload(task, fingerprint.size, &mut stream, state)?;

        let ack = read_response(&mut stream)?;
        debug!(worker, status = %ack.status, message = ack.message().unwrap_or(""), "Final response");
        if !ack.is_ok() {
            return Err(rejection(ResponseStage::Final, &ack));
        }

        Ok(ack)
    }

    /// Copy exactly `size` bytes of the source onto the stream
    fn stream_payload<W: Write>(
        &self,
        task: &UploadTask,
        size: u64,
        stream: &mut W,
        state: &mut TransferState,
    ) -> Result<()> {
        let worker = task.worker_index;
        let mut file = File::open(&task.source)?;
        let mut buffer = vec![0u8; PAYLOAD_CHUNK_SIZE];
        let mut tracker = DecileTracker::new(size);

        while state.bytes_sent < size {
            let remaining = size - state.bytes_sent;
            let want = remaining.min(PAYLOAD_CHUNK_SIZE as u64) as usize;
            let n = file.read(&mut buffer[..want])?;
            if n == 0 {
                state.short_read = true;
                warn!(
                    worker,
                    bytes_sent = state.bytes_sent,
                    expected = size,
                    "Source ended before advertised size, stopping payload early"
                );
                break;
            }

            stream.write_all(&buffer[..n])?;
            state.bytes_sent += n as u64;

            if tracker.observe(state.bytes_sent) {
                self.sink.emit(ProgressEvent::upload_progress(
                    worker,
                    state.bytes_sent,
                    size,
                ));
            }
        }

        stream.flush()?;
        Ok(())
    }
}

fn rejection(stage: ResponseStage, response: &ServerResponse) -> UplinkError {
    UplinkError::Rejected {
        stage,
        status: response.status.clone(),
        message: response.message().map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::progress::ProgressPublisher;
    use crate::logging::init_test_logging;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    /// In-memory stream: scripted replies in, everything written captured
    struct ScriptedStream {
        replies: Cursor<Vec<u8>>,
        written: Arc<Mutex<Vec<u8>>>,
        reply_chunks: Vec<Vec<u8>>,
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            // One scripted reply per read, mirroring one server write
            if self.replies.position() as usize >= self.replies.get_ref().len() {
                if self.reply_chunks.is_empty() {
                    return Ok(0);
                }
                let next = self.reply_chunks.remove(0);
                self.replies = Cursor::new(next);
            }
            self.replies.read(buf)
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct ScriptedConnector {
        replies: Vec<&'static str>,
        written: Arc<Mutex<Vec<u8>>>,
        connects: AtomicUsize,
    }

    impl ScriptedConnector {
        fn new(replies: Vec<&'static str>) -> Self {
            Self {
                replies,
                written: Arc::new(Mutex::new(Vec::new())),
                connects: AtomicUsize::new(0),
            }
        }
    }

    impl Connector for ScriptedConnector {
        type Stream = ScriptedStream;

        fn connect(&self, _address: &ServerAddress) -> io::Result<ScriptedStream> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(ScriptedStream {
                replies: Cursor::new(Vec::new()),
                written: self.written.clone(),
                reply_chunks: self.replies.iter().map(|r| r.as_bytes().to_vec()).collect(),
            })
        }
    }

    fn temp_file(data: &[u8]) -> NamedTempFile {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(data).unwrap();
        temp.flush().unwrap();
        temp
    }

    fn task_for(path: &std::path::Path, index: usize) -> UploadTask {
        UploadTask::new(path, index, ServerAddress::new("scripted", 9000))
    }

    #[test]
    fn test_successful_attempt_writes_frame_then_payload() {
        init_test_logging();
        let data: Vec<u8> = (0..20_000u32).map(|i| (i % 256) as u8).collect();
        let temp = temp_file(&data);
        let connector = ScriptedConnector::new(vec![
            r#"{"status":"ok","message":"Ready to receive video","video_id":"abc"}"#,
            r#"{"status":"ok","message":"Upload complete","video_id":"abc"}"#,
        ]);
        let written = connector.written.clone();
        let worker = UploadWorker::with_connector(connector);

        let outcome = worker.run(&task_for(temp.path(), 4));
        assert!(outcome.success);
        assert_eq!(outcome.bytes_sent, data.len() as u64);
        assert_eq!(outcome.video_id.as_deref(), Some("abc"));
        assert!(!outcome.short_read);

        let wire = written.lock().unwrap();
        let len = u32::from_be_bytes([wire[0], wire[1], wire[2], wire[3]]) as usize;
        let metadata: UploadMetadata = serde_json::from_slice(&wire[4..4 + len]).unwrap();
        assert!(metadata.filename.ends_with("_4"));
        assert_eq!(metadata.size, data.len() as u64);
        assert_eq!(&wire[4 + len..], &data[..]);
    }

    #[test]
    fn test_handshake_rejection_sends_no_payload() {
        let temp = temp_file(b"some video bytes");
        let connector = ScriptedConnector::new(vec![r#"{"status":"rejected"}"#]);
        let written = connector.written.clone();
        let worker = UploadWorker::with_connector(connector);

        let outcome = worker.run(&task_for(temp.path(), 0));
        assert!(!outcome.success);
        assert_eq!(outcome.bytes_sent, 0);
        assert!(outcome.error.unwrap().contains("handshake"));

        let wire = written.lock().unwrap();
        let len = u32::from_be_bytes([wire[0], wire[1], wire[2], wire[3]]) as usize;
        assert_eq!(wire.len(), 4 + len);
    }

    #[test]
    fn test_final_rejection_fails_attempt() {
        let temp = temp_file(b"abc");
        let connector = ScriptedConnector::new(vec![
            r#"{"status":"ok"}"#,
            r#"{"status":"error","message":"Queue full, try again later"}"#,
        ]);
        let worker = UploadWorker::with_connector(connector);

        let outcome = worker.run(&task_for(temp.path(), 1));
        assert!(!outcome.success);
        assert_eq!(outcome.bytes_sent, 3);
        assert!(outcome.error.unwrap().contains("Queue full"));
    }

    #[test]
    fn test_missing_source_never_connects() {
        let connector = ScriptedConnector::new(vec![r#"{"status":"ok"}"#]);
        let worker = UploadWorker::with_connector(connector);

        let task = task_for(std::path::Path::new("/nonexistent/video.mp4"), 0);
        assert!(!worker.attempt(&task));
        assert_eq!(worker.connector().connects.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_malformed_handshake_fails() {
        let temp = temp_file(b"abc");
        let connector = ScriptedConnector::new(vec!["not json at all"]);
        let written = connector.written.clone();
        let worker = UploadWorker::with_connector(connector);

        let outcome = worker.run(&task_for(temp.path(), 0));
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().starts_with("Malformed response"));
        let wire = written.lock().unwrap();
        let len = u32::from_be_bytes([wire[0], wire[1], wire[2], wire[3]]) as usize;
        assert_eq!(wire.len(), 4 + len);
    }

    #[test]
    fn test_closed_before_final_response() {
        let temp = temp_file(b"abc");
        let connector = ScriptedConnector::new(vec![r#"{"status":"ok"}"#]);
        let worker = UploadWorker::with_connector(connector);

        assert!(!worker.attempt(&task_for(temp.path(), 0)));
    }

    #[test]
    fn test_zero_length_file_reads_final_response() {
        let temp = temp_file(b"");
        let connector = ScriptedConnector::new(vec![r#"{"status":"ok"}"#, r#"{"status":"ok"}"#]);
        let (publisher, subscriber) = ProgressPublisher::unbounded();
        let worker = UploadWorker::with_connector(connector).with_sink(Arc::new(publisher));

        let outcome = worker.run(&task_for(temp.path(), 0));
        assert!(outcome.success);
        assert_eq!(outcome.bytes_sent, 0);

        let events = subscriber.drain();
        assert!(!events
            .iter()
            .any(|e| matches!(e, ProgressEvent::UploadProgress { .. })));
        assert!(matches!(
            events.last(),
            Some(ProgressEvent::UploadComplete { .. })
        ));
    }

    #[test]
    fn test_progress_events_end_at_total() {
        let data = vec![7u8; 100_000];
        let temp = temp_file(&data);
        let connector = ScriptedConnector::new(vec![r#"{"status":"ok"}"#, r#"{"status":"ok"}"#]);
        let (publisher, subscriber) = ProgressPublisher::unbounded();
        let worker = UploadWorker::with_connector(connector).with_sink(Arc::new(publisher));

        assert!(worker.attempt(&task_for(temp.path(), 2)));

        let progress: Vec<u64> = subscriber
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::UploadProgress { bytes_sent, .. } => Some(bytes_sent),
                _ => None,
            })
            .collect();
        assert!(!progress.is_empty());
        assert!(progress.len() <= 11);
        assert_eq!(*progress.last().unwrap(), 100_000);
        assert!(progress.windows(2).all(|w| w[0] < w[1]));
    }
}
