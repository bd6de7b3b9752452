/*!
 * In-process upload server for integration tests
 */

use orbit_uplink::{Connector, ServerAddress, TcpConnector};
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How the server answers each connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    /// "ok" to both the handshake and the final acknowledgement
    AcceptAll,
    /// `{"status":"rejected"}` to the handshake
    RejectHandshake,
    /// Non-JSON bytes in place of the handshake reply
    GarbageHandshake,
    /// Accept the handshake, refuse the finished upload
    RejectFinal,
    /// Accept even-numbered connections, reject odd ones at the handshake
    AlternateReject,
    /// Read only this many payload bytes, whatever the metadata says, then "ok"
    AcceptShort(usize),
    /// Read only this many payload bytes, then refuse the upload
    RejectShort(usize),
}

/// What one connection put on the wire
#[derive(Debug, Clone)]
pub struct Received {
    pub prefix: u32,
    pub metadata: Vec<u8>,
    pub payload: Vec<u8>,
}

impl Received {
    pub fn metadata_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.metadata).expect("metadata is JSON")
    }
}

pub struct MockServer {
    pub address: ServerAddress,
    handle: JoinHandle<Vec<Received>>,
}

impl MockServer {
    /// Listen on an ephemeral port and serve exactly `connections` clients
    pub fn spawn(behaviour: Behaviour, connections: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let mut handlers = Vec::new();
            for n in 0..connections {
                let (stream, _) = listener.accept().unwrap();
                handlers.push(thread::spawn(move || serve(stream, behaviour, n)));
            }
            handlers
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect()
        });

        Self {
            address: ServerAddress::new("127.0.0.1", port),
            handle,
        }
    }

    /// Wait for every connection to finish and return what was received
    pub fn finish(self) -> Vec<Received> {
        self.handle.join().unwrap()
    }
}

fn reply(stream: &mut TcpStream, body: &str) {
    stream.write_all(body.as_bytes()).unwrap();
    stream.flush().unwrap();
}

fn serve(mut stream: TcpStream, behaviour: Behaviour, n: usize) -> Received {
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();

    let mut prefix = [0u8; 4];
    stream.read_exact(&mut prefix).unwrap();
    let prefix = u32::from_be_bytes(prefix);

    let mut metadata = vec![0u8; prefix as usize];
    stream.read_exact(&mut metadata).unwrap();
    let size = serde_json::from_slice::<serde_json::Value>(&metadata).unwrap()["size"]
        .as_u64()
        .unwrap();

    let reject = match behaviour {
        Behaviour::RejectHandshake => true,
        Behaviour::AlternateReject => n % 2 == 1,
        _ => false,
    };

    let mut payload = Vec::new();
    if reject || behaviour == Behaviour::GarbageHandshake {
        if reject {
            reply(&mut stream, r#"{"status":"rejected"}"#);
        } else {
            reply(&mut stream, "this is not json");
        }
        // Anything the client sends after this is a protocol violation
        stream.read_to_end(&mut payload).unwrap();
    } else {
        reply(
            &mut stream,
            &format!(
                r#"{{"status":"ok","message":"Ready to receive video","video_id":"vid-{}"}}"#,
                n
            ),
        );
        let expected = match behaviour {
            Behaviour::AcceptShort(len) | Behaviour::RejectShort(len) => len,
            _ => size as usize,
        };
        payload.resize(expected, 0);
        stream.read_exact(&mut payload).unwrap();

        if matches!(behaviour, Behaviour::RejectFinal | Behaviour::RejectShort(_)) {
            reply(
                &mut stream,
                r#"{"status":"error","message":"Queue full, try again later"}"#,
            );
        } else {
            reply(
                &mut stream,
                &format!(
                    r#"{{"status":"ok","message":"Upload complete","video_id":"vid-{}"}}"#,
                    n
                ),
            );
        }
    }

    Received {
        prefix,
        metadata,
        payload,
    }
}

/// TCP connector that counts connection attempts
#[derive(Default)]
pub struct CountingConnector {
    pub attempts: AtomicUsize,
}

impl CountingConnector {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for CountingConnector {
    type Stream = TcpStream;

    fn connect(&self, address: &ServerAddress) -> io::Result<TcpStream> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        TcpConnector.connect(address)
    }
}

/// Deterministic, non-repeating-ish test content
pub fn sample_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 7 + i / 251) % 256) as u8).collect()
}
