//! Binary ingestion listener.
//!
//! Each accepted TCP connection is a persistent stream of back-to-back
//! [`FRAME_LEN`]-byte frames. Every connection runs in its own task:
//!
//! - valid frames are recorded in the [`DeviceStore`](telemetry_store::DeviceStore)
//!   in the order they arrive on that connection
//! - frames with a bad checksum are dropped and reading continues
//! - trailing bytes shorter than a frame are discarded when the peer closes
//! - a connection silent for longer than the idle timeout is closed
//!
//! Nothing is ever written back to the client.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use futures::StreamExt;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::time::timeout;
use tokio_util::codec::{Decoder, FramedRead};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use telemetry_types::{FRAME_LEN, FrameError, Reading, frame};

use crate::state::AppState;

/// Delay before retrying after a failed `accept` (e.g. descriptor exhaustion).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Splits a byte stream into fixed-size frames and validates each one.
///
/// A checksum failure is yielded as an item rather than a stream error so the
/// connection keeps reading after it.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Result<Reading, FrameError>;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < FRAME_LEN {
            src.reserve(FRAME_LEN - src.len());
            return Ok(None);
        }

        let bytes = src.split_to(FRAME_LEN);
        Ok(Some(frame::decode(&bytes)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        if !src.is_empty() {
            debug!("Discarding {} trailing byte(s) at end of stream", src.len());
            src.clear();
        }
        Ok(None)
    }
}

/// TCP listener feeding decoded readings into the shared store.
pub struct IngestListener {
    listener: TcpListener,
    state: Arc<AppState>,
    idle_timeout: Duration,
}

impl IngestListener {
    /// Bind the listening socket.
    ///
    /// The idle timeout is taken from `state.config.ingest`.
    pub async fn bind<A: ToSocketAddrs>(addr: A, state: Arc<AppState>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let idle_timeout = state.config.ingest.idle_timeout();
        Ok(Self {
            listener,
            state,
            idle_timeout,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` is cancelled.
    ///
    /// Each connection gets its own task; a failing connection never stops the
    /// accept loop. Open connections are told to stop through a child token
    /// when the listener shuts down.
    pub async fn run(self, shutdown: CancellationToken) {
        match self.local_addr() {
            Ok(addr) => info!("Ingestion listener accepting frames on {}", addr),
            Err(_) => info!("Ingestion listener accepting frames"),
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Ingestion listener stopping");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let state = Arc::clone(&self.state);
                        let cancel = shutdown.child_token();
                        let idle_timeout = self.idle_timeout;
                        tokio::spawn(async move {
                            handle_connection(stream, peer, state, idle_timeout, cancel).await;
                        });
                    }
                    Err(e) => {
                        warn!("Failed to accept ingestion connection: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }
    }
}

/// Read frames from one connection until it closes, errors, idles out, or the
/// listener shuts down.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    state: Arc<AppState>,
    idle_timeout: Duration,
    shutdown: CancellationToken,
) {
    let _open = state.ingest.connection_opened();
    debug!("Ingestion connection from {}", peer);

    let mut frames = FramedRead::new(stream, FrameCodec);
    let mut accepted = 0u64;
    let mut rejected = 0u64;

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = timeout(idle_timeout, frames.next()) => next,
        };

        let item = match next {
            Err(_) => {
                debug!("Connection from {} idle for {:?}, closing", peer, idle_timeout);
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                debug!("Connection from {} failed: {}", peer, e);
                break;
            }
            Ok(Some(Ok(item))) => item,
        };

        match item {
            Ok(reading) => {
                state.store.record(reading);
                state.ingest.frame_accepted();
                accepted += 1;
            }
            Err(e) => {
                state.ingest.frame_rejected();
                rejected += 1;
                debug!("Dropped frame from {}: {}", peer, e);
            }
        }
    }

    debug!(
        "Connection from {} closed ({} frame(s) recorded, {} rejected)",
        peer, accepted, rejected
    );
}
