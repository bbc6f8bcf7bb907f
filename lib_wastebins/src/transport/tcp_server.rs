//! # TCP Transport
//!
//! Accepts connections, reads one request from each, hands the decoded
//! request to the [`Dispatcher`] and writes the encoded reply back before
//! closing the connection.
//!
//! A request is considered complete once the header terminator has arrived
//! and, when a `Content-Length` header is present, that many body bytes have
//! followed it. Without `Content-Length` whatever arrived together with the
//! headers is taken as the body. Reading also stops at EOF or when the
//! configured byte limit is reached.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task;
use tokio_graceful::ShutdownGuard;
use tracing::{debug, info, trace, warn};

use crate::core::Dispatcher;
use crate::protocol::request::{content_length, header_end};
use crate::protocol::{Request, Response, StatusCode};

const READ_CHUNK_BYTES: usize = 1024;

/// Outcome of reading one request off a connection.
#[derive(Debug, PartialEq, Eq)]
enum RawRequest {
    /// The peer closed without sending anything.
    Empty,
    Complete(Vec<u8>),
    TooLarge,
}

async fn read_request<S>(stream: &mut S, max_request_bytes: usize) -> io::Result<RawRequest>
where
    S: AsyncRead + Unpin,
{
    let mut buf: Vec<u8> = Vec::with_capacity(READ_CHUNK_BYTES);
    let mut chunk = [0u8; READ_CHUNK_BYTES];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        match header_end(&buf) {
            Some(end) => match content_length(&buf[..end]) {
                Some(len) => {
                    let expected = end.saturating_add(len);
                    if expected > max_request_bytes {
                        return Ok(RawRequest::TooLarge);
                    }
                    if buf.len() >= expected {
                        buf.truncate(expected);
                        break;
                    }
                }
                None => {
                    if buf.len() > max_request_bytes {
                        return Ok(RawRequest::TooLarge);
                    }
                    break;
                }
            },
            None if buf.len() >= max_request_bytes => return Ok(RawRequest::TooLarge),
            None => {}
        }
    }

    if buf.is_empty() {
        Ok(RawRequest::Empty)
    } else {
        Ok(RawRequest::Complete(buf))
    }
}

/// # Handle Connection
///
/// Serves exactly one request on `stream`. Protocol problems are answered
/// with an error response; only I/O failures are returned as errors.
pub async fn handle_connection<S>(mut stream: S, dispatcher: &Dispatcher, max_request_bytes: usize) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let response = match read_request(&mut stream, max_request_bytes).await? {
        RawRequest::Empty => {
            debug!("Connection closed before a request was sent");
            return Ok(());
        }
        RawRequest::TooLarge => {
            warn!("Rejecting request larger than {} bytes", max_request_bytes);
            Response::error(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("request exceeds {} bytes", max_request_bytes),
            )
        }
        RawRequest::Complete(raw) => {
            trace!("Raw request: {}", String::from_utf8_lossy(&raw));
            match Request::from_bytes(&raw) {
                Ok(request) => dispatcher.dispatch(&request).await,
                Err(e) => {
                    warn!("Failed to decode request: {}", e);
                    Response::error(StatusCode::BAD_REQUEST, e)
                }
            }
        }
    };

    stream.write_all(&response.encode()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// # Serve
///
/// Accept loop. Each connection runs in its own task holding a clone of the
/// shutdown guard, so a graceful shutdown waits for in-flight replies. The
/// loop returns once the guard is cancelled.
pub async fn serve(
    listener: TcpListener,
    dispatcher: Dispatcher,
    max_request_bytes: usize,
    shutdown_guard: ShutdownGuard,
) {
    match listener.local_addr() {
        Ok(addr) => info!("Bin server listening on {}", addr),
        Err(e) => warn!("Bin server listening on an unknown address: {}", e),
    }

    loop {
        tokio::select! {
            _ = shutdown_guard.cancelled() => {
                info!("Signal received: initiate graceful shutdown");
                break;
            }
            result = listener.accept() => {
                match result {
                    Ok((socket, peer)) => {
                        let guard = shutdown_guard.clone();
                        let dispatcher = dispatcher.clone();
                        task::spawn(async move {
                            debug!(%peer, "Connection accepted");
                            if let Err(e) = handle_connection(socket, &dispatcher, max_request_bytes).await {
                                warn!(%peer, "Failed to handle client: {}", e);
                            }
                            drop(guard);
                        });
                    }
                    Err(e) => {
                        warn!("accept error: {:?}", e);
                    }
                }
            }
        }
    }
}
