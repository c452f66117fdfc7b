//! Per-request relay between a dispatched broker connection and the local
//! service.
//!
//! The relay parses just enough of the request to know where its body ends,
//! pipes the body through in fixed-size chunks, then streams the local
//! service's response back byte for byte. Responses are never inspected.

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::addr::Addr;
use crate::config::Config;
use crate::http::parser::ParseError;
use crate::http::request::{Method, RequestHead};
use crate::http::response::Response;
use crate::http::writer::MessageWriter;
use crate::proxy::pool::{SlotId, SlotPool};

/// What happened to a dispatched request.
#[derive(Debug)]
pub enum RelayOutcome {
    /// Request forwarded and the response streamed back
    Completed(RelaySummary),
    /// Local service refused the connection; the canned 502 was sent
    LocalUnreachable,
    /// Request head was malformed; a 400 was sent
    BadRequest(ParseError),
}

#[derive(Debug, Clone)]
pub struct RelaySummary {
    pub slot: SlotId,
    pub method: Method,
    pub path: String,
    pub version: String,
    /// Body bytes piped to the local service
    pub request_body_bytes: usize,
    /// Bytes streamed back to the broker
    pub response_bytes: usize,
}

/// Sizes of the chunks a body of `len` bytes is piped in.
///
/// `len / chunk_size` full chunks followed by one chunk of the remainder. The
/// remainder chunk is always present, even when it is zero.
pub fn chunk_plan(len: usize, chunk_size: usize) -> impl Iterator<Item = usize> {
    std::iter::repeat_n(chunk_size, len / chunk_size).chain(std::iter::once(len % chunk_size))
}

/// Forwards dispatched requests to the local service.
#[derive(Debug, Clone)]
pub struct Relay {
    local: Addr,
    pool: SlotPool,
    pipe_chunk_size: usize,
    response_chunk_size: usize,
    max_header_bytes: usize,
}

impl Relay {
    pub fn new(cfg: &Config, pool: SlotPool) -> Self {
        Self {
            local: cfg.local_addr(),
            pool,
            pipe_chunk_size: cfg.pipe_chunk_size,
            response_chunk_size: cfg.response_chunk_size,
            max_header_bytes: cfg.max_header_bytes,
        }
    }

    /// Relay one request and hand `slot` back to the pool.
    ///
    /// `seed` is the dispatch byte already read from `broker`; it is the first
    /// byte of the request line. The slot is released whatever the outcome.
    pub async fn forward<B>(&self, broker: B, seed: u8, slot: SlotId) -> Result<RelayOutcome>
    where
        B: AsyncRead + AsyncWrite + Unpin,
    {
        let result = self.relay(broker, seed, slot).await;

        match &result {
            Ok(RelayOutcome::Completed(summary)) => {
                tracing::info!(
                    slot,
                    method = %summary.method.as_str(),
                    path = %summary.path,
                    version = %summary.version,
                    request_bytes = summary.request_body_bytes,
                    response_bytes = summary.response_bytes,
                    "Request forwarded"
                );
            }
            Ok(RelayOutcome::LocalUnreachable) => {
                tracing::warn!(slot, local = %self.local, "Local service unreachable");
            }
            Ok(RelayOutcome::BadRequest(e)) => {
                tracing::warn!(slot, error = %e, "Rejected malformed request");
            }
            Err(e) => {
                tracing::error!(slot, error = %e, "Relay failed");
            }
        }

        self.pool.release(slot).await;
        result
    }

    async fn relay<B>(&self, broker: B, seed: u8, slot: SlotId) -> Result<RelayOutcome>
    where
        B: AsyncRead + AsyncWrite + Unpin,
    {
        let mut broker = BufReader::new(broker);

        let mut local = match TcpStream::connect(self.local.to_string()).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::debug!(slot, error = %e, "Failed to connect to local service");
                MessageWriter::response(&Response::local_unreachable())
                    .write_to_stream(&mut broker)
                    .await
                    .context("failed to report unreachable local service")?;
                let _ = broker.shutdown().await;
                return Ok(RelayOutcome::LocalUnreachable);
            }
        };

        let head = match RequestHead::read_from(&mut broker, &[seed], self.max_header_bytes).await {
            Ok(head) => head,
            Err(e @ (ParseError::Io(_) | ParseError::ConnectionClosed)) => {
                return Err(e).context("failed to read request head");
            }
            Err(e) => {
                MessageWriter::response(&Response::bad_request())
                    .write_to_stream(&mut broker)
                    .await
                    .context("failed to reject malformed request")?;
                let _ = broker.shutdown().await;
                return Ok(RelayOutcome::BadRequest(e));
            }
        };

        let head_bytes = head
            .write_to(&mut local)
            .await
            .context("failed to send request head to local service")?;
        tracing::trace!(slot, bytes = head_bytes, "Request head sent");

        let request_body_bytes = match head.content_length() {
            Some(len) => {
                pipe_body(&mut broker, &mut local, len, self.pipe_chunk_size).await?;
                len
            }
            None => 0,
        };

        let response_bytes =
            stream_response(&mut local, &mut broker, self.response_chunk_size).await?;

        let _ = local.shutdown().await;
        let _ = broker.shutdown().await;

        Ok(RelayOutcome::Completed(summarize(slot, head, request_body_bytes, response_bytes)))
    }
}

fn summarize(
    slot: SlotId,
    head: RequestHead,
    request_body_bytes: usize,
    response_bytes: usize,
) -> RelaySummary {
    RelaySummary {
        slot,
        method: head.method,
        path: head.path,
        version: head.version,
        request_body_bytes,
        response_bytes,
    }
}

/// Copy exactly `len` body bytes from `src` to `dst`, chunked per
/// [`chunk_plan`].
pub async fn pipe_body<R, W>(src: &mut R, dst: &mut W, len: usize, chunk_size: usize) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; chunk_size.min(len.max(1))];

    for chunk in chunk_plan(len, chunk_size) {
        let chunk = &mut buf[..chunk];
        src.read_exact(chunk)
            .await
            .context("request body ended early")?;
        dst.write_all(chunk)
            .await
            .context("failed to write request body to local service")?;
    }

    dst.flush().await?;
    Ok(())
}

/// Stream everything `src` produces into `dst` until `src` ends.
///
/// A read error on `src` ends the stream like EOF does; a write error on
/// `dst` fails the relay. Returns the number of bytes copied.
pub async fn stream_response<R, W>(src: &mut R, dst: &mut W, chunk_size: usize) -> Result<usize>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; chunk_size];
    let mut total = 0;

    loop {
        let n = match src.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, "Local service read failed, ending response");
                break;
            }
        };

        dst.write_all(&buf[..n])
            .await
            .context("failed to write response to broker")?;
        total += n;
    }

    dst.flush().await?;
    Ok(total)
}
