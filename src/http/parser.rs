use std::io;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::http::request::{Method, RequestHead, is_token};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed request line")]
    InvalidRequest,
    #[error("request method is not a valid token")]
    InvalidMethod,
    #[error("malformed header line")]
    InvalidHeader,
    #[error("request head is incomplete")]
    Incomplete,
    #[error("request head exceeds {0} bytes")]
    TooLarge(usize),
    #[error("connection closed before the request head was complete")]
    ConnectionClosed,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Parses a request line and header block from the start of `buf`.
///
/// Returns the head and the number of bytes it occupies, including the
/// terminating blank line. Anything after that is body and is left alone.
pub fn parse_request_head(buf: &[u8]) -> Result<(RequestHead, usize), ParseError> {
    // Look for header/body separator
    let headers_end = find_headers_end(buf).ok_or(ParseError::Incomplete)?;
    let header_bytes = &buf[..headers_end];

    let headers_str = std::str::from_utf8(header_bytes)
        .map_err(|_| ParseError::InvalidRequest)?;

    let mut lines = headers_str.split("\r\n");

    // Request line
    let request_line = lines.next().ok_or(ParseError::InvalidRequest)?;
    let mut parts = request_line.split_whitespace();

    let method_str = parts.next().ok_or(ParseError::InvalidRequest)?;
    let path = parts.next().ok_or(ParseError::InvalidRequest)?;
    let version = parts.next().ok_or(ParseError::InvalidRequest)?;

    if parts.next().is_some() || !version.starts_with("HTTP/") {
        return Err(ParseError::InvalidRequest);
    }

    let method = Method::from_str(method_str).ok_or(ParseError::InvalidMethod)?;

    let mut headers = Vec::new();

    for line in lines {
        if line.is_empty() {
            continue;
        }

        let (key, value) = line
            .split_once(':')
            .ok_or(ParseError::InvalidHeader)?;

        // No whitespace is allowed between the field name and the colon
        if !is_token(key) {
            return Err(ParseError::InvalidHeader);
        }

        headers.push((key.to_string(), value.to_string()));
    }

    let head = RequestHead {
        method,
        path: path.to_string(),
        version: version.to_string(),
        headers,
    };

    Ok((head, headers_end + 4))
}

/// Reads a request head off a stream.
///
/// `seed` holds bytes already taken from the stream (the dispatch byte) and is
/// treated as the start of the request. Reads stop right after the blank line,
/// so the body is still unread on `reader` when this returns.
pub async fn read_request_head<R>(
    reader: &mut R,
    seed: &[u8],
    max_bytes: usize,
) -> Result<RequestHead, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(512);
    buf.extend_from_slice(seed);

    loop {
        match parse_request_head(&buf) {
            Ok((head, _)) => return Ok(head),
            Err(ParseError::Incomplete) => {}
            Err(e) => return Err(e),
        }

        if buf.len() > max_bytes {
            return Err(ParseError::TooLarge(max_bytes));
        }

        // Never read past the byte that would push us over the limit
        let budget = (max_bytes + 1 - buf.len()) as u64;
        let n = (&mut *reader).take(budget).read_until(b'\n', &mut buf).await?;

        if n == 0 {
            return Err(ParseError::ConnectionClosed);
        }
    }
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
}
