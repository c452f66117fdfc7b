use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::request::RequestHead;
use crate::http::response::Response;

const HTTP_VERSION: &str = "HTTP/1.1";

pub fn serialize_response(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    for (k, v) in &resp.headers {
        buf.extend_from_slice(format!("{k}: {v}\r\n").as_bytes());
    }
    buf.extend_from_slice(b"\r\n");
    buf.extend_from_slice(&resp.body);

    buf
}

/// Serializes a request head for the local service.
///
/// Headers go out in received order as `name:value`, where `value` is the
/// raw text that followed the colon. Nothing is added, dropped or rewritten,
/// `Host` and `Content-Length` included.
pub fn serialize_request_head(head: &RequestHead) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);

    let request_line = format!("{} {} {}\r\n", head.method.as_str(), head.path, head.version);
    buf.extend_from_slice(request_line.as_bytes());

    for (k, v) in &head.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.push(b':');
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

/// Writes a fully serialized message, tracking progress across short writes.
pub struct MessageWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl MessageWriter {
    pub fn response(response: &Response) -> Self {
        Self::from_bytes(serialize_response(response))
    }

    pub fn request_head(head: &RequestHead) -> Self {
        Self::from_bytes(serialize_request_head(head))
    }

    fn from_bytes(buffer: Vec<u8>) -> Self {
        Self { buffer, written: 0 }
    }

    /// Writes whatever is left of the message and flushes. Returns the total
    /// size of the message.
    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<usize>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream
                .write(&self.buffer[self.written..])
                .await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        stream.flush().await?;
        Ok(self.buffer.len())
    }
}
