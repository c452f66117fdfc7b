use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::http::parser::{ParseError, read_request_head};
use crate::http::writer::MessageWriter;

/// HTTP request methods.
///
/// Represents the HTTP method/verb of a relayed request. The relay forwards
/// every method unchanged, registered or not; parsing only rejects request
/// lines whose method is not a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// CONNECT - Establish a tunnel
    CONNECT,
    /// TRACE - Message loop-back test
    TRACE,
    /// Any other method token (WebDAV verbs, custom methods), kept as received
    Extension(String),
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// Matching is case-sensitive, as method tokens are on the wire. Tokens
    /// outside the standard set become [`Method::Extension`]; only strings
    /// that are not a valid token are refused.
    ///
    /// # Example
    ///
    /// ```
    /// # use burrow::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("PROPFIND"), Some(Method::Extension("PROPFIND".into())));
    /// assert_eq!(Method::from_str("GE T"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        let method = match s {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "HEAD" => Method::HEAD,
            "OPTIONS" => Method::OPTIONS,
            "PATCH" => Method::PATCH,
            "CONNECT" => Method::CONNECT,
            "TRACE" => Method::TRACE,
            other if is_token(other) => Method::Extension(other.to_string()),
            _ => return None,
        };
        Some(method)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::CONNECT => "CONNECT",
            Method::TRACE => "TRACE",
            Method::Extension(token) => token,
        }
    }
}

/// Whether `s` is an HTTP token (`1*tchar`), the grammar of method and
/// header names.
pub fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(
                    b,
                    b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.'
                        | b'^' | b'_' | b'`' | b'|' | b'~'
                )
        })
}

/// Request line and header block of a relayed request.
///
/// The body is never buffered here; it stays on the connection and is piped
/// separately.
#[derive(Debug, Clone)]
pub struct RequestHead {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request target as received (e.g. "/index.html?x=1")
    pub path: String,
    /// HTTP version (typically "HTTP/1.1")
    pub version: String,
    /// Headers in the order received, names in their original case.
    ///
    /// Values are the raw text after the colon, surrounding whitespace
    /// included, so the head is written back byte for byte.
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    /// Retrieves a header value by name, ignoring ASCII case.
    ///
    /// When a header is repeated the last occurrence wins.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.trim())
    }

    /// The declared body length.
    ///
    /// `None` if the header is missing or not a valid number; such requests
    /// are relayed without a body.
    pub fn content_length(&self) -> Option<usize> {
        self.header("Content-Length")
            .and_then(|v| v.parse().ok())
    }

    /// Reads a request head from `seed` followed by `reader`, leaving any body
    /// bytes unread. See [`read_request_head`].
    pub async fn read_from<R>(
        reader: &mut R,
        seed: &[u8],
        max_bytes: usize,
    ) -> Result<Self, ParseError>
    where
        R: AsyncBufRead + Unpin,
    {
        read_request_head(reader, seed, max_bytes).await
    }

    /// Writes the head to `writer` in received order; returns bytes written.
    pub async fn write_to<W>(&self, writer: &mut W) -> anyhow::Result<usize>
    where
        W: AsyncWrite + Unpin,
    {
        MessageWriter::request_head(self).write_to_stream(writer).await
    }
}
