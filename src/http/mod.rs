//! Minimal HTTP/1.x framing for the relay.
//!
//! The relay never needs a full HTTP stack. It reads the request line and
//! headers to learn where the body ends, forwards them verbatim, and pipes
//! everything else as opaque bytes.
//!
//! - **`parser`**: Parses a request head from a seed buffer plus stream reads
//! - **`request`**: Request head representation and header lookups
//! - **`response`**: Canned responses written when relaying is impossible
//! - **`writer`**: Serializes heads and responses onto a stream
//!
//! # Request Head Lifecycle
//!
//! ```text
//!   dispatch byte ──┐
//!                   ▼
//!        ┌──────────────────┐
//!        │  read_request_   │ ← seed + reads up to the blank line
//!        │  head            │
//!        └──────┬───────────┘
//!               │ RequestHead
//!               ▼
//!        ┌──────────────────┐
//!        │  MessageWriter   │ → local service, headers in received order
//!        └──────────────────┘
//! ```

pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
