//! Broker control protocol.
//!
//! Every control or join operation runs over its own short-lived TCP
//! connection: the client writes one [`ControlFrame`] and reads one back.
//!
//! # Wire Format
//!
//! ```text
//! +----------+------------------+---------+------------------+-------------+
//! | code: u8 | key_len: u16 BE  | key     | msg_len: u16 BE  | message     |
//! +----------+------------------+---------+------------------+-------------+
//! ```
//!
//! `key` and `message` are UTF-8. A successful JoinPool response is later
//! followed, on the same connection, by a single dispatch byte once the broker
//! has a request for that slot.

pub mod frame;

pub use frame::{Code, ControlFrame, FrameError};
