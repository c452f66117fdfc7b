//! Burrow - reverse tunnel client
//!
//! Registers a local HTTP service with a remote broker and relays the
//! requests the broker dispatches back to it.

pub mod addr;
pub mod config;
pub mod error;
pub mod http;
pub mod protocol;
pub mod proxy;
pub mod session;

pub use error::TunnelError;
