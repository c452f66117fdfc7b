//! Error types surfaced by the tunnel client.

use std::io;

use thiserror::Error;

use crate::protocol::{Code, FrameError};

/// Errors raised while managing the broker session.
#[derive(Debug, Error)]
pub enum TunnelError {
    /// The broker rejected the shared key on CreatePool.
    #[error("broker rejected the shared key")]
    Auth,

    /// The broker stopped recognising the session key mid-run.
    #[error("broker revoked the session")]
    SessionRevoked,

    #[error("no active session, call connect first")]
    NotConnected,

    #[error("unexpected broker reply {0:?}")]
    UnexpectedReply(Code),

    #[error("could not resolve broker address: {0:#}")]
    Resolve(anyhow::Error),

    #[error("broker connection failed: {0}")]
    Transport(#[from] io::Error),

    #[error("broker exchange failed: {0}")]
    Frame(#[from] FrameError),
}
