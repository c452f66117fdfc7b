//! Reverse tunnel core
//!
//! This module implements the client side of the tunnel: the slot pool,
//! registration of slots with the broker, and relaying of dispatched requests
//! to the local service.

pub mod manager;
pub mod pool;
pub mod relay;

pub use manager::PoolManager;
pub use pool::{SlotId, SlotPool};
pub use relay::{Relay, RelayOutcome, RelaySummary};
