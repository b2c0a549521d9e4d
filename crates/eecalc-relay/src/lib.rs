//! eecalc-relay - namespaced fan-out of sheet events over TCP.
//!
//! Each namespace keeps a text mirror of its sheet so that a joining client can
//! be sent a `sheet` snapshot. Events are rebroadcast in arrival order to every
//! member of the namespace except the sender.

pub mod client;
pub mod error;
pub mod frame;
pub mod namespace;
pub mod server;

pub use client::{RelayConnection, connect};
pub use error::{RelayError, Result};
pub use frame::{FrameReader, MAX_FRAME_BYTES, MAX_SNAPSHOT_FRAME_BYTES};
pub use namespace::{ConnId, Namespace, Namespaces, Relayed};
pub use server::RelayServer;

/// Address the relay binds and clients dial when nothing else is configured.
pub const DEFAULT_ADDR: &str = "127.0.0.1:7878";
