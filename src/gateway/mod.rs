//! Gateway: the persistent WebSocket side of the API.
//!
//! One [`GatewayConnection`] owns one session. A background task supervises
//! the transport: it performs the HELLO/IDENTIFY handshake, heartbeats on
//! the server's schedule, resumes interrupted sessions, and reconnects with
//! exponential backoff. Dispatched events fan out to broadcast subscribers
//! and to handlers registered on the [`DispatchRouter`].

pub mod codec;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
mod heartbeat;
pub mod session;

pub use codec::{DecodeError, Frame, OpCode};
pub use config::{Config, ConnectionProperties, Intents, ReconnectConfig, Shard};
pub use connection::{ConnectionState, GatewayConnection};
pub use dispatch::{DispatchRouter, Event, EventKind, HandlerError, HandlerId};
pub use error::GatewayError;
pub use session::Session;
