use std::error::Error as StdError;
use std::fmt;

use tokio_tungstenite::tungstenite;

use crate::error::{Error, Kind};

/// Gateway-specific error conditions.
#[non_exhaustive]
#[derive(Debug)]
pub enum GatewayError {
    /// Underlying WebSocket transport error
    Connection(tungstenite::Error),
    /// The transport closed while we still expected frames
    ConnectionClosed,
    /// The server never sent HELLO within the configured window
    HelloTimeout,
    /// An event consumer fell behind the broadcast channel
    Lagged {
        /// Number of events skipped
        count: u64,
    },
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(e) => write!(f, "gateway transport error: {e}"),
            Self::ConnectionClosed => write!(f, "gateway connection closed unexpectedly"),
            Self::HelloTimeout => write!(f, "timed out waiting for the gateway HELLO frame"),
            Self::Lagged { count } => {
                write!(f, "event receiver lagged, {count} events were dropped")
            }
        }
    }
}

impl StdError for GatewayError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Connection(e) => Some(e),
            Self::ConnectionClosed | Self::HelloTimeout | Self::Lagged { .. } => None,
        }
    }
}

impl From<GatewayError> for Error {
    fn from(e: GatewayError) -> Self {
        Error::with_source(Kind::Gateway, e)
    }
}

impl From<tungstenite::Error> for Error {
    fn from(e: tungstenite::Error) -> Self {
        GatewayError::Connection(e).into()
    }
}
