//! Response types specific to the REST API.
//!
//! Resource endpoints return [`crate::model`] types directly; the types here
//! exist only for endpoints with no Gateway counterpart.

use serde::Deserialize;

/// Response from `GET /gateway/bot`.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayBot {
    /// WebSocket URL to dial
    pub url: String,
    /// Suggested number of shards
    pub shards: u64,
    #[serde(default)]
    pub session_start_limit: Option<SessionStartLimit>,
}

/// How many new sessions the token may start before being rate limited.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize)]
pub struct SessionStartLimit {
    pub total: u64,
    pub remaining: u64,
    /// Milliseconds until the limit resets
    pub reset_after: u64,
    #[serde(default = "default_concurrency")]
    pub max_concurrency: u64,
}

fn default_concurrency() -> u64 {
    1
}
