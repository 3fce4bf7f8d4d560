//! REST API client and types.
//!
//! **Feature flag:** `rest` (required to use this module)
//!
//! Thin request/response glue over the HTTP API. The one endpoint the
//! Gateway side depends on is [`Client::gateway_bot`], which returns the
//! WebSocket URL to dial; everything else is ordinary resource CRUD.
//!
//! ## Available endpoints
//!
//! | Endpoint | Description |
//! |----------|-------------|
//! | `GET /gateway/bot` | Gateway URL and suggested shard count |
//! | `POST /guilds/{id}/channels` | Create a guild channel |
//! | `PATCH /channels/{id}` | Modify a channel |
//! | `DELETE /channels/{id}` | Delete a channel or close a DM |
//! | `POST /channels/{id}/messages` | Send a message |
//! | `PATCH /channels/{id}/messages/{id}` | Edit a message |
//! | `DELETE /channels/{id}/messages/{id}` | Delete a message |
//! | `PUT/DELETE .../reactions/...` | Add and remove reactions |
//! | `POST /channels/{id}/typing` | Trigger the typing indicator |
//! | `PUT/DELETE /channels/{id}/pins/{id}` | Pin and unpin messages |
//! | `PATCH /guilds/{id}` | Modify a guild |
//! | `DELETE /guilds/{id}` | Delete a guild |
//! | `PATCH /guilds/{id}/members/{id}` | Modify a guild member |

pub mod client;
pub mod types;

pub use client::Client;
