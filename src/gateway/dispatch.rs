//! Dispatch routing: named server events to typed payloads and handlers.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde_json::Value;

use crate::Result;
use crate::model::{
    Channel, Guild, GuildMember, GuildMemberRemove, Message, Ready, TypingStart, UnavailableGuild,
};
use crate::serde_helpers::deserialize_with_warnings;

/// The closed set of dispatch events this client decodes.
///
/// Anything else routes as [`EventKind::Unknown`] so new server-side events
/// are observable without a client upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum EventKind {
    Ready,
    Resumed,
    ChannelCreate,
    ChannelUpdate,
    ChannelDelete,
    GuildCreate,
    GuildUpdate,
    GuildDelete,
    GuildMemberAdd,
    GuildMemberUpdate,
    GuildMemberRemove,
    MessageCreate,
    MessageUpdate,
    MessageDelete,
    TypingStart,
    Unknown,
}

impl EventKind {
    /// Map a wire event name (`t` field) to its kind.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "READY" => Self::Ready,
            "RESUMED" => Self::Resumed,
            "CHANNEL_CREATE" => Self::ChannelCreate,
            "CHANNEL_UPDATE" => Self::ChannelUpdate,
            "CHANNEL_DELETE" => Self::ChannelDelete,
            "GUILD_CREATE" => Self::GuildCreate,
            "GUILD_UPDATE" => Self::GuildUpdate,
            "GUILD_DELETE" => Self::GuildDelete,
            "GUILD_MEMBER_ADD" => Self::GuildMemberAdd,
            "GUILD_MEMBER_UPDATE" => Self::GuildMemberUpdate,
            "GUILD_MEMBER_REMOVE" => Self::GuildMemberRemove,
            "MESSAGE_CREATE" => Self::MessageCreate,
            "MESSAGE_UPDATE" => Self::MessageUpdate,
            "MESSAGE_DELETE" => Self::MessageDelete,
            "TYPING_START" => Self::TypingStart,
            _ => Self::Unknown,
        }
    }
}

/// A decoded dispatch event.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Event {
    Ready(Ready),
    Resumed,
    ChannelCreate(Channel),
    ChannelUpdate(Channel),
    ChannelDelete(Channel),
    GuildCreate(Guild),
    GuildUpdate(Guild),
    GuildDelete(UnavailableGuild),
    GuildMemberAdd(GuildMember),
    GuildMemberUpdate(GuildMember),
    GuildMemberRemove(GuildMemberRemove),
    MessageCreate(Message),
    MessageUpdate(Message),
    MessageDelete(Message),
    TypingStart(TypingStart),
    /// An event name this client has no mapping for; raw payload preserved.
    Unknown { name: String, data: Value },
}

impl Event {
    /// Decode a dispatch payload by event name.
    ///
    /// Unmapped names always succeed as [`Event::Unknown`]; a mapped name
    /// whose payload does not fit its type is an error the caller logs and
    /// drops without touching the connection.
    pub fn decode(name: &str, data: Value) -> Result<Self> {
        let event = match EventKind::from_name(name) {
            EventKind::Ready => Self::Ready(deserialize_with_warnings(data)?),
            EventKind::Resumed => Self::Resumed,
            EventKind::ChannelCreate => Self::ChannelCreate(deserialize_with_warnings(data)?),
            EventKind::ChannelUpdate => Self::ChannelUpdate(deserialize_with_warnings(data)?),
            EventKind::ChannelDelete => Self::ChannelDelete(deserialize_with_warnings(data)?),
            EventKind::GuildCreate => Self::GuildCreate(deserialize_with_warnings(data)?),
            EventKind::GuildUpdate => Self::GuildUpdate(deserialize_with_warnings(data)?),
            EventKind::GuildDelete => Self::GuildDelete(deserialize_with_warnings(data)?),
            EventKind::GuildMemberAdd => Self::GuildMemberAdd(deserialize_with_warnings(data)?),
            EventKind::GuildMemberUpdate => {
                Self::GuildMemberUpdate(deserialize_with_warnings(data)?)
            }
            EventKind::GuildMemberRemove => {
                Self::GuildMemberRemove(deserialize_with_warnings(data)?)
            }
            EventKind::MessageCreate => Self::MessageCreate(deserialize_with_warnings(data)?),
            EventKind::MessageUpdate => Self::MessageUpdate(deserialize_with_warnings(data)?),
            EventKind::MessageDelete => Self::MessageDelete(deserialize_with_warnings(data)?),
            EventKind::TypingStart => Self::TypingStart(deserialize_with_warnings(data)?),
            EventKind::Unknown => Self::Unknown {
                name: name.to_owned(),
                data,
            },
        };

        Ok(event)
    }

    /// The kind this event routes under.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Ready(_) => EventKind::Ready,
            Self::Resumed => EventKind::Resumed,
            Self::ChannelCreate(_) => EventKind::ChannelCreate,
            Self::ChannelUpdate(_) => EventKind::ChannelUpdate,
            Self::ChannelDelete(_) => EventKind::ChannelDelete,
            Self::GuildCreate(_) => EventKind::GuildCreate,
            Self::GuildUpdate(_) => EventKind::GuildUpdate,
            Self::GuildDelete(_) => EventKind::GuildDelete,
            Self::GuildMemberAdd(_) => EventKind::GuildMemberAdd,
            Self::GuildMemberUpdate(_) => EventKind::GuildMemberUpdate,
            Self::GuildMemberRemove(_) => EventKind::GuildMemberRemove,
            Self::MessageCreate(_) => EventKind::MessageCreate,
            Self::MessageUpdate(_) => EventKind::MessageUpdate,
            Self::MessageDelete(_) => EventKind::MessageDelete,
            Self::TypingStart(_) => EventKind::TypingStart,
            Self::Unknown { .. } => EventKind::Unknown,
        }
    }
}

/// Boxed error type handlers may return; failures are logged per handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

type Handler = Arc<dyn Fn(&Event) -> std::result::Result<(), HandlerError> + Send + Sync>;

/// Token returned by [`DispatchRouter::on`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Routes decoded events to registered handlers.
///
/// Handlers for a kind run in registration order. A handler that returns
/// an error or panics is logged and skipped; later handlers still run and
/// the connection is never affected.
#[derive(Default)]
pub struct DispatchRouter {
    handlers: DashMap<EventKind, Vec<(HandlerId, Handler)>>,
    next_id: AtomicU64,
}

impl DispatchRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind. Returns a token for [`Self::off`].
    pub fn on<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&Event) -> std::result::Result<(), HandlerError> + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Unregister a handler. Returns whether anything was removed.
    pub fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        let Some(mut entry) = self.handlers.get_mut(&kind) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|(registered, _)| *registered != id);
        entry.len() != before
    }

    /// Number of handlers currently registered across all kinds.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.iter().map(|entry| entry.len()).sum()
    }

    /// Deliver an event to every handler registered for its kind.
    pub fn route(&self, event: &Event) {
        // Snapshot under the shard lock, invoke outside it, so a handler can
        // call on/off without deadlocking.
        let snapshot: Vec<Handler> = self
            .handlers
            .get(&event.kind())
            .map(|entry| entry.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        for handler in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(kind = ?event.kind(), error = %e, "event handler failed");
                    #[cfg(not(feature = "tracing"))]
                    let _: &HandlerError = &e;
                }
                Err(panic) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(kind = ?event.kind(), "event handler panicked");
                    #[cfg(not(feature = "tracing"))]
                    let _: &Box<dyn std::any::Any + Send> = &panic;
                }
            }
        }
    }
}
