//! Request option types for the REST API.
//!
//! Every optional field serializes only when set, so a PATCH touches
//! exactly the fields the caller asked to change.

use bon::Builder;
use serde::Serialize;
use serde_json::Value;

use crate::model::{ChannelType, Id};

/// Options for creating a guild channel.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Builder)]
pub struct CreateChannel {
    #[builder(into)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChannelType,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nsfw: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_user: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Id>,
}

/// Options for modifying an existing channel.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Builder)]
pub struct ModifyChannel {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "type")]
    pub kind: Option<ChannelType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nsfw: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_user: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Id>,
}

/// Options for sending a message.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Builder)]
pub struct CreateMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts: Option<bool>,
    /// Rich embed, passed through untyped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<Value>,
}

impl CreateMessage {
    /// Plain text message.
    #[must_use]
    pub fn text<S: Into<String>>(content: S) -> Self {
        Self::builder().content(content.into()).build()
    }
}

/// Options for editing a message.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Builder)]
pub struct ModifyMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<Value>,
}

/// Options for modifying a guild.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Builder)]
pub struct ModifyGuild {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_message_notifications: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explicit_content_filter: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub afk_channel_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub afk_timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_channel_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_channel_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_updates_channel_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub preferred_locale: Option<String>,
}

/// Options for modifying a guild member.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Builder)]
pub struct ModifyMember {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub nick: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Id>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mute: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deaf: Option<bool>,
    /// Voice channel to move the member to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Id>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unset_fields_are_omitted_from_patches() {
        let options = ModifyChannel::builder().topic("rules and info").build();

        let encoded = serde_json::to_value(&options).expect("encode failed");

        assert_eq!(encoded, json!({ "topic": "rules and info" }));
    }

    #[test]
    fn channel_kind_serializes_under_wire_name() {
        let options = CreateChannel::builder()
            .name("general")
            .kind(ChannelType::GuildText)
            .build();

        let encoded = serde_json::to_value(&options).expect("encode failed");

        assert_eq!(encoded, json!({ "name": "general", "type": 0 }));
    }

    #[test]
    fn text_message_sets_only_content() {
        let message = CreateMessage::text("hello");

        let encoded = serde_json::to_value(&message).expect("encode failed");

        assert_eq!(encoded, json!({ "content": "hello" }));
    }
}
