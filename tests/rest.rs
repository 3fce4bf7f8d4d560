#![cfg(feature = "rest")]
#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]

mod common;

use discord_client_sdk::SecretString;
use discord_client_sdk::model::Id;
use discord_client_sdk::rest::Client;

use crate::common::TOKEN;

const CHANNEL_ID: Id = Id(290_926_798_999_357_250);
const MESSAGE_ID: Id = Id(310_000_000_000_000_001);
const GUILD_ID: Id = Id(197_038_439_483_310_086);

fn client(base_url: &str) -> Client {
    Client::with_host(SecretString::from(TOKEN), base_url).expect("client construction failed")
}

mod gateway_bot {
    use httpmock::{Method::GET, MockServer};
    use reqwest::StatusCode;
    use serde_json::json;

    use super::{TOKEN, client};

    #[tokio::test]
    async fn gateway_bot_should_succeed() -> anyhow::Result<()> {
        let server = MockServer::start();
        let client = client(&server.base_url());

        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/gateway/bot")
                .header("authorization", format!("Bot {TOKEN}"));
            then.status(StatusCode::OK).json_body(json!({
                "url": "wss://gateway.example.com",
                "shards": 2,
                "session_start_limit": {
                    "total": 1000,
                    "remaining": 999,
                    "reset_after": 14_400_000,
                    "max_concurrency": 1
                }
            }));
        });

        let response = client.gateway_bot().await?;

        assert_eq!(response.url, "wss://gateway.example.com");
        assert_eq!(response.shards, 2);
        let limit = response.session_start_limit.expect("limit missing");
        assert_eq!(limit.remaining, 999);
        mock.assert();

        Ok(())
    }
}

mod messages {
    use discord_client_sdk::rest::types::request::{CreateMessage, ModifyMessage};
    use httpmock::{Method::DELETE, Method::PATCH, Method::POST, MockServer};
    use reqwest::StatusCode;
    use serde_json::json;

    use super::{CHANNEL_ID, MESSAGE_ID, TOKEN, client};

    #[tokio::test]
    async fn create_message_should_succeed() -> anyhow::Result<()> {
        let server = MockServer::start();
        let client = client(&server.base_url());

        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(format!("/channels/{CHANNEL_ID}/messages"))
                .header("authorization", format!("Bot {TOKEN}"))
                .json_body(json!({ "content": "hello there" }));
            then.status(StatusCode::OK).json_body(json!({
                "id": "310000000000000001",
                "channel_id": CHANNEL_ID.to_string(),
                "content": "hello there",
                "author": { "id": "1", "username": "bot" }
            }));
        });

        let message = client
            .create_message(CHANNEL_ID, &CreateMessage::text("hello there"))
            .await?;

        assert_eq!(message.id, MESSAGE_ID);
        assert_eq!(message.content, "hello there");
        mock.assert();

        Ok(())
    }

    #[tokio::test]
    async fn modify_message_should_send_only_set_fields() -> anyhow::Result<()> {
        let server = MockServer::start();
        let client = client(&server.base_url());

        let mock = server.mock(|when, then| {
            when.method(PATCH)
                .path(format!("/channels/{CHANNEL_ID}/messages/{MESSAGE_ID}"))
                .json_body(json!({ "content": "edited" }));
            then.status(StatusCode::OK).json_body(json!({
                "id": MESSAGE_ID.to_string(),
                "channel_id": CHANNEL_ID.to_string(),
                "content": "edited"
            }));
        });

        let edit = ModifyMessage::builder().content("edited".to_owned()).build();
        let message = client.modify_message(CHANNEL_ID, MESSAGE_ID, &edit).await?;

        assert_eq!(message.content, "edited");
        mock.assert();

        Ok(())
    }

    #[tokio::test]
    async fn delete_message_should_accept_no_content() -> anyhow::Result<()> {
        let server = MockServer::start();
        let client = client(&server.base_url());

        let mock = server.mock(|when, then| {
            when.method(DELETE)
                .path(format!("/channels/{CHANNEL_ID}/messages/{MESSAGE_ID}"));
            then.status(StatusCode::NO_CONTENT);
        });

        client.delete_message(CHANNEL_ID, MESSAGE_ID).await?;

        mock.assert();

        Ok(())
    }
}

mod reactions {
    use httpmock::{Method::DELETE, Method::PUT, MockServer};
    use reqwest::StatusCode;

    use super::{CHANNEL_ID, MESSAGE_ID, client};

    #[tokio::test]
    async fn create_reaction_should_encode_emoji() -> anyhow::Result<()> {
        let server = MockServer::start();
        let client = client(&server.base_url());

        let mock = server.mock(|when, then| {
            when.method(PUT).path(format!(
                "/channels/{CHANNEL_ID}/messages/{MESSAGE_ID}/reactions/%F0%9F%91%8D/@me"
            ));
            then.status(StatusCode::NO_CONTENT);
        });

        client
            .create_reaction(CHANNEL_ID, MESSAGE_ID, "\u{1f44d}")
            .await?;

        mock.assert();

        Ok(())
    }

    #[tokio::test]
    async fn delete_reaction_should_target_given_user() -> anyhow::Result<()> {
        let server = MockServer::start();
        let client = client(&server.base_url());

        let mock = server.mock(|when, then| {
            when.method(DELETE).path(format!(
                "/channels/{CHANNEL_ID}/messages/{MESSAGE_ID}/reactions/blob%3A123456/42"
            ));
            then.status(StatusCode::NO_CONTENT);
        });

        client
            .delete_reaction(CHANNEL_ID, MESSAGE_ID, "blob:123456", Some(super::Id(42)))
            .await?;

        mock.assert();

        Ok(())
    }

    #[tokio::test]
    async fn delete_reaction_defaults_to_current_user() -> anyhow::Result<()> {
        let server = MockServer::start();
        let client = client(&server.base_url());

        let mock = server.mock(|when, then| {
            when.method(DELETE).path(format!(
                "/channels/{CHANNEL_ID}/messages/{MESSAGE_ID}/reactions/%F0%9F%91%8D/@me"
            ));
            then.status(StatusCode::NO_CONTENT);
        });

        client
            .delete_reaction(CHANNEL_ID, MESSAGE_ID, "\u{1f44d}", None)
            .await?;

        mock.assert();

        Ok(())
    }
}

mod channels {
    use discord_client_sdk::model::ChannelType;
    use discord_client_sdk::rest::types::request::{CreateChannel, ModifyChannel};
    use httpmock::{Method::DELETE, Method::PATCH, Method::POST, MockServer};
    use reqwest::StatusCode;
    use serde_json::json;

    use super::{CHANNEL_ID, GUILD_ID, client};

    #[tokio::test]
    async fn create_guild_channel_should_succeed() -> anyhow::Result<()> {
        let server = MockServer::start();
        let client = client(&server.base_url());

        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(format!("/guilds/{GUILD_ID}/channels"))
                .json_body(json!({ "name": "general", "type": 0 }));
            then.status(StatusCode::OK).json_body(json!({
                "id": CHANNEL_ID.to_string(),
                "type": 0,
                "guild_id": GUILD_ID.to_string(),
                "name": "general"
            }));
        });

        let options = CreateChannel::builder()
            .name("general")
            .kind(ChannelType::GuildText)
            .build();
        let channel = client.create_guild_channel(GUILD_ID, &options).await?;

        assert_eq!(channel.id, CHANNEL_ID);
        assert_eq!(channel.kind, ChannelType::GuildText);
        assert_eq!(channel.name.as_deref(), Some("general"));
        mock.assert();

        Ok(())
    }

    #[tokio::test]
    async fn modify_channel_should_omit_unset_fields() -> anyhow::Result<()> {
        let server = MockServer::start();
        let client = client(&server.base_url());

        let mock = server.mock(|when, then| {
            when.method(PATCH)
                .path(format!("/channels/{CHANNEL_ID}"))
                .json_body(json!({ "topic": "rules and announcements" }));
            then.status(StatusCode::OK).json_body(json!({
                "id": CHANNEL_ID.to_string(),
                "type": 0,
                "topic": "rules and announcements"
            }));
        });

        let options = ModifyChannel::builder()
            .topic("rules and announcements".to_owned())
            .build();
        let channel = client.modify_channel(CHANNEL_ID, &options).await?;

        assert_eq!(channel.topic.as_deref(), Some("rules and announcements"));
        mock.assert();

        Ok(())
    }

    #[tokio::test]
    async fn delete_channel_should_succeed() -> anyhow::Result<()> {
        let server = MockServer::start();
        let client = client(&server.base_url());

        let mock = server.mock(|when, then| {
            when.method(DELETE).path(format!("/channels/{CHANNEL_ID}"));
            then.status(StatusCode::NO_CONTENT);
        });

        client.delete_channel(CHANNEL_ID).await?;

        mock.assert();

        Ok(())
    }

    #[tokio::test]
    async fn trigger_typing_should_succeed() -> anyhow::Result<()> {
        let server = MockServer::start();
        let client = client(&server.base_url());

        let mock = server.mock(|when, then| {
            when.method(POST).path(format!("/channels/{CHANNEL_ID}/typing"));
            then.status(StatusCode::NO_CONTENT);
        });

        client.trigger_typing(CHANNEL_ID).await?;

        mock.assert();

        Ok(())
    }
}

mod guilds {
    use discord_client_sdk::rest::types::request::{ModifyGuild, ModifyMember};
    use httpmock::{Method::PATCH, MockServer};
    use reqwest::StatusCode;
    use serde_json::json;

    use super::{GUILD_ID, client};

    #[tokio::test]
    async fn modify_guild_always_sends_a_body() -> anyhow::Result<()> {
        let server = MockServer::start();
        let client = client(&server.base_url());

        // Even an empty patch must arrive as a JSON object
        let mock = server.mock(|when, then| {
            when.method(PATCH)
                .path(format!("/guilds/{GUILD_ID}"))
                .json_body(json!({}));
            then.status(StatusCode::OK).json_body(json!({
                "id": GUILD_ID.to_string(),
                "name": "My Guild"
            }));
        });

        let guild = client
            .modify_guild(GUILD_ID, &ModifyGuild::builder().build())
            .await?;

        assert_eq!(guild.name, "My Guild");
        mock.assert();

        Ok(())
    }

    #[tokio::test]
    async fn modify_member_should_succeed() -> anyhow::Result<()> {
        let server = MockServer::start();
        let client = client(&server.base_url());

        let mock = server.mock(|when, then| {
            when.method(PATCH)
                .path(format!("/guilds/{GUILD_ID}/members/42"))
                .json_body(json!({ "nick": "renamed" }));
            then.status(StatusCode::OK).json_body(json!({
                "user": { "id": "42", "username": "someone" },
                "nick": "renamed",
                "roles": []
            }));
        });

        let options = ModifyMember::builder().nick("renamed".to_owned()).build();
        let member = client
            .modify_member(GUILD_ID, super::Id(42), &options)
            .await?;

        assert_eq!(member.nick.as_deref(), Some("renamed"));
        mock.assert();

        Ok(())
    }
}

mod error_handling {
    use discord_client_sdk::error::{Kind, Status};
    use discord_client_sdk::rest::types::request::CreateMessage;
    use httpmock::{Method::GET, Method::POST, MockServer};
    use reqwest::StatusCode;
    use serde_json::json;

    use super::{CHANNEL_ID, client};

    #[tokio::test]
    async fn unauthorized_should_return_status_error() -> anyhow::Result<()> {
        let server = MockServer::start();
        let client = client(&server.base_url());

        let mock = server.mock(|when, then| {
            when.method(GET).path("/gateway/bot");
            then.status(StatusCode::UNAUTHORIZED).json_body(json!({
                "message": "401: Unauthorized",
                "code": 0
            }));
        });

        let err = client.gateway_bot().await.unwrap_err();

        assert_eq!(err.kind(), Kind::Status);
        let status = err.downcast_ref::<Status>().expect("status details missing");
        assert_eq!(status.status_code, StatusCode::UNAUTHORIZED);
        assert_eq!(status.path, "/gateway/bot");
        mock.assert();

        Ok(())
    }

    #[tokio::test]
    async fn rate_limited_should_return_status_error() -> anyhow::Result<()> {
        let server = MockServer::start();
        let client = client(&server.base_url());

        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(format!("/channels/{CHANNEL_ID}/messages"));
            then.status(StatusCode::TOO_MANY_REQUESTS).json_body(json!({
                "message": "You are being rate limited.",
                "retry_after": 6.457
            }));
        });

        let err = client
            .create_message(CHANNEL_ID, &CreateMessage::text("spam"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), Kind::Status);
        let status = err.downcast_ref::<Status>().expect("status details missing");
        assert_eq!(status.status_code, StatusCode::TOO_MANY_REQUESTS);
        assert!(status.message.contains("rate limited"));
        mock.assert();

        Ok(())
    }

    #[tokio::test]
    async fn mismatched_response_shape_should_fail() -> anyhow::Result<()> {
        let server = MockServer::start();
        let client = client(&server.base_url());

        let mock = server.mock(|when, then| {
            when.method(GET).path("/gateway/bot");
            then.status(StatusCode::OK).json_body(json!({ "url": 17 }));
        });

        client.gateway_bot().await.unwrap_err();

        mock.assert();

        Ok(())
    }
}

mod client_construction {
    use discord_client_sdk::SecretString;
    use discord_client_sdk::rest::Client;

    #[test]
    fn default_host_is_the_public_api() {
        let client =
            Client::new(SecretString::from("t")).expect("client construction failed");
        assert_eq!(client.host().as_str(), "https://discord.com/api/v9");
    }

    #[test]
    fn invalid_host_should_fail() {
        Client::with_host(SecretString::from("t"), "not-a-valid-url").unwrap_err();
    }

    #[test]
    fn control_characters_in_token_should_fail() {
        Client::new(SecretString::from("bad\ntoken")).unwrap_err();
    }
}
