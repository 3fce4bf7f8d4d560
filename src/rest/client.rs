//! HTTP client for the REST API.
//!
//! # Example
//!
//! ```no_run
//! use discord_client_sdk::SecretString;
//! use discord_client_sdk::model::Id;
//! use discord_client_sdk::rest::{Client, types::request::CreateMessage};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new(SecretString::from("my-bot-token"))?;
//!
//! let message = client
//!     .create_message(Id(290_926_798_999_357_250), &CreateMessage::text("hello"))
//!     .await?;
//! println!("sent {}", message.id);
//! # Ok(())
//! # }
//! ```

use reqwest::{
    Client as ReqwestClient, Method,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use secrecy::{ExposeSecret as _, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::types::request::{
    CreateChannel, CreateMessage, ModifyChannel, ModifyGuild, ModifyMember, ModifyMessage,
};
use super::types::response::GatewayBot;
use crate::model::{Channel, Guild, GuildMember, Id, Message};
use crate::{REST_API, Result};

/// HTTP client for the REST API.
///
/// Authenticates every request with `Authorization: Bot <token>`. Cheap to
/// clone; clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct Client {
    host: Url,
    client: ReqwestClient,
}

impl Client {
    /// Creates a client against the default API endpoint.
    pub fn new(token: SecretString) -> Result<Client> {
        Self::with_host(token, REST_API)
    }

    /// Creates a client with a custom host URL.
    pub fn with_host(token: SecretString, host: &str) -> Result<Client> {
        let mut auth = HeaderValue::from_str(&format!("Bot {}", token.expose_secret()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert("Accept", HeaderValue::from_static("*/*"));
        headers.insert("Connection", HeaderValue::from_static("keep-alive"));
        let client = ReqwestClient::builder().default_headers(headers).build()?;

        Ok(Self {
            host: Url::parse(host)?,
            client,
        })
    }

    /// Returns the base URL of the API.
    #[must_use]
    pub fn host(&self) -> &Url {
        &self.host
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.host.as_str().trim_end_matches('/'))
    }

    async fn get<Res: DeserializeOwned>(&self, path: &str) -> Result<Res> {
        let request = self
            .client
            .request(Method::GET, self.endpoint(path))
            .build()?;
        crate::request(&self.client, request, None).await
    }

    async fn send<Req: Serialize, Res: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &Req,
    ) -> Result<Res> {
        let request = self
            .client
            .request(method, self.endpoint(path))
            .json(body)
            .build()?;
        crate::request(&self.client, request, None).await
    }

    async fn send_empty(&self, method: Method, path: &str) -> Result<()> {
        let request = self.client.request(method, self.endpoint(path)).build()?;
        crate::request_empty(&self.client, request, None).await
    }

    /// Fetch the Gateway URL and suggested shard count for this token.
    pub async fn gateway_bot(&self) -> Result<GatewayBot> {
        self.get("/gateway/bot").await
    }

    /// Create a channel in a guild.
    pub async fn create_guild_channel(
        &self,
        guild_id: Id,
        options: &CreateChannel,
    ) -> Result<Channel> {
        self.send(Method::POST, &format!("/guilds/{guild_id}/channels"), options)
            .await
    }

    /// Modify a channel's settings.
    pub async fn modify_channel(&self, channel_id: Id, options: &ModifyChannel) -> Result<Channel> {
        self.send(Method::PATCH, &format!("/channels/{channel_id}"), options)
            .await
    }

    /// Delete a channel, or close it if it is a direct message.
    pub async fn delete_channel(&self, channel_id: Id) -> Result<()> {
        self.send_empty(Method::DELETE, &format!("/channels/{channel_id}"))
            .await
    }

    /// Send a message to a channel.
    pub async fn create_message(&self, channel_id: Id, message: &CreateMessage) -> Result<Message> {
        self.send(
            Method::POST,
            &format!("/channels/{channel_id}/messages"),
            message,
        )
        .await
    }

    /// Edit a previously sent message.
    pub async fn modify_message(
        &self,
        channel_id: Id,
        message_id: Id,
        edit: &ModifyMessage,
    ) -> Result<Message> {
        self.send(
            Method::PATCH,
            &format!("/channels/{channel_id}/messages/{message_id}"),
            edit,
        )
        .await
    }

    /// Delete a message.
    pub async fn delete_message(&self, channel_id: Id, message_id: Id) -> Result<()> {
        self.send_empty(
            Method::DELETE,
            &format!("/channels/{channel_id}/messages/{message_id}"),
        )
        .await
    }

    /// React to a message as the current user.
    ///
    /// `emoji` is either a unicode emoji or a custom emoji in
    /// `name:id` form.
    pub async fn create_reaction(&self, channel_id: Id, message_id: Id, emoji: &str) -> Result<()> {
        self.send_empty(
            Method::PUT,
            &format!(
                "/channels/{channel_id}/messages/{message_id}/reactions/{}/@me",
                encode_emoji(emoji)
            ),
        )
        .await
    }

    /// Remove a reaction; the current user's own when `user_id` is `None`.
    pub async fn delete_reaction(
        &self,
        channel_id: Id,
        message_id: Id,
        emoji: &str,
        user_id: Option<Id>,
    ) -> Result<()> {
        let target = user_id.map_or_else(|| "@me".to_owned(), |id| id.to_string());
        self.send_empty(
            Method::DELETE,
            &format!(
                "/channels/{channel_id}/messages/{message_id}/reactions/{}/{target}",
                encode_emoji(emoji)
            ),
        )
        .await
    }

    /// Remove every reaction from a message.
    pub async fn delete_all_reactions(&self, channel_id: Id, message_id: Id) -> Result<()> {
        self.send_empty(
            Method::DELETE,
            &format!("/channels/{channel_id}/messages/{message_id}/reactions"),
        )
        .await
    }

    /// Remove every reaction using one specific emoji.
    pub async fn delete_emoji_reactions(
        &self,
        channel_id: Id,
        message_id: Id,
        emoji: &str,
    ) -> Result<()> {
        self.send_empty(
            Method::DELETE,
            &format!(
                "/channels/{channel_id}/messages/{message_id}/reactions/{}",
                encode_emoji(emoji)
            ),
        )
        .await
    }

    /// Show the typing indicator in a channel for a few seconds.
    pub async fn trigger_typing(&self, channel_id: Id) -> Result<()> {
        self.send_empty(Method::POST, &format!("/channels/{channel_id}/typing"))
            .await
    }

    /// Pin a message in its channel.
    pub async fn pin_message(&self, channel_id: Id, message_id: Id) -> Result<()> {
        self.send_empty(
            Method::PUT,
            &format!("/channels/{channel_id}/pins/{message_id}"),
        )
        .await
    }

    /// Unpin a message.
    pub async fn unpin_message(&self, channel_id: Id, message_id: Id) -> Result<()> {
        self.send_empty(
            Method::DELETE,
            &format!("/channels/{channel_id}/pins/{message_id}"),
        )
        .await
    }

    /// Modify a guild's settings.
    pub async fn modify_guild(&self, guild_id: Id, options: &ModifyGuild) -> Result<Guild> {
        self.send(Method::PATCH, &format!("/guilds/{guild_id}"), options)
            .await
    }

    /// Delete a guild. The token must belong to the guild owner.
    pub async fn delete_guild(&self, guild_id: Id) -> Result<()> {
        self.send_empty(Method::DELETE, &format!("/guilds/{guild_id}"))
            .await
    }

    /// Modify a guild member.
    pub async fn modify_member(
        &self,
        guild_id: Id,
        member_id: Id,
        options: &ModifyMember,
    ) -> Result<GuildMember> {
        self.send(
            Method::PATCH,
            &format!("/guilds/{guild_id}/members/{member_id}"),
            options,
        )
        .await
    }
}

/// Percent-encode an emoji for use as a path segment.
fn encode_emoji(emoji: &str) -> String {
    url::form_urlencoded::byte_serialize(emoji.as_bytes()).collect()
}
