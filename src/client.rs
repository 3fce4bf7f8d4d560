//! Top-level client tying the REST API and the Gateway together.

use std::sync::Arc;

use secrecy::SecretString;

use crate::gateway::{Config, DispatchRouter, Event, EventKind, GatewayConnection, HandlerId};
use crate::gateway::dispatch::HandlerError;
use crate::{Result, TOKEN_VAR, error::Error, rest};

/// High-level client for the chat platform.
///
/// Owns the bot token, a [`rest::Client`], the gateway [`Config`] and a
/// [`DispatchRouter`] shared with every connection it opens, so event
/// handlers can be registered before connecting.
///
/// # Example
///
/// ```no_run
/// use discord_client_sdk::Client;
/// use discord_client_sdk::gateway::{Event, EventKind};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::new("my-bot-token")?;
///
/// client.on(EventKind::MessageCreate, |event| {
///     if let Event::MessageCreate(message) = event {
///         println!("{}", message.content);
///     }
///     Ok(())
/// });
///
/// let connection = client.connect().await?;
/// # Ok(())
/// # }
/// ```
pub struct Client {
    token: SecretString,
    rest: rest::Client,
    router: Arc<DispatchRouter>,
    config: Config,
}

impl Client {
    /// Create a client for the given bot token.
    pub fn new<S: Into<String>>(token: S) -> Result<Self> {
        let token = SecretString::from(token.into());
        Ok(Self {
            rest: rest::Client::new(token.clone())?,
            token,
            router: Arc::new(DispatchRouter::new()),
            config: Config::default(),
        })
    }

    /// Create a client from the `DISCORD_TOKEN` environment variable.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(TOKEN_VAR)
            .map_err(|_var| Error::validation(format!("{TOKEN_VAR} is not set")))?;
        Self::new(token)
    }

    /// Replace the gateway configuration used by future connections.
    #[must_use]
    pub fn with_gateway_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Access the REST surface.
    #[must_use]
    pub fn rest(&self) -> &rest::Client {
        &self.rest
    }

    /// Register an event handler. Effective for every connection this
    /// client opens, including ones already running.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&Event) -> std::result::Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.router.on(kind, handler)
    }

    /// Unregister an event handler.
    pub fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        self.router.off(kind, id)
    }

    /// Fetch the gateway URL over REST and open a supervised connection.
    pub async fn connect(&self) -> Result<GatewayConnection> {
        let gateway = self.rest.gateway_bot().await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(url = %gateway.url, shards = gateway.shards, "opening gateway connection");

        GatewayConnection::with_router(
            gateway.url,
            self.token.clone(),
            self.config.clone(),
            Arc::clone(&self.router),
        )
    }
}
