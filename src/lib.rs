#![cfg_attr(doc, doc = include_str!("../README.md"))]

#[cfg(all(feature = "rest", feature = "gateway"))]
mod client;
pub mod error;
#[cfg(feature = "gateway")]
pub mod gateway;
pub mod model;
#[cfg(feature = "rest")]
pub mod rest;
#[cfg(any(feature = "rest", feature = "gateway"))]
pub(crate) mod serde_helpers;

#[cfg(all(feature = "rest", feature = "gateway"))]
pub use client::Client;
pub use secrecy::SecretString;

#[cfg(feature = "rest")]
use reqwest::{Request, header::HeaderMap};
#[cfg(feature = "rest")]
use serde::de::DeserializeOwned;

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Base URL of the REST API.
pub const REST_API: &str = "https://discord.com/api/v9";

/// Gateway protocol version requested when opening a connection.
pub const GATEWAY_VERSION: u8 = 9;

pub const TOKEN_VAR: &str = "DISCORD_TOKEN";

#[cfg(feature = "rest")]
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        level = "debug",
        skip(client, request, headers),
        fields(
            method = %request.method(),
            path = request.url().path(),
            status_code
        )
    )
)]
async fn request<Response: DeserializeOwned>(
    client: &reqwest::Client,
    request: Request,
    headers: Option<HeaderMap>,
) -> Result<Response> {
    let (response, method, path) = execute(client, request, headers).await?;
    let json_value = response.json::<serde_json::Value>().await?;

    serde_helpers::deserialize_with_warnings(json_value).inspect_err(|e| {
        #[cfg(feature = "tracing")]
        tracing::warn!(method = %method, path = %path, error = %e, "API response did not match expected shape");
        #[cfg(not(feature = "tracing"))]
        {
            let _: &Error = e;
            let _ = (&method, &path);
        }
    })
}

/// Variant of [`request`] for endpoints that reply `204 No Content`.
#[cfg(feature = "rest")]
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        level = "debug",
        skip(client, request, headers),
        fields(
            method = %request.method(),
            path = request.url().path(),
            status_code
        )
    )
)]
async fn request_empty(
    client: &reqwest::Client,
    request: Request,
    headers: Option<HeaderMap>,
) -> Result<()> {
    let _ = execute(client, request, headers).await?;
    Ok(())
}

#[cfg(feature = "rest")]
async fn execute(
    client: &reqwest::Client,
    mut request: Request,
    headers: Option<HeaderMap>,
) -> Result<(reqwest::Response, reqwest::Method, String)> {
    let method = request.method().clone();
    let path = request.url().path().to_owned();

    if let Some(h) = headers {
        request.headers_mut().extend(h);
    }

    let response = client.execute(request).await?;
    let status_code = response.status();

    #[cfg(feature = "tracing")]
    tracing::Span::current().record("status_code", status_code.as_u16());

    if !status_code.is_success() {
        let message = response.text().await.unwrap_or_default();

        #[cfg(feature = "tracing")]
        tracing::warn!(
            status = %status_code,
            method = %method,
            path = %path,
            message = %message,
            "API request failed"
        );

        return Err(Error::status(status_code, method, path, message));
    }

    Ok((response, method, path))
}
