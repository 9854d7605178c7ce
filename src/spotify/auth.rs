use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::env;
use std::time::Duration;
use tracing::debug;

use crate::error::SyncError;
use crate::sync::config::SpotifyConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    AccessToken(String),
    RefreshToken {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

fn first_present(lookup: &impl Fn(&str) -> Option<String>, vars: &[&str]) -> Option<String> {
    vars.iter()
        .filter_map(|var| lookup(*var))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// Resolve credentials through `lookup`, preferring a ready access token.
pub fn credentials_from(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Credentials, SyncError> {
    if let Some(token) = first_present(&lookup, &["SPOTIFY_ACCESS_TOKEN"]) {
        return Ok(Credentials::AccessToken(token));
    }

    let client_id = first_present(&lookup, &["SPOTIFY_CLIENT_ID", "SPOTIPY_CLIENT_ID"]);
    let client_secret = first_present(
        &lookup,
        &["SPOTIFY_CLIENT_SECRET", "SPOTIPY_CLIENT_SECRET"],
    );
    let refresh_token = first_present(&lookup, &["SPOTIFY_REFRESH_TOKEN"]);
    match (client_id, client_secret, refresh_token) {
        (Some(client_id), Some(client_secret), Some(refresh_token)) => {
            Ok(Credentials::RefreshToken {
                client_id,
                client_secret,
                refresh_token,
            })
        }
        _ => Err(SyncError::MissingCredentials(
            "set SPOTIFY_ACCESS_TOKEN, or SPOTIFY_REFRESH_TOKEN with SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET"
                .to_string(),
        )),
    }
}

pub fn credentials_from_env() -> Result<Credentials, SyncError> {
    credentials_from(|var| env::var(var).ok())
}

/// Turn credentials into a bearer token, exchanging a refresh token if needed.
pub fn access_token(cfg: &SpotifyConfig, creds: &Credentials) -> Result<String> {
    let (client_id, client_secret, refresh_token) = match creds {
        Credentials::AccessToken(token) => return Ok(token.clone()),
        Credentials::RefreshToken {
            client_id,
            client_secret,
            refresh_token,
        } => (client_id, client_secret, refresh_token),
    };

    let url = format!("{}/api/token", cfg.accounts_base_url.trim_end_matches('/'));
    let client = Client::builder()
        .timeout(Duration::from_secs(cfg.request_timeout_secs))
        .build()?;
    let response = client
        .post(&url)
        .basic_auth(client_id, Some(client_secret))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ])
        .send()
        .map_err(|err| SyncError::transport("network", format!("token refresh: {err}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(SyncError::transport(status, format!("token refresh: {}", body.trim())).into());
    }
    let token: TokenResponse = response
        .json()
        .context("token response missing access_token")?;
    debug!("refreshed spotify access token");
    Ok(token.access_token)
}
