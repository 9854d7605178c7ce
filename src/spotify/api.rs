use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::sync::client::{LibraryClient, LikedItem, Page};
use crate::sync::config::SpotifyConfig;

const LIKED_PAGE_LIMIT: &str = "50";
const PLAYLIST_PAGE_LIMIT: &str = "100";
const PLAYLIST_ITEM_FIELDS: &str = "items(track(uri)),next";
/// Spotify rejects more than 100 uris per add call.
pub const MAX_ADD_BATCH: usize = 100;
const MAX_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct Paging<T> {
    items: Vec<T>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackRef {
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SavedTrack {
    added_at: DateTime<Utc>,
    track: Option<TrackRef>,
}

#[derive(Debug, Deserialize)]
struct PlaylistTrack {
    track: Option<TrackRef>,
}

#[derive(Debug, Deserialize)]
struct UserProfile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CreatedPlaylist {
    id: String,
}

fn track_uri(track: Option<TrackRef>) -> Option<String> {
    track.and_then(|t| t.uri).filter(|uri| !uri.is_empty())
}

fn decode_liked_page(raw: Paging<SavedTrack>) -> Page<LikedItem> {
    Page {
        items: raw
            .items
            .into_iter()
            .filter_map(|saved| {
                track_uri(saved.track).map(|uri| LikedItem {
                    uri,
                    liked_at: saved.added_at,
                })
            })
            .collect(),
        next: raw.next,
    }
}

fn decode_playlist_page(raw: Paging<PlaylistTrack>) -> Page<String> {
    Page {
        items: raw
            .items
            .into_iter()
            .filter_map(|item| track_uri(item.track))
            .collect(),
        next: raw.next,
    }
}

/// How a request may be resent after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resend {
    /// Reads. Any transient failure is retried.
    Always,
    /// Creates and adds. Retried only when the server cannot have applied the
    /// request: a 429, or a connection that was never established.
    Unapplied,
}

/// Delay before retrying a failed response, or `None` when it should not be retried.
fn retry_delay(
    status: StatusCode,
    retry_after: Option<&str>,
    attempt: u32,
    resend: Resend,
) -> Option<Duration> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let secs = retry_after
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map(|secs| secs.min(MAX_RETRY_AFTER_SECS));
        return Some(secs.map_or_else(|| backoff(attempt), Duration::from_secs));
    }
    (resend == Resend::Always && status.is_server_error()).then(|| backoff(attempt))
}

fn retryable_transport(err: &reqwest::Error, resend: Resend) -> bool {
    match resend {
        Resend::Always => err.is_connect() || err.is_timeout(),
        Resend::Unapplied => err.is_connect(),
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(250 * u64::from(attempt))
}

/// Spotify Web API implementation of [`LibraryClient`].
pub struct SpotifyClient {
    http: Client,
    api_base: Url,
    token: String,
    max_retries: u32,
    public_playlists: bool,
}

impl SpotifyClient {
    pub fn new(cfg: &SpotifyConfig, token: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;
        let api_base = Url::parse(cfg.api_base_url.trim_end_matches('/'))
            .with_context(|| format!("invalid spotify api url {}", cfg.api_base_url))?;
        Ok(Self {
            http,
            api_base,
            token,
            max_retries: cfg.max_retries,
            public_playlists: true,
        })
    }

    pub fn with_public_playlists(mut self, public: bool) -> Self {
        self.public_playlists = public;
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("spotify api url cannot be a base: {}", self.api_base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn send(
        &self,
        what: &str,
        resend: Resend,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<Response> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let exhausted = attempt > self.max_retries;
            match build().bearer_auth(&self.token).send() {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let retry_after = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned);
                    match retry_delay(status, retry_after.as_deref(), attempt, resend) {
                        Some(delay) if !exhausted => {
                            warn!(
                                %status,
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                "{what} failed; retrying"
                            );
                            thread::sleep(delay);
                        }
                        _ => {
                            let body = response.text().unwrap_or_default();
                            return Err(SyncError::transport(
                                status,
                                format!("{what}: {}", body.trim()),
                            )
                            .into());
                        }
                    }
                }
                Err(err) if !exhausted && retryable_transport(&err, resend) => {
                    let delay = backoff(attempt);
                    warn!(attempt, error = %err, "{what} failed; retrying");
                    thread::sleep(delay);
                }
                Err(err) => {
                    return Err(SyncError::transport("network", format!("{what}: {err}")).into());
                }
            }
        }
    }

    fn fetch_json<T: DeserializeOwned>(
        &self,
        what: &str,
        resend: Resend,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<T> {
        let response = self.send(what, resend, build)?;
        response
            .json()
            .with_context(|| format!("{what}: unexpected response body"))
    }
}

impl LibraryClient for SpotifyClient {
    fn list_liked_items(&self, cursor: Option<&str>) -> Result<Page<LikedItem>> {
        let raw: Paging<SavedTrack> = match cursor {
            Some(next) => {
                self.fetch_json("fetch liked songs", Resend::Always, || self.http.get(next))?
            }
            None => {
                let url = self.endpoint(&["me", "tracks"])?;
                self.fetch_json("fetch liked songs", Resend::Always, || {
                    self.http
                        .get(url.clone())
                        .query(&[("limit", LIKED_PAGE_LIMIT)])
                })?
            }
        };
        let page = decode_liked_page(raw);
        debug!(items = page.items.len(), more = page.next.is_some(), "liked songs page");
        Ok(page)
    }

    fn current_user_id(&self) -> Result<String> {
        let url = self.endpoint(&["me"])?;
        let profile: UserProfile = self.fetch_json("fetch current user", Resend::Always, || {
            self.http.get(url.clone())
        })?;
        Ok(profile.id)
    }

    fn create_collection(&self, owner: &str, name: &str) -> Result<String> {
        let url = self.endpoint(&["users", owner, "playlists"])?;
        let body = serde_json::json!({ "name": name, "public": self.public_playlists });
        let created: CreatedPlaylist =
            self.fetch_json("create playlist", Resend::Unapplied, || {
                self.http.post(url.clone()).json(&body)
            })?;
        Ok(created.id)
    }

    fn add_items(&self, collection_id: &str, uris: &[String]) -> Result<()> {
        let url = self.endpoint(&["playlists", collection_id, "tracks"])?;
        for chunk in uris.chunks(MAX_ADD_BATCH) {
            let body = serde_json::json!({ "uris": chunk });
            self.send("add playlist items", Resend::Unapplied, || {
                self.http.post(url.clone()).json(&body)
            })?;
            debug!(playlist = collection_id, count = chunk.len(), "added playlist items");
        }
        Ok(())
    }

    fn list_collection_items(
        &self,
        collection_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<String>> {
        let raw: Paging<PlaylistTrack> = match cursor {
            Some(next) => {
                self.fetch_json("fetch playlist items", Resend::Always, || self.http.get(next))?
            }
            None => {
                let url = self.endpoint(&["playlists", collection_id, "tracks"])?;
                self.fetch_json("fetch playlist items", Resend::Always, || {
                    self.http.get(url.clone()).query(&[
                        ("limit", PLAYLIST_PAGE_LIMIT),
                        ("fields", PLAYLIST_ITEM_FIELDS),
                    ])
                })?
            }
        };
        Ok(decode_playlist_page(raw))
    }
}
