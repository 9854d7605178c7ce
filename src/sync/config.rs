use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::sync::month::{DEFAULT_LABEL_FORMAT, is_valid_label_format};
use crate::sync::paths::default_home;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub api_base_url: String,
    pub accounts_base_url: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.spotify.com/v1".to_string(),
            accounts_base_url: "https://accounts.spotify.com".to_string(),
            request_timeout_secs: 30,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistConfig {
    pub name_format: String,
    pub public: bool,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            name_format: DEFAULT_LABEL_FORMAT.to_string(),
            public: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncConfig {
    pub spotify: SpotifyConfig,
    pub playlists: PlaylistConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialSyncConfig {
    spotify: Option<SpotifyConfig>,
    playlists: Option<PlaylistConfig>,
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_u32(var: &str, fallback: u32) -> u32 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u32>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "no" | "off" => false,
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn validate(cfg: &SyncConfig) -> Result<()> {
    for (name, url) in [
        ("api_base_url", &cfg.spotify.api_base_url),
        ("accounts_base_url", &cfg.spotify.accounts_base_url),
    ] {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(anyhow!("invalid spotify {name}: expected an http(s) url"));
        }
    }
    if cfg.spotify.request_timeout_secs == 0 {
        return Err(anyhow!("invalid request timeout: must be >= 1 second"));
    }
    if !is_valid_label_format(&cfg.playlists.name_format) {
        return Err(anyhow!(
            "invalid playlist name format `{}`: expected a strftime pattern",
            cfg.playlists.name_format
        ));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("MONTHSYNC_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    if let Ok(home) = env::var("MONTHSYNC_HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed).join("monthsync.toml"));
        }
    }

    let home = dirs::home_dir()?;
    Some(default_home(&home).join("monthsync.toml"))
}

fn merge_toml(base: &mut SyncConfig, raw: &str) -> Result<()> {
    let parsed: PartialSyncConfig = toml::from_str(raw)?;
    if let Some(spotify) = parsed.spotify {
        base.spotify = spotify;
    }
    if let Some(playlists) = parsed.playlists {
        base.playlists = playlists;
    }
    Ok(())
}

fn merge_file_config(base: &mut SyncConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    merge_toml(base, &raw)
        .map_err(|err| anyhow!("failed to parse monthsync config {}: {err}", path.display()))
}

pub fn load_config() -> Result<SyncConfig> {
    let mut cfg = SyncConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.spotify.api_base_url = env_or_string("MONTHSYNC_API_BASE_URL", &cfg.spotify.api_base_url);
    cfg.spotify.accounts_base_url = env_or_string(
        "MONTHSYNC_ACCOUNTS_BASE_URL",
        &cfg.spotify.accounts_base_url,
    );
    cfg.spotify.request_timeout_secs = env_or_u64(
        "MONTHSYNC_REQUEST_TIMEOUT_SECS",
        cfg.spotify.request_timeout_secs,
    );
    cfg.spotify.max_retries = env_or_u32("MONTHSYNC_MAX_RETRIES", cfg.spotify.max_retries);
    cfg.playlists.name_format = env_or_string(
        "MONTHSYNC_PLAYLIST_NAME_FORMAT",
        &cfg.playlists.name_format,
    );
    cfg.playlists.public = env_or_bool("MONTHSYNC_PLAYLIST_PUBLIC", cfg.playlists.public);

    validate(&cfg)?;
    Ok(cfg)
}
