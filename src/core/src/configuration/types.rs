use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_COOKIE_NAME: &str = "sid";
pub const DEFAULT_ID_LENGTH_BYTES: usize = 30;
pub const MAX_ID_LENGTH_BYTES: usize = 512;
/// Upper bound of a rolling cookie window, the cap browsers apply to cookie lifetimes.
pub const MAX_COOKIE_DAYS: u32 = 400;

/// How long the outgoing session cookie lives on the client.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CookieExpiry {
    /// The cookie expires together with the session it carries.
    MatchSession,
    /// The cookie is refreshed on every response for a fixed number of days.
    Rolling { days: u32 },
}

impl Default for CookieExpiry {
    fn default() -> Self {
        CookieExpiry::MatchSession
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub id_length_bytes: usize,
    pub lifetime_secs: u64,
    /// `0` disables the periodic cleanup task.
    pub cleanup_interval_secs: u64,
    pub cleanup_on_create: bool,
    pub cookie_expiry: CookieExpiry,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            id_length_bytes: DEFAULT_ID_LENGTH_BYTES,
            lifetime_secs: 3600,
            cleanup_interval_secs: 60,
            cleanup_on_create: false,
            cookie_expiry: CookieExpiry::default(),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: String::from("127.0.0.1"),
            port: 8080,
        }
    }
}
