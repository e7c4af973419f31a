//! Versioned snapshot of a whole session manager.
//!
//! The encoding is a single JSON document:
//!
//! ```json
//! {
//!   "version": 1,
//!   "cookie_name": "sid",
//!   "sessions": [
//!     {
//!       "id": "9f2c...",
//!       "expiry": "2026-10-16T12:00:00.123456789Z",
//!       "vars": { "user": "alice" },
//!       "message": { "kind": "info", "text": "saved" }
//!     }
//!   ]
//! }
//! ```
//!
//! `message` may be `null` or absent. Every other field is required. A document with a
//! different `version` is rejected before its body is looked at.

use crate::error_handling::types::StorageError;
use crate::session_management::session::{Message, Session};
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub expiry: DateTime<Utc>,
    pub vars: HashMap<String, String>,
    pub message: Option<Message>,
}

impl SessionRecord {
    pub fn from_session(session: &Session) -> Self {
        Self {
            id: session.id().to_string(),
            expiry: session.expiry(),
            vars: session.vars(),
            message: session.peek_message(),
        }
    }

    pub fn into_session(self) -> Session {
        Session::restore(self.id, self.expiry, self.vars, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub cookie_name: String,
    pub sessions: Vec<SessionRecord>,
}

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

impl Snapshot {
    pub fn new(cookie_name: impl Into<String>, sessions: Vec<SessionRecord>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            cookie_name: cookie_name.into(),
            sessions,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, StorageError> {
        serde_json::to_vec_pretty(self).map_err(|e| StorageError::WriteFailed(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Snapshot, StorageError> {
        let header: VersionHeader = serde_json::from_slice(bytes)
            .map_err(|e| StorageError::Malformed(format!("no snapshot version: {}", e)))?;
        if header.version != SNAPSHOT_VERSION {
            warn!(
                "Snapshot version {} is not supported (expected {})",
                header.version, SNAPSHOT_VERSION
            );
            return Err(StorageError::UnsupportedVersion(header.version));
        }

        let snapshot: Snapshot =
            serde_json::from_slice(bytes).map_err(|e| StorageError::Malformed(e.to_string()))?;

        let mut seen = HashSet::with_capacity(snapshot.sessions.len());
        for record in &snapshot.sessions {
            if !seen.insert(record.id.as_str()) {
                return Err(StorageError::Malformed(format!(
                    "duplicate session id {}",
                    record.id
                )));
            }
        }
        Ok(snapshot)
    }
}
