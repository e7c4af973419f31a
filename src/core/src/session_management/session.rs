use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};

/// A one-shot flash notice, e.g. `("info", "saved")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub kind: String,
    pub text: String,
}

impl Message {
    pub fn new(kind: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            text: text.into(),
        }
    }
}

/// One user session held by a [`SessionManager`](super::session_manager::SessionManager).
///
/// The id and the expiry never change after creation. The variable bag and the pending
/// message sit behind their own locks, so callers sharing an `Arc<Session>` can read and
/// write them concurrently without contending with unrelated sessions.
#[derive(Debug)]
pub struct Session {
    id: String,
    expiry: DateTime<Utc>,
    vars: RwLock<HashMap<String, String>>,
    message: Mutex<Option<Message>>,
}

impl Session {
    pub(crate) fn new(id: String, expiry: DateTime<Utc>) -> Self {
        Self::restore(id, expiry, HashMap::new(), None)
    }

    pub(crate) fn restore(
        id: String,
        expiry: DateTime<Utc>,
        vars: HashMap<String, String>,
        message: Option<Message>,
    ) -> Self {
        Self {
            id,
            expiry,
            vars: RwLock::new(vars),
            message: Mutex::new(message),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    /// A session is alive while its expiry lies strictly in the future.
    pub fn is_alive_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry > now
    }

    pub fn is_expired(&self) -> bool {
        !self.is_alive_at(Utc::now())
    }

    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn set_var(&self, key: impl Into<String>, value: impl Into<String>) {
        self.vars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    /// Copy of the whole variable bag.
    pub fn vars(&self) -> HashMap<String, String> {
        self.vars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the pending message, if any.
    pub fn set_message(&self, kind: impl Into<String>, text: impl Into<String>) {
        *self.message.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(Message::new(kind, text));
    }

    /// Takes the pending message. A second call returns `None` until a new one is set.
    pub fn get_message(&self) -> Option<Message> {
        self.message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub(crate) fn peek_message(&self) -> Option<Message> {
        self.message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
