use crate::configuration::types::{SessionConfig, DEFAULT_ID_LENGTH_BYTES};
use crate::error_handling::types::SessionError;
use crate::session_management::id_generator::generate_session_id;
use crate::session_management::session::{Message, Session};
use crate::storage::file_storage::SnapshotFile;
use crate::storage::snapshot::{SessionRecord, Snapshot};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The store of every session living under one cookie name.
///
/// The manager hands out `Arc<Session>` handles. Callers mutate the variables of a
/// session through the handle; the collection itself only changes through the manager.
///
/// # Fields Overview
///
/// - `cookie_name`: name under which the session id travels, fixed at construction
/// - `id_length`: number of random bytes drawn per session id
/// - `cleanup_on_create`: run a cleanup pass after every `create`
/// - `sessions`: the collection, keyed by id
/// - `messages`: manager-wide flash queue, drained wholesale
/// - `cleanup_guard`: held for the duration of a cleanup pass
pub struct SessionManager {
    cookie_name: String,
    id_length: usize,
    cleanup_on_create: bool,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    messages: Mutex<VecDeque<Message>>,
    cleanup_guard: Mutex<()>,
}

impl SessionManager {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self::with_sessions(cookie_name.into(), HashMap::new())
    }

    fn with_sessions(cookie_name: String, sessions: HashMap<String, Arc<Session>>) -> Self {
        Self {
            cookie_name,
            id_length: DEFAULT_ID_LENGTH_BYTES,
            cleanup_on_create: false,
            sessions: RwLock::new(sessions),
            messages: Mutex::new(VecDeque::new()),
            cleanup_guard: Mutex::new(()),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.cookie_name.clone())
            .with_id_length(config.id_length_bytes)
            .with_cleanup_on_create(config.cleanup_on_create)
    }

    pub fn with_id_length(mut self, bytes: usize) -> Self {
        self.id_length = bytes;
        self
    }

    pub fn with_cleanup_on_create(mut self, enabled: bool) -> Self {
        self.cleanup_on_create = enabled;
        self
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn id_length(&self) -> usize {
        self.id_length
    }

    fn read_sessions(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Session>>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_sessions(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Session>>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a session expiring at `expiry` and stores it.
    ///
    /// The id is drawn while the collection is write-locked, so concurrent calls can
    /// neither collide nor interleave their inserts.
    pub fn create(&self, expiry: DateTime<Utc>) -> Result<Arc<Session>, SessionError> {
        let session = {
            let mut sessions = self.write_sessions();
            let id =
                generate_session_id(|candidate| sessions.contains_key(candidate), self.id_length)?;
            let session = Arc::new(Session::new(id.clone(), expiry));
            sessions.insert(id, session.clone());
            session
        };
        debug!("Created session {} expiring at {}", session.id(), expiry.to_rfc3339());

        if self.cleanup_on_create {
            self.cleanup();
        }
        Ok(session)
    }

    /// Returns the live session with the given id.
    ///
    /// A session found dead is removed before `NotFound` is returned. The removal happens
    /// under the write lock after checking the entry again, so a reader never sees a
    /// half-updated collection and a concurrent cleanup cannot be raced.
    pub fn get(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        let found = self.read_sessions().get(id).cloned();
        let session = found.ok_or_else(|| {
            debug!("Session lookup missed for id {:?}", id);
            SessionError::NotFound
        })?;

        if session.is_alive_at(Utc::now()) {
            return Ok(session);
        }

        let mut sessions = self.write_sessions();
        let still_dead = sessions
            .get(id)
            .map(|s| !s.is_alive_at(Utc::now()))
            .unwrap_or(false);
        if still_dead {
            sessions.remove(id);
            debug!("Removed expired session {} on lookup", id);
        }
        Err(SessionError::NotFound)
    }

    /// Removes the session with the given id. An absent id is reported as `NotFound`.
    pub fn remove(&self, id: &str) -> Result<(), SessionError> {
        match self.write_sessions().remove(id) {
            Some(_) => {
                debug!("Removed session {}", id);
                Ok(())
            }
            None => Err(SessionError::NotFound),
        }
    }

    pub fn remove_all(&self) {
        let mut sessions = self.write_sessions();
        let count = sessions.len();
        sessions.clear();
        info!("Removed all {} session(s) of '{}'", count, self.cookie_name);
    }

    /// Removes every session whose expiry has passed and returns how many were removed.
    ///
    /// Only one pass runs at a time per manager; a call made while another pass is in
    /// flight returns `0` without touching the collection.
    pub fn cleanup(&self) -> usize {
        let _guard = match self.cleanup_guard.try_lock() {
            Ok(guard) => guard,
            Err(std::sync::TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(std::sync::TryLockError::WouldBlock) => {
                warn!("Cleanup of '{}' already in progress, skipping", self.cookie_name);
                return 0;
            }
        };

        let now = Utc::now();
        let mut sessions = self.write_sessions();
        let before = sessions.len();
        sessions.retain(|_, session| session.is_alive_at(now));
        let removed = before - sessions.len();
        drop(sessions);

        if removed > 0 {
            info!("Cleanup removed {} expired session(s) of '{}'", removed, self.cookie_name);
        } else {
            debug!("Cleanup found no expired session in '{}'", self.cookie_name);
        }
        removed
    }

    /// Number of sessions held, dead ones not yet collected included.
    pub fn len(&self) -> usize {
        self.read_sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_sessions().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read_sessions().contains_key(id)
    }

    /// Ids of every session held, dead ones not yet collected included.
    pub fn ids(&self) -> Vec<String> {
        self.read_sessions().keys().cloned().collect()
    }

    pub fn live_sessions(&self) -> Vec<Arc<Session>> {
        let now = Utc::now();
        self.read_sessions()
            .values()
            .filter(|s| s.is_alive_at(now))
            .cloned()
            .collect()
    }

    pub fn add_message(&self, kind: impl Into<String>, text: impl Into<String>) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Message::new(kind, text));
    }

    /// Returns every queued message in insertion order and empties the queue.
    pub fn drain_messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        let records = self
            .read_sessions()
            .values()
            .map(|s| SessionRecord::from_session(s))
            .collect();
        Snapshot::new(self.cookie_name.clone(), records)
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let sessions = snapshot
            .sessions
            .into_iter()
            .map(|record| (record.id.clone(), Arc::new(record.into_session())))
            .collect();
        Self::with_sessions(snapshot.cookie_name, sessions)
    }

    /// Writes the cookie name and every session to `path`, replacing the file.
    pub fn snapshot_to<P: AsRef<Path>>(&self, path: P) -> Result<(), SessionError> {
        SnapshotFile::new(path).save(&self.snapshot())?;
        Ok(())
    }

    /// Builds a manager from a file written by [`snapshot_to`](Self::snapshot_to).
    ///
    /// Settings that are not part of the snapshot (id length, cleanup on create) start at
    /// their defaults and can be changed with the `with_*` builders.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, SessionError> {
        let file = SnapshotFile::new(path);
        let manager = Self::from_snapshot(file.load()?);
        info!(
            "Loaded {} session(s) of '{}' from {}",
            manager.len(),
            manager.cookie_name,
            file.path().display()
        );
        Ok(manager)
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("cookie_name", &self.cookie_name)
            .field("id_length", &self.id_length)
            .field("sessions", &self.len())
            .finish()
    }
}
