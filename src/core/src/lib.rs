//! In-process session store for web request handlers.
//!
//! A [`SessionManager`] issues random session ids, keeps a string variable bag and a
//! pending flash message per session, forgets sessions past their expiry and can be
//! snapshotted to a file. The [`web_interface::cookies`] module binds ids to HTTP cookies.

pub mod configuration;
pub mod error_handling;
pub mod session_management;
pub mod storage;
pub mod web_interface;

pub use error_handling::types::{SessionError, StorageError};
pub use session_management::{spawn_cleanup_task, Message, Session, SessionManager};
