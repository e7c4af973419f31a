//! Session management core module.
//!
//! This module provides the session record, the manager owning every session of one
//! cookie name, the identifier generator and the periodic cleanup task.

/// Submodule for the background task driving periodic cleanup.
pub mod cleanup_task;
/// Submodule for secure random session identifiers.
pub mod id_generator;
/// Submodule for the session record, its variable bag and its pending message.
pub mod session;
/// Submodule for the session manager implementation.
pub mod session_manager;

#[cfg(test)]
mod tests;

pub use cleanup_task::spawn_cleanup_task;
pub use id_generator::generate_session_id;
pub use session::{Message, Session};
pub use session_manager::SessionManager;
