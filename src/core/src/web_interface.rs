// Web Interface module root
pub mod cookies;
pub mod routes;
pub mod web_server;

// Re-export commonly used items
pub use cookies::*;
pub use routes::{
    lookup_session, lookup_session_from_query, resolve_session, with_session, ResolvedSession,
    WebState,
};
pub use web_server::*;
