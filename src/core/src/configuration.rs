pub mod config;
pub mod types;

pub use config::{CliArgs, Config};
pub use types::{CookieExpiry, PersistenceConfig, SessionConfig, WebConfig};
