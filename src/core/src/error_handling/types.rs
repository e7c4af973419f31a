use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    EmptyValue(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::EmptyValue(e) => write!(f, "Empty value: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Errors surfaced by the session manager.
///
/// `NotFound` is the expected outcome of looking up an absent or expired id, callers
/// recover from it by creating a new session. The two other variants are hard failures.
#[derive(Debug)]
pub enum SessionError {
    NotFound,
    GenerationFailed(String),
    PersistenceFailed(StorageError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotFound => write!(f, "Session not found"),
            SessionError::GenerationFailed(e) => write!(f, "Session id generation failed: {}", e),
            SessionError::PersistenceFailed(e) => write!(f, "Session persistence failed: {}", e),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::PersistenceFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for SessionError {
    fn from(err: StorageError) -> Self {
        SessionError::PersistenceFailed(err)
    }
}

#[derive(Debug)]
pub enum StorageError {
    ReadFailed(String),
    WriteFailed(String),
    Malformed(String),
    UnsupportedVersion(u32),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ReadFailed(e) => write!(f, "Storage read failed: {}", e),
            StorageError::WriteFailed(e) => write!(f, "Storage write failed: {}", e),
            StorageError::Malformed(e) => write!(f, "Malformed snapshot: {}", e),
            StorageError::UnsupportedVersion(v) => {
                write!(f, "Unsupported snapshot version: {}", v)
            }
        }
    }
}

impl std::error::Error for StorageError {}

#[derive(Debug)]
pub enum WebError {
    InvalidHeader(String),
    Session(SessionError),
    Bind(std::net::SocketAddr, std::io::Error),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::InvalidHeader(e) => write!(f, "Invalid header: {}", e),
            WebError::Session(e) => write!(f, "Session error: {}", e),
            WebError::Bind(addr, e) => write!(f, "Unable to bind {}: {}", addr, e),
        }
    }
}

impl std::error::Error for WebError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WebError::Session(e) => Some(e),
            WebError::Bind(_, e) => Some(e),
            WebError::InvalidHeader(_) => None,
        }
    }
}

impl From<SessionError> for WebError {
    fn from(err: SessionError) -> Self {
        WebError::Session(err)
    }
}

impl warp::reject::Reject for WebError {}
