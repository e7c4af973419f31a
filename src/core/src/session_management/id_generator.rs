use crate::error_handling::types::SessionError;
use log::{error, warn};
use rand::rngs::OsRng;
use rand::RngCore;

/// Generates a session id of `length` random bytes from the operating system, encoded as
/// lowercase hex (so `2 * length` characters).
///
/// Candidates for which `is_taken` returns `true` are discarded and drawn again. A
/// failing random source is reported as `GenerationFailed` and never retried.
pub fn generate_session_id<F>(is_taken: F, length: usize) -> Result<String, SessionError>
where
    F: Fn(&str) -> bool,
{
    if length == 0 {
        return Err(SessionError::GenerationFailed(
            "id length must be greater than 0".into(),
        ));
    }

    let mut buf = vec![0u8; length];
    loop {
        OsRng.try_fill_bytes(&mut buf).map_err(|e| {
            error!("Secure random source unavailable: {}", e);
            SessionError::GenerationFailed(e.to_string())
        })?;
        let id = hex::encode(&buf);
        if !is_taken(&id) {
            return Ok(id);
        }
        warn!("Session id collision, drawing a new one");
    }
}
