//! Mapping between session ids and HTTP cookies.
//!
//! Nothing here looks at a session collection: ids go in and out as plain strings.

use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use log::warn;
use warp::http::header::{COOKIE, SET_COOKIE};
use warp::http::{HeaderMap, HeaderValue};

use crate::configuration::types::CookieExpiry;
use crate::error_handling::types::WebError;

pub const SITE_PATH: &str = "/";

/// An outgoing `Set-Cookie` value. The builders below always set `http_only`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub expires: Option<DateTime<Utc>>,
    pub max_age: Option<i64>,
    pub http_only: bool,
}

impl SessionCookie {
    pub fn is_removal(&self) -> bool {
        matches!(self.max_age, Some(age) if age <= 0)
    }

    pub fn to_header_value(&self) -> Result<HeaderValue, WebError> {
        HeaderValue::from_str(&self.to_string())
            .map_err(|e| WebError::InvalidHeader(format!("cookie {}: {}", self.name, e)))
    }

    /// Appends this cookie as a `Set-Cookie` header.
    pub fn write_to(&self, headers: &mut HeaderMap) -> Result<(), WebError> {
        headers.append(SET_COOKIE, self.to_header_value()?);
        Ok(())
    }
}

impl fmt::Display for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; Path={}", self.name, self.value, self.path)?;
        if let Some(expires) = self.expires {
            write!(f, "; Expires={}", expires.format("%a, %d %b %Y %H:%M:%S GMT"))?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age.max(0))?;
        }
        if self.http_only {
            write!(f, "; HttpOnly")?;
        }
        Ok(())
    }
}

/// Cookie carrying `id` until `expires`.
pub fn build_cookie(name: &str, id: &str, expires: DateTime<Utc>) -> SessionCookie {
    SessionCookie {
        name: name.to_string(),
        value: id.to_string(),
        path: SITE_PATH.to_string(),
        expires: Some(expires),
        max_age: None,
        http_only: true,
    }
}

/// Cookie carrying `id`, its lifetime chosen by `policy`.
///
/// A rolling window that cannot be added to `now` falls back to the session expiry.
pub fn build_cookie_with_policy(
    name: &str,
    id: &str,
    session_expiry: DateTime<Utc>,
    policy: CookieExpiry,
    now: DateTime<Utc>,
) -> SessionCookie {
    match policy {
        CookieExpiry::MatchSession => build_cookie(name, id, session_expiry),
        CookieExpiry::Rolling { days } => {
            let window = Duration::try_days(i64::from(days))
                .and_then(|window| Some((window, now.checked_add_signed(window)?)));
            match window {
                Some((window, expires)) => {
                    let mut cookie = build_cookie(name, id, expires);
                    cookie.max_age = Some(window.num_seconds());
                    cookie
                }
                None => {
                    warn!(
                        "Rolling cookie window of {} days overflows, using session expiry",
                        days
                    );
                    build_cookie(name, id, session_expiry)
                }
            }
        }
    }
}

/// Cookie telling the client to drop `name` right away.
pub fn removal_cookie(name: &str) -> SessionCookie {
    SessionCookie {
        name: name.to_string(),
        value: String::new(),
        path: SITE_PATH.to_string(),
        expires: Utc.timestamp_opt(0, 0).single(),
        max_age: Some(0),
        http_only: true,
    }
}

/// Value of the cookie `name` among the request's `Cookie` headers.
///
/// The first non-empty match wins. Missing headers, values that are not valid UTF-8
/// and empty values all read as absent.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| key.trim() == name && !value.trim().is_empty())
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
}

/// Value of the query parameter `name`, percent-decoded.
pub fn read_query(query: &str, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .find(|(key, value)| key == name && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

/// Whether `name` is a cookie-name token (RFC 6265).
pub fn is_valid_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(
                    b,
                    b'!' | b'#'
                        | b'$'
                        | b'%'
                        | b'&'
                        | b'\''
                        | b'*'
                        | b'+'
                        | b'-'
                        | b'.'
                        | b'^'
                        | b'_'
                        | b'`'
                        | b'|'
                        | b'~'
                )
        })
}
