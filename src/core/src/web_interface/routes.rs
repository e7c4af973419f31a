use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use chrono::{Duration, Utc};
use log::{debug, error};
use serde::Serialize;
use warp::http::{HeaderMap, StatusCode};
use warp::{reply, Filter, Rejection, Reply};

use super::cookies::{
    build_cookie_with_policy, read_cookie, read_query, removal_cookie, SessionCookie,
};
use crate::configuration::types::{CookieExpiry, SessionConfig};
use crate::error_handling::types::{SessionError, WebError};
use crate::session_management::{Session, SessionManager};

/// API error payload
#[derive(Serialize)]
pub struct ApiError {
    pub message: String,
}

#[derive(Serialize)]
pub struct SessionsResponse {
    pub cookie_name: String,
    pub held: usize,
    pub live: usize,
}

const MAX_LIFETIME_SECS: i64 = 100 * 365 * 24 * 3600;

/// What the routes share: the manager plus the lifetime and cookie policy of new sessions.
#[derive(Clone)]
pub struct WebState {
    pub manager: Arc<SessionManager>,
    pub lifetime: Duration,
    pub cookie_expiry: CookieExpiry,
}

impl WebState {
    pub fn new(manager: Arc<SessionManager>, config: &SessionConfig) -> Self {
        let secs = i64::try_from(config.lifetime_secs)
            .unwrap_or(i64::MAX)
            .min(MAX_LIFETIME_SECS);
        Self {
            manager,
            lifetime: Duration::seconds(secs),
            cookie_expiry: config.cookie_expiry,
        }
    }

    /// Cookie to send back for `resolved`, if the client needs a fresh one.
    pub fn outgoing_cookie(&self, resolved: &ResolvedSession) -> Option<SessionCookie> {
        let refresh = matches!(self.cookie_expiry, CookieExpiry::Rolling { .. });
        (resolved.is_new || refresh).then(|| {
            build_cookie_with_policy(
                self.manager.cookie_name(),
                resolved.session.id(),
                resolved.session.expiry(),
                self.cookie_expiry,
                Utc::now(),
            )
        })
    }
}

/// A session found through the request cookie, or created because none was usable.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub session: Arc<Session>,
    pub is_new: bool,
}

/// Session named by the request's cookie. A missing cookie reads as `NotFound`.
pub fn lookup_session(
    manager: &SessionManager,
    headers: &HeaderMap,
) -> Result<Arc<Session>, SessionError> {
    let id = read_cookie(headers, manager.cookie_name()).ok_or(SessionError::NotFound)?;
    manager.get(&id)
}

/// Session named by the query parameter carrying the cookie name.
pub fn lookup_session_from_query(
    manager: &SessionManager,
    query: &str,
) -> Result<Arc<Session>, SessionError> {
    let id = read_query(query, manager.cookie_name()).ok_or(SessionError::NotFound)?;
    manager.get(&id)
}

/// Looks the request's session up and creates one expiring after `lifetime` if needed.
pub fn resolve_session(
    manager: &SessionManager,
    headers: &HeaderMap,
    lifetime: Duration,
) -> Result<ResolvedSession, SessionError> {
    match lookup_session(manager, headers) {
        Ok(session) => Ok(ResolvedSession {
            session,
            is_new: false,
        }),
        Err(SessionError::NotFound) => {
            let session = manager.create(Utc::now() + lifetime)?;
            Ok(ResolvedSession {
                session,
                is_new: true,
            })
        }
        Err(e) => Err(e),
    }
}

pub fn with_state(
    state: WebState,
) -> impl Filter<Extract = (WebState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Extracts the request's session, creating it when the cookie is absent or stale.
pub fn with_session(
    state: WebState,
) -> impl Filter<Extract = (ResolvedSession,), Error = Rejection> + Clone {
    warp::header::headers_cloned().and_then(move |headers: HeaderMap| {
        let state = state.clone();
        async move {
            resolve_session(&state.manager, &headers, state.lifetime).map_err(|e| {
                error!("Unable to resolve session: {}", e);
                warp::reject::custom(WebError::from(e))
            })
        }
    })
}

fn respond(body: impl Reply, cookie: Option<SessionCookie>) -> Result<reply::Response, Rejection> {
    let mut response = body.into_response();
    if let Some(cookie) = cookie {
        cookie
            .write_to(response.headers_mut())
            .map_err(warp::reject::custom)?;
    }
    Ok(response)
}

const PAGE_TITLE: &str = "sessionstore";

fn page(body: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        PAGE_TITLE, body
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// GET /
///
/// Counts visits in the session and shows its flash message once.
pub fn index_route(
    state: WebState,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path::end()
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and_then(|resolved: ResolvedSession, state: WebState| async move {
            let session = &resolved.session;
            let visits = session
                .get_var("visits")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0)
                + 1;
            session.set_var("visits", visits.to_string());

            let flash = session
                .get_message()
                .map(|m| {
                    format!(
                        "<p class=\"{}\">{}</p>",
                        escape_html(&m.kind),
                        escape_html(&m.text)
                    )
                })
                .unwrap_or_default();
            let html = page(&format!("{}<p>Visits in this session: {}</p>", flash, visits));
            respond(reply::html(html), state.outgoing_cookie(&resolved))
        })
}

/// POST /flash?kind=..&text=..
pub fn flash_route(
    state: WebState,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path("flash")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and_then(store_flash)
}

async fn store_flash(
    params: HashMap<String, String>,
    resolved: ResolvedSession,
    state: WebState,
) -> Result<reply::Response, Rejection> {
    let kind = params
        .get("kind")
        .cloned()
        .unwrap_or_else(|| "info".to_string());
    let text = match params.get("text") {
        Some(text) if !text.is_empty() => text.clone(),
        _ => {
            let res = reply::with_status(
                reply::json(&ApiError {
                    message: "Missing flash text".to_string(),
                }),
                StatusCode::BAD_REQUEST,
            );
            return respond(res, state.outgoing_cookie(&resolved));
        }
    };
    resolved.session.set_message(kind, text);
    respond(StatusCode::NO_CONTENT, state.outgoing_cookie(&resolved))
}

/// GET /logout
pub fn logout_route(
    state: WebState,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path("logout")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::header::headers_cloned())
        .and(with_state(state))
        .and_then(|headers: HeaderMap, state: WebState| async move {
            match lookup_session(&state.manager, &headers) {
                Ok(session) => match state.manager.remove(session.id()) {
                    Ok(()) => debug!("Logged out session {}", session.id()),
                    // A concurrent logout got there first.
                    Err(SessionError::NotFound) => {
                        debug!("Session {} already gone at logout", session.id())
                    }
                    Err(e) => error!("Unable to remove session {}: {}", session.id(), e),
                },
                Err(SessionError::NotFound) => debug!("Logout without a live session"),
                Err(e) => error!("Unable to look up session at logout: {}", e),
            }
            let cookie = removal_cookie(state.manager.cookie_name());
            respond(reply::html(page("<p>Logged out.</p>")), Some(cookie))
        })
}

/// GET /sessions
pub fn sessions_route(
    state: WebState,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path("sessions")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .map(|state: WebState| {
            reply::json(&SessionsResponse {
                cookie_name: state.manager.cookie_name().to_string(),
                held: state.manager.len(),
                live: state.manager.live_sessions().len(),
            })
        })
}

/// Turns rejections into JSON error bodies.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = err.find::<WebError>() {
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    } else {
        (StatusCode::BAD_REQUEST, "Bad request".to_string())
    };
    Ok(reply::with_status(reply::json(&ApiError { message }), status))
}
