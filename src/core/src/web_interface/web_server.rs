use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info};
use tokio::net::TcpListener;
use warp::{Filter, Reply};

use super::routes::{
    flash_route, handle_rejection, index_route, logout_route, sessions_route, WebState,
};
use crate::configuration::types::SessionConfig;
use crate::error_handling::types::WebError;
use crate::session_management::session_manager::SessionManager;

/// Small HTTP host exercising a session manager through its cookie
pub struct WebServer {
    state: WebState,
}

impl WebServer {
    pub fn new(manager: Arc<SessionManager>, config: &SessionConfig) -> Self {
        Self {
            state: WebState::new(manager, config),
        }
    }

    pub fn state(&self) -> &WebState {
        &self.state
    }

    /// Every route, with rejections turned into JSON errors.
    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
        index_route(self.state.clone())
            .or(flash_route(self.state.clone()))
            .or(logout_route(self.state.clone()))
            .or(sessions_route(self.state.clone()))
            .recover(handle_rejection)
    }

    /// Binds `addr` and serves until the future is dropped.
    ///
    /// Fails with `WebError::Bind` when the address cannot be taken.
    pub async fn start(&self, addr: SocketAddr) -> Result<(), WebError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            error!("Unable to bind web server to {}: {}", addr, e);
            WebError::Bind(addr, e)
        })?;
        info!(
            "Serving sessions of '{}' on http://{}",
            self.state.manager.cookie_name(),
            addr
        );
        warp::serve(self.routes()).incoming(listener).run().await;
        Ok(())
    }
}
