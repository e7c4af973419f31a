use clap::Parser;
use log::{error, info, warn};
use sessionstore::configuration::{CliArgs, Config};
use sessionstore::storage::SnapshotFile;
use sessionstore::web_interface::WebServer;
use sessionstore::{spawn_cleanup_task, SessionManager};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

fn load_manager(config: &Config) -> SessionManager {
    let session = &config.session;
    let snapshot = match &config.persistence.snapshot_path {
        Some(path) if SnapshotFile::new(path).exists() => path,
        _ => return SessionManager::from_config(session),
    };

    match SessionManager::load_from(snapshot) {
        Ok(manager) if manager.cookie_name() == session.cookie_name => manager
            .with_id_length(session.id_length_bytes)
            .with_cleanup_on_create(session.cleanup_on_create),
        Ok(manager) => {
            error!(
                "Snapshot {} holds sessions of '{}', not '{}'",
                snapshot.display(),
                manager.cookie_name(),
                session.cookie_name
            );
            std::process::exit(1);
        }
        Err(e) => {
            error!("Unable to load snapshot {}: {}", snapshot.display(), e);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    let args = CliArgs::parse();

    let config = Config::load(&args).unwrap_or_else(|e| {
        error!("Unable to import configuration: {}", e);
        std::process::exit(1);
    });
    info!("Configuration imported successfully");

    let ip: IpAddr = config.web.bind_address.parse().unwrap_or_else(|e| {
        error!("Invalid bind address {}: {}", config.web.bind_address, e);
        std::process::exit(1);
    });
    let addr = SocketAddr::new(ip, config.web.port);

    let manager = Arc::new(load_manager(&config));
    info!(
        "Session store '{}' ready with {} session(s)",
        manager.cookie_name(),
        manager.len()
    );

    let cleanup = match config.session.cleanup_interval_secs {
        0 => None,
        secs => Some(spawn_cleanup_task(
            manager.clone(),
            Duration::from_secs(secs),
        )),
    };

    let server = WebServer::new(manager.clone(), &config.session);
    let mut server_failed = false;
    tokio::select! {
        result = server.start(addr) => {
            if let Err(e) = result {
                error!("Web server stopped: {}", e);
                server_failed = true;
            }
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("Unable to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
        }
    }

    if let Some(handle) = cleanup {
        handle.abort();
    }

    if let Some(path) = &config.persistence.snapshot_path {
        manager.cleanup();
        if let Err(e) = manager.snapshot_to(path) {
            error!("Unable to write snapshot {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }

    if server_failed {
        std::process::exit(1);
    }
}
