use crate::configuration::types::{CookieExpiry, SessionConfig};
use crate::error_handling::types::{SessionError, StorageError};
use crate::session_management::{Message, SessionManager};
use chrono::{Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn in_one_hour() -> chrono::DateTime<Utc> {
    Utc::now() + Duration::hours(1)
}

#[test]
fn test_new_manager_is_empty() {
    let mgr = SessionManager::new("sid");
    assert_eq!(mgr.cookie_name(), "sid");
    assert_eq!(mgr.id_length(), 30);
    assert!(mgr.is_empty());
}

#[test]
fn test_from_config() {
    let config = SessionConfig {
        cookie_name: "app".into(),
        id_length_bytes: 8,
        lifetime_secs: 10,
        cleanup_interval_secs: 0,
        cleanup_on_create: true,
        cookie_expiry: CookieExpiry::MatchSession,
    };
    let mgr = SessionManager::from_config(&config);
    assert_eq!(mgr.cookie_name(), "app");
    let session = mgr.create(in_one_hour()).unwrap();
    assert_eq!(session.id().len(), 16);
}

#[test]
fn test_create_then_get() {
    let mgr = SessionManager::new("sid");
    let expiry = in_one_hour();
    let created = mgr.create(expiry).unwrap();
    assert_eq!(created.id().len(), 60);
    assert_eq!(mgr.len(), 1);

    let found = mgr.get(created.id()).unwrap();
    assert_eq!(found.id(), created.id());
    assert_eq!(found.expiry(), expiry);
    assert!(Arc::ptr_eq(&found, &created));
}

#[test]
fn test_create_remove_get() {
    let mgr = SessionManager::new("sid");
    let a = mgr.create(in_one_hour()).unwrap();
    assert!(mgr.get(a.id()).is_ok());

    mgr.remove(a.id()).unwrap();
    assert!(matches!(mgr.get(a.id()), Err(SessionError::NotFound)));
    assert!(matches!(mgr.remove(a.id()), Err(SessionError::NotFound)));
}

#[test]
fn test_expired_session_is_removed_on_lookup() {
    let mgr = SessionManager::new("sid");
    let b = mgr.create(Utc::now() - Duration::seconds(1)).unwrap();
    assert!(mgr.contains(b.id()));

    assert!(matches!(mgr.get(b.id()), Err(SessionError::NotFound)));
    assert!(!mgr.contains(b.id()));
    assert!(matches!(mgr.get(b.id()), Err(SessionError::NotFound)));
}

#[test]
fn test_get_unknown_and_empty_ids() {
    let mgr = SessionManager::new("sid");
    mgr.create(in_one_hour()).unwrap();
    assert!(matches!(mgr.get(""), Err(SessionError::NotFound)));
    assert!(matches!(mgr.get("not-an-id"), Err(SessionError::NotFound)));
    assert_eq!(mgr.len(), 1);
}

#[test]
fn test_ids_are_pairwise_distinct() {
    let mgr = SessionManager::new("sid").with_id_length(2);
    let ids: HashSet<String> = (0..500)
        .map(|_| mgr.create(in_one_hour()).unwrap().id().to_string())
        .collect();
    assert_eq!(ids.len(), 500);
    assert_eq!(mgr.len(), 500);
}

#[test]
fn test_concurrent_create() {
    let mgr = Arc::new(SessionManager::new("sid").with_id_length(2));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let mgr = mgr.clone();
            thread::spawn(move || {
                (0..50)
                    .map(|_| mgr.create(in_one_hour()).unwrap().id().to_string())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(ids.insert(id));
        }
    }
    assert_eq!(ids.len(), 400);
    assert_eq!(mgr.len(), 400);
}

#[test]
fn test_concurrent_lookup_and_cleanup() {
    let mgr = Arc::new(SessionManager::new("sid"));
    let live: Vec<String> = (0..50)
        .map(|_| mgr.create(in_one_hour()).unwrap().id().to_string())
        .collect();
    let dead: Vec<String> = (0..50)
        .map(|_| {
            mgr.create(Utc::now() - Duration::seconds(1))
                .unwrap()
                .id()
                .to_string()
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let mgr = mgr.clone();
            let live = live.clone();
            let dead = dead.clone();
            thread::spawn(move || {
                for (l, d) in live.iter().zip(dead.iter()) {
                    assert!(mgr.get(l).is_ok());
                    assert!(mgr.get(d).is_err());
                    mgr.cleanup();
                }
            })
        })
        .collect();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(mgr.len(), 50);
    assert_eq!(mgr.live_sessions().len(), 50);
}

#[test]
fn test_cleanup_removes_only_expired() {
    let mgr = SessionManager::new("sid");
    let alive = mgr.create(in_one_hour()).unwrap();
    mgr.create(Utc::now() - Duration::seconds(5)).unwrap();
    mgr.create(Utc::now() - Duration::days(1)).unwrap();
    assert_eq!(mgr.len(), 3);
    assert_eq!(mgr.live_sessions().len(), 1);

    assert_eq!(mgr.cleanup(), 2);
    assert_eq!(mgr.ids(), vec![alive.id().to_string()]);
    assert_eq!(mgr.cleanup(), 0);
}

#[test]
fn test_cleanup_on_create() {
    let mgr = SessionManager::new("sid").with_cleanup_on_create(true);
    let old = mgr.create(Utc::now() - Duration::seconds(1)).unwrap();
    assert!(!mgr.contains(old.id()));
    let fresh = mgr.create(in_one_hour()).unwrap();
    assert!(mgr.contains(fresh.id()));
    assert_eq!(mgr.len(), 1);
}

#[test]
fn test_remove_all() {
    let mgr = SessionManager::new("sid");
    for _ in 0..5 {
        mgr.create(in_one_hour()).unwrap();
    }
    mgr.create(Utc::now() - Duration::seconds(1)).unwrap();
    mgr.remove_all();
    assert!(mgr.is_empty());
}

#[test]
fn test_vars_through_manager() {
    let mgr = SessionManager::new("sid");
    let id = mgr.create(in_one_hour()).unwrap().id().to_string();

    mgr.get(&id).unwrap().set_var("user", "alice");
    let session = mgr.get(&id).unwrap();
    assert_eq!(session.get_var("user"), Some("alice".to_string()));
    assert_eq!(session.get_var("missing"), None);
}

#[test]
fn test_removed_handle_is_detached() {
    let mgr = SessionManager::new("sid");
    let session = mgr.create(in_one_hour()).unwrap();
    mgr.remove(session.id()).unwrap();
    session.set_var("k", "v");
    assert!(mgr.get(session.id()).is_err());
}

#[test]
fn test_flash_queue() {
    let mgr = SessionManager::new("sid");
    assert!(mgr.drain_messages().is_empty());

    mgr.add_message("info", "saved");
    mgr.add_message("error", "oops");
    assert_eq!(
        mgr.drain_messages(),
        vec![Message::new("info", "saved"), Message::new("error", "oops")]
    );
    assert!(mgr.drain_messages().is_empty());
}

#[test]
fn test_snapshot_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sessions.json");

    let mgr = SessionManager::new("test123");
    let a = mgr.create(in_one_hour()).unwrap();
    a.set_var("user", "alice");
    a.set_var("theme", "dark");
    a.set_message("info", "welcome back");
    let b = mgr.create(Utc::now() + Duration::minutes(3)).unwrap();
    b.set_var("cart", "3");
    mgr.create(Utc::now() + Duration::days(7)).unwrap();

    mgr.snapshot_to(&path).unwrap();
    let restored = SessionManager::load_from(&path).unwrap();

    assert_eq!(restored.cookie_name(), "test123");
    let original: HashMap<String, _> = mgr
        .live_sessions()
        .into_iter()
        .map(|s| (s.id().to_string(), (s.expiry(), s.vars())))
        .collect();
    let reloaded: HashMap<String, _> = restored
        .live_sessions()
        .into_iter()
        .map(|s| (s.id().to_string(), (s.expiry(), s.vars())))
        .collect();
    assert_eq!(original.len(), 3);
    assert_eq!(original, reloaded);

    let a2 = restored.get(a.id()).unwrap();
    assert_eq!(a2.get_message(), Some(Message::new("info", "welcome back")));
}

#[test]
fn test_snapshot_of_empty_manager() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.json");
    SessionManager::new("test123").snapshot_to(&path).unwrap();

    let restored = SessionManager::load_from(&path).unwrap();
    assert_eq!(restored.cookie_name(), "test123");
    assert!(restored.is_empty());
}

#[test]
fn test_snapshot_keeps_expired_sessions_dead() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sessions.json");
    let mgr = SessionManager::new("sid");
    let dead = mgr.create(Utc::now() - Duration::seconds(1)).unwrap();
    mgr.snapshot_to(&path).unwrap();

    let restored = SessionManager::load_from(&path).unwrap();
    assert!(matches!(restored.get(dead.id()), Err(SessionError::NotFound)));
    assert!(restored.is_empty());
}

#[test]
fn test_load_failures() {
    let dir = TempDir::new().unwrap();

    let missing = SessionManager::load_from(dir.path().join("missing.json"));
    assert!(matches!(
        missing,
        Err(SessionError::PersistenceFailed(StorageError::ReadFailed(_)))
    ));

    let garbage = dir.path().join("garbage.json");
    fs::write(&garbage, "definitely not a snapshot").unwrap();
    assert!(matches!(
        SessionManager::load_from(&garbage),
        Err(SessionError::PersistenceFailed(StorageError::Malformed(_)))
    ));

    let future = dir.path().join("future.json");
    fs::write(&future, r#"{"version":99,"cookie_name":"sid","sessions":[]}"#).unwrap();
    assert!(matches!(
        SessionManager::load_from(&future),
        Err(SessionError::PersistenceFailed(StorageError::UnsupportedVersion(99)))
    ));
}
