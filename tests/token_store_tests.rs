//! Integration tests for session persistence on disk.

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use chirp_sdk::auth::{FileStorage, SlotStorage};
use chirp_sdk::{Credentials, StorageNamespace, TokenStore, UserProfile};

fn demo_user() -> UserProfile {
    UserProfile {
        id: 2,
        name: "Demo User".to_string(),
        username: "demouser".to_string(),
        email: "demo@twitter.com".to_string(),
        avatar: None,
        followers: 1000,
        following: 500,
        joined: None,
    }
}

fn file_store(path: &std::path::Path, namespace: &str) -> TokenStore {
    let storage: Arc<dyn SlotStorage> = Arc::new(FileStorage::new(path));
    TokenStore::new(storage, &StorageNamespace::new(namespace).unwrap())
}

#[test]
fn test_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    file_store(&path, "twitter")
        .save(
            &Credentials::new("a1", Some("r1".to_string())),
            Some(&demo_user()),
        )
        .unwrap();

    // A new store over the same file sees the same session.
    let session = file_store(&path, "twitter").load();
    assert!(session.is_authenticated());
    assert_eq!(session.access_token(), Some("a1"));
    assert_eq!(session.refresh_token(), Some("r1"));
    assert_eq!(session.identity, Some(demo_user()));
}

#[test]
fn test_persisted_layout_uses_namespaced_slots() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    file_store(&path, "twitter")
        .save(&Credentials::new("a1", None), Some(&demo_user()))
        .unwrap();

    let slots: HashMap<String, String> =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(slots.get("twitter_access_token").map(String::as_str), Some("a1"));
    assert!(!slots.contains_key("twitter_refresh_token"));

    let identity: UserProfile = serde_json::from_str(&slots["twitter_user"]).unwrap();
    assert_eq!(identity.username, "demouser");
}

#[test]
fn test_namespaces_do_not_collide() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let first = file_store(&path, "alpha");
    let second = file_store(&path, "beta");

    first.save(&Credentials::new("a-alpha", None), None).unwrap();
    second.save(&Credentials::new("a-beta", None), None).unwrap();
    first.clear().unwrap();

    assert!(!first.load().is_authenticated());
    assert_eq!(second.access_token().as_deref(), Some("a-beta"));
}

#[test]
fn test_corrupt_identity_loads_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    fs::write(
        &path,
        r#"{"twitter_access_token": "a1", "twitter_user": "{not json"}"#,
    )
    .unwrap();

    let session = file_store(&path, "twitter").load();

    assert!(session.is_authenticated());
    assert!(session.identity.is_none());
}

#[test]
fn test_refresh_token_without_access_token_is_no_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    fs::write(&path, r#"{"twitter_refresh_token": "r1"}"#).unwrap();

    let session = file_store(&path, "twitter").load();

    assert!(!session.is_authenticated());
    assert!(session.credentials.is_none());
}

#[test]
fn test_unreadable_file_loads_empty_and_is_replaced_on_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    fs::write(&path, "this is not json").unwrap();

    let store = file_store(&path, "twitter");
    assert!(!store.load().is_authenticated());

    store.save(&Credentials::new("a1", None), None).unwrap();
    assert_eq!(store.access_token().as_deref(), Some("a1"));
}

#[test]
fn test_update_tokens_keeps_refresh_token_when_not_rotated() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(&dir.path().join("session.json"), "twitter");
    store
        .save(&Credentials::new("a1", Some("r1".to_string())), None)
        .unwrap();

    store.update_tokens("a2", None).unwrap();
    assert_eq!(store.access_token().as_deref(), Some("a2"));
    assert_eq!(store.refresh_token().as_deref(), Some("r1"));

    store.update_tokens("a3", Some("r2")).unwrap();
    assert_eq!(store.refresh_token().as_deref(), Some("r2"));
}
