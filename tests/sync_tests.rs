//! End-to-end sync scenarios: the operation log folded into client
//! reconciliation.

use std::collections::HashMap;

use chrono::DateTime;
use keepsake::cancel::CancelToken;
use keepsake::models::{RegisterRequest, SecretRequest, SecretType, SyncRequest, User};
use keepsake::server::{Database, SecretService, TokenSigner};

fn service() -> SecretService {
    let db = Database::open_in_memory().expect("in-memory db");
    SecretService::new(db, TokenSigner::new(b"test-signing-secret".to_vec(), 24))
}

fn register(service: &SecretService, username: &str) -> User {
    service
        .register(&RegisterRequest {
            username: username.into(),
            email: format!("{username}@example.com"),
            password: "pw-123456".into(),
        })
        .expect("register")
        .user
}

fn text_request(name: &str) -> SecretRequest {
    SecretRequest {
        kind: SecretType::Text,
        name: name.into(),
        data: serde_json::json!({ "name": name, "content": format!("content of {name}") }),
        metadata: String::new(),
    }
}

fn sync_from(
    service: &SecretService,
    user: &User,
    last: chrono::DateTime<chrono::Utc>,
    master: &str,
) -> keepsake::models::SyncResponse {
    let req = SyncRequest {
        last_sync_time: last,
        client_hashes: HashMap::new(),
    };
    service
        .sync(user.id, &req, master, &CancelToken::new())
        .expect("sync")
}

fn epoch() -> chrono::DateTime<chrono::Utc> {
    DateTime::UNIX_EPOCH
}

#[test]
fn initial_sync_returns_every_created_secret() {
    let service = service();
    let alice = register(&service, "alice");
    let cancel = CancelToken::new();

    let mut created_ids = Vec::new();
    for name in ["one", "two", "three"] {
        let resp = service
            .create_secret(alice.id, &text_request(name), "mp", &cancel)
            .expect("create");
        created_ids.push(resp.id);
    }
    let last_created_at = service
        .get_secret(created_ids[2], alice.id, "mp", &cancel)
        .expect("get")
        .updated_at;

    let response = sync_from(&service, &alice, epoch(), "mp");

    assert_eq!(response.updated_secrets.len(), 3);
    assert!(response.deleted_secrets.is_empty());
    assert!(response.sync_time >= last_created_at);

    let mut got: Vec<_> = response.updated_secrets.iter().map(|s| s.id).collect();
    got.sort();
    created_ids.sort();
    assert_eq!(got, created_ids);

    // Property: re-running from the returned instant finds nothing.
    let again = sync_from(&service, &alice, response.sync_time, "mp");
    assert!(again.updated_secrets.is_empty());
    assert!(again.deleted_secrets.is_empty());
}

#[test]
fn delete_after_the_window_start_becomes_a_tombstone() {
    let service = service();
    let alice = register(&service, "alice");
    let cancel = CancelToken::new();

    let mut ids = Vec::new();
    for name in ["one", "two", "three"] {
        ids.push(
            service
                .create_secret(alice.id, &text_request(name), "mp", &cancel)
                .expect("create")
                .id,
        );
    }

    // Window starts at the third create.
    let t3 = service
        .get_secret(ids[2], alice.id, "mp", &cancel)
        .expect("get")
        .updated_at;

    service
        .delete_secret(ids[1], alice.id, &cancel)
        .expect("delete");

    let response = sync_from(&service, &alice, t3, "mp");
    assert!(response.updated_secrets.is_empty());
    assert_eq!(response.deleted_secrets, vec![ids[1]]);

    // The deleted secret is gone from listing too.
    let list = service
        .list_secrets(alice.id, "mp", &cancel)
        .expect("list");
    assert_eq!(list.total, 2);
    assert!(list.secrets.iter().all(|s| s.id != ids[1]));
}

#[test]
fn create_update_delete_collapses_within_one_window() {
    let service = service();
    let alice = register(&service, "alice");
    let cancel = CancelToken::new();

    let last = epoch();

    let created = service
        .create_secret(alice.id, &text_request("volatile"), "mp", &cancel)
        .expect("create");
    for _ in 0..2 {
        service
            .update_secret(created.id, alice.id, &text_request("volatile"), "mp", &cancel)
            .expect("update");
    }
    service
        .delete_secret(created.id, alice.id, &cancel)
        .expect("delete");

    let response = sync_from(&service, &alice, last, "mp");
    assert!(response.updated_secrets.is_empty());
    assert_eq!(response.deleted_secrets, vec![created.id]);
}

#[test]
fn repeated_updates_surface_the_secret_once() {
    let service = service();
    let alice = register(&service, "alice");
    let cancel = CancelToken::new();

    let created = service
        .create_secret(alice.id, &text_request("busy"), "mp", &cancel)
        .expect("create");
    for _ in 0..3 {
        service
            .update_secret(created.id, alice.id, &text_request("busy"), "mp", &cancel)
            .expect("update");
    }

    let response = sync_from(&service, &alice, epoch(), "mp");
    assert_eq!(response.updated_secrets.len(), 1);
    assert_eq!(response.updated_secrets[0].id, created.id);
}

#[test]
fn undecodable_secret_is_omitted_but_sync_still_succeeds() {
    let service = service();
    let alice = register(&service, "alice");
    let cancel = CancelToken::new();

    // Stored under mp1; the sync below presents mp2.
    service
        .create_secret(alice.id, &text_request("locked"), "mp1", &cancel)
        .expect("create");

    let response = sync_from(&service, &alice, epoch(), "mp2");
    assert!(response.updated_secrets.is_empty());
    assert!(response.deleted_secrets.is_empty());
    assert!(response.sync_time > epoch());
}

#[test]
fn matching_client_hash_suppresses_an_unchanged_secret() {
    let service = service();
    let alice = register(&service, "alice");
    let cancel = CancelToken::new();

    let created = service
        .create_secret(alice.id, &text_request("steady"), "mp", &cancel)
        .expect("create");

    // A client that already holds the exact bytes is not re-sent them.
    let req = SyncRequest {
        last_sync_time: epoch(),
        client_hashes: HashMap::from([(created.id, created.sync_hash.clone())]),
    };
    let response = service
        .sync(alice.id, &req, "mp", &cancel)
        .expect("sync");
    assert!(response.updated_secrets.is_empty());

    // A stale hash does not suppress.
    let req = SyncRequest {
        last_sync_time: epoch(),
        client_hashes: HashMap::from([(created.id, "stale-hash".to_string())]),
    };
    let response = service
        .sync(alice.id, &req, "mp", &cancel)
        .expect("sync");
    assert_eq!(response.updated_secrets.len(), 1);
}

#[test]
fn sync_windows_are_scoped_per_user() {
    let service = service();
    let alice = register(&service, "alice");
    let bob = register(&service, "bob");
    let cancel = CancelToken::new();

    service
        .create_secret(alice.id, &text_request("hers"), "mp", &cancel)
        .expect("create");

    let bobs = sync_from(&service, &bob, epoch(), "mp");
    assert!(bobs.updated_secrets.is_empty());
    assert!(bobs.deleted_secrets.is_empty());
}
