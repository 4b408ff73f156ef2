//! End-to-end tests for the domain service: accounts, secret
//! lifecycle, and owner isolation.

use keepsake::cancel::CancelToken;
use keepsake::errors::KeepsakeError;
use keepsake::models::{
    AuthSession, LoginRequest, RegisterRequest, SecretRequest, SecretType,
};
use keepsake::payload::SecretPayload;
use keepsake::server::{Database, SecretService, TokenSigner};

fn service() -> SecretService {
    let db = Database::open_in_memory().expect("in-memory db");
    SecretService::new(db, TokenSigner::new(b"test-signing-secret".to_vec(), 24))
}

fn register(service: &SecretService, username: &str, password: &str) -> AuthSession {
    service
        .register(&RegisterRequest {
            username: username.into(),
            email: format!("{username}@example.com"),
            password: password.into(),
        })
        .expect("register")
}

fn text_request(name: &str, content: &str) -> SecretRequest {
    SecretRequest {
        kind: SecretType::Text,
        name: name.into(),
        data: serde_json::json!({ "name": name, "content": content }),
        metadata: String::new(),
    }
}

fn cancel() -> CancelToken {
    CancelToken::new()
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[test]
fn register_then_login() {
    let service = service();
    register(&service, "alice", "pw-alice-1");

    let ok = service.login(&LoginRequest {
        username: "alice".into(),
        password: "pw-alice-1".into(),
    });
    assert!(ok.is_ok());

    let wrong = service.login(&LoginRequest {
        username: "alice".into(),
        password: "pw-alice-2".into(),
    });
    assert!(matches!(wrong, Err(KeepsakeError::InvalidCredentials)));

    let nobody = service.login(&LoginRequest {
        username: "nobody".into(),
        password: "pw-alice-1".into(),
    });
    assert!(matches!(nobody, Err(KeepsakeError::InvalidCredentials)));
}

#[test]
fn duplicate_username_is_rejected() {
    let service = service();
    register(&service, "alice", "pw-alice-1");

    let again = service.register(&RegisterRequest {
        username: "alice".into(),
        email: "other@example.com".into(),
        password: "pw-alice-9".into(),
    });
    assert!(matches!(again, Err(KeepsakeError::AlreadyExists)));
}

#[test]
fn session_token_resolves_back_to_the_user() {
    let service = service();
    let session = register(&service, "alice", "pw-alice-1");

    let principal = service.authenticate(&session.token).expect("authenticate");
    assert_eq!(principal.id, session.user.id);
    assert_eq!(principal.username, "alice");

    assert!(matches!(
        service.authenticate("bogus.token"),
        Err(KeepsakeError::Unauthorized)
    ));
}

#[test]
fn register_validation_rejects_weak_input() {
    let service = service();

    let weak = service.register(&RegisterRequest {
        username: "alice".into(),
        email: "alice@example.com".into(),
        password: "short".into(),
    });
    assert!(matches!(weak, Err(KeepsakeError::Validation(_))));
}

// ---------------------------------------------------------------------------
// Secret lifecycle
// ---------------------------------------------------------------------------

#[test]
fn credentials_secret_lifecycle() {
    let service = service();
    let alice = register(&service, "alice", "pw-alice-1").user;

    let req = SecretRequest {
        kind: SecretType::Credentials,
        name: "GH".into(),
        data: serde_json::json!({
            "name": "GH", "username": "a", "password": "b", "url": "https://g"
        }),
        metadata: String::new(),
    };
    let created = service
        .create_secret(alice.id, &req, "mp", &cancel())
        .expect("create");

    // Exactly one secret, the one we wrote.
    let list = service
        .list_secrets(alice.id, "mp", &cancel())
        .expect("list");
    assert_eq!(list.total, 1);
    assert_eq!(list.secrets[0].name, "GH");

    // Read under the right master password returns the payload.
    let read = service
        .get_secret(created.id, alice.id, "mp", &cancel())
        .expect("get");
    match &read.data {
        SecretPayload::Credentials(c) => {
            assert_eq!(c.username, "a");
            assert_eq!(c.password, "b");
            assert_eq!(c.url.as_deref(), Some("https://g"));
        }
        other => panic!("expected credentials payload, got {other:?}"),
    }

    // Read under a wrong master password fails.
    let wrong = service.get_secret(created.id, alice.id, "nope", &cancel());
    assert!(matches!(wrong, Err(KeepsakeError::DecryptionFailed)));
}

#[test]
fn update_refreshes_fingerprint_even_for_identical_payload() {
    let service = service();
    let alice = register(&service, "alice", "pw-alice-1").user;

    let req = text_request("note", "same content");
    let created = service
        .create_secret(alice.id, &req, "mp", &cancel())
        .expect("create");

    let updated = service
        .update_secret(created.id, alice.id, &req, "mp", &cancel())
        .expect("update");

    // Fresh salt + nonce means new ciphertext and fingerprint even
    // though the plaintext did not change.
    assert_ne!(updated.sync_hash, created.sync_hash);
    assert!(updated.updated_at > created.updated_at);
    assert_eq!(updated.created_at, created.created_at);
}

#[test]
fn update_cannot_change_the_type_tag() {
    let service = service();
    let alice = register(&service, "alice", "pw-alice-1").user;

    let created = service
        .create_secret(alice.id, &text_request("note", "text"), "mp", &cancel())
        .expect("create");

    let as_card = SecretRequest {
        kind: SecretType::Card,
        name: "note".into(),
        data: serde_json::json!({
            "name": "note", "number": "4111111111111111",
            "expiry_month": 1, "expiry_year": 2030,
            "cvv": "123", "holder": "X"
        }),
        metadata: String::new(),
    };
    let err = service.update_secret(created.id, alice.id, &as_card, "mp", &cancel());
    assert!(matches!(err, Err(KeepsakeError::Validation(_))));
}

#[test]
fn delete_removes_the_secret() {
    let service = service();
    let alice = register(&service, "alice", "pw-alice-1").user;

    let created = service
        .create_secret(alice.id, &text_request("doomed", "x"), "mp", &cancel())
        .expect("create");

    service
        .delete_secret(created.id, alice.id, &cancel())
        .expect("delete");

    assert!(matches!(
        service.get_secret(created.id, alice.id, "mp", &cancel()),
        Err(KeepsakeError::NotFound)
    ));
    assert!(matches!(
        service.delete_secret(created.id, alice.id, &cancel()),
        Err(KeepsakeError::NotFound)
    ));
}

// ---------------------------------------------------------------------------
// Owner isolation
// ---------------------------------------------------------------------------

#[test]
fn other_users_see_not_found_never_forbidden() {
    let service = service();
    let alice = register(&service, "alice", "pw-alice-1").user;
    let bob = register(&service, "bob", "pw-bob-111").user;

    let secret = service
        .create_secret(alice.id, &text_request("hers", "x"), "mp", &cancel())
        .expect("create");

    assert!(matches!(
        service.get_secret(secret.id, bob.id, "mp", &cancel()),
        Err(KeepsakeError::NotFound)
    ));
    assert!(matches!(
        service.update_secret(secret.id, bob.id, &text_request("hers", "y"), "mp", &cancel()),
        Err(KeepsakeError::NotFound)
    ));
    assert!(matches!(
        service.delete_secret(secret.id, bob.id, &cancel()),
        Err(KeepsakeError::NotFound)
    ));

    let bobs_list = service.list_secrets(bob.id, "mp", &cancel()).expect("list");
    assert_eq!(bobs_list.total, 0);
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[test]
fn fired_cancel_token_aborts_before_any_write() {
    let service = service();
    let alice = register(&service, "alice", "pw-alice-1").user;

    let fired = CancelToken::new();
    fired.cancel();

    let err = service.create_secret(alice.id, &text_request("never", "x"), "mp", &fired);
    assert!(matches!(err, Err(KeepsakeError::Cancelled)));

    // Nothing was committed.
    let list = service
        .list_secrets(alice.id, "mp", &cancel())
        .expect("list");
    assert_eq!(list.total, 0);
}
