use super::*;

#[test]
fn connect_registers_anonymous_peer() {
    let awareness = Awareness::new();
    let handle = awareness.connect();
    assert_eq!(awareness.peer_count(), 1);
    assert!(!handle.is_logged_in());
    assert!(handle.local_user().is_none());
}

#[test]
fn login_is_idempotent() {
    let awareness = Awareness::new();
    let mut handle = awareness.connect();

    let first = handle.login();
    let second = handle.login();

    assert_eq!(first, second);
    assert_eq!(handle.local_user(), Some(&first));
    assert_eq!(awareness.peer_count(), 1);
}

#[test]
fn double_login_is_one_remote_peer() {
    let awareness = Awareness::new();
    let mut alice = awareness.connect_as("alice");
    let bob = awareness.connect_as("bob");

    alice.login();
    alice.login();

    let seen = bob.remote_peers();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[&alice.peer_id()].identity.name, "alice");
}

#[test]
fn connect_as_sets_login_name() {
    let awareness = Awareness::new();
    let mut handle = awareness.connect_as("carol");
    assert_eq!(handle.login().name, "carol");
}

#[test]
fn anonymous_login_gets_guest_name() {
    let awareness = Awareness::new();
    let mut handle = awareness.connect();
    let identity = handle.login();
    assert!(identity.name.starts_with("guest-"));
    assert_eq!(identity.name.len(), "guest-".len() + 8);
}

#[test]
fn remote_peers_excludes_self_and_logged_out_peers() {
    let awareness = Awareness::new();
    let mut alice = awareness.connect_as("alice");
    let _lurker = awareness.connect();
    let mut bob = awareness.connect_as("bob");

    alice.login();
    bob.login();

    let from_alice = alice.remote_peers();
    assert_eq!(from_alice.len(), 1);
    assert!(from_alice.contains_key(&bob.peer_id()));
    assert!(!from_alice.contains_key(&alice.peer_id()));
}

#[test]
fn cursor_broadcast_reaches_other_peers() {
    let awareness = Awareness::new();
    let mut alice = awareness.connect_as("alice");
    let bob = awareness.connect_as("bob");
    alice.login();

    alice.set_local_cursor(Position::new(12.0, 34.0));
    alice.set_local_cursor(Position::new(13.0, 35.0));

    let seen = bob.remote_peers();
    assert_eq!(seen[&alice.peer_id()].cursor, Some(Position::new(13.0, 35.0)));
}

#[test]
fn cursor_before_login_is_kept_for_later() {
    let awareness = Awareness::new();
    let mut alice = awareness.connect_as("alice");
    let bob = awareness.connect_as("bob");

    alice.set_local_cursor(Position::new(1.0, 2.0));
    assert!(bob.remote_peers().is_empty());

    alice.login();
    assert_eq!(bob.remote_peers()[&alice.peer_id()].cursor, Some(Position::new(1.0, 2.0)));
}

#[test]
fn dropping_handle_removes_peer() {
    let awareness = Awareness::new();
    let mut alice = awareness.connect_as("alice");
    let bob = awareness.connect_as("bob");
    alice.login();
    assert_eq!(bob.remote_peers().len(), 1);

    drop(alice);
    assert!(bob.remote_peers().is_empty());
    assert_eq!(awareness.peer_count(), 1);
}

#[test]
fn version_moves_on_every_presence_change() {
    let awareness = Awareness::new();
    let v0 = awareness.version();
    let mut alice = awareness.connect();
    let v1 = awareness.version();
    alice.login();
    let v2 = awareness.version();
    alice.set_local_cursor(Position::new(0.0, 0.0));
    let v3 = awareness.version();

    assert!(v0 < v1 && v1 < v2 && v2 < v3);
}
