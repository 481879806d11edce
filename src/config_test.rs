use std::collections::HashMap;

use super::*;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn empty_environment_uses_defaults() {
    let config = CanvasConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config, CanvasConfig::default());
    assert_eq!(config.room, "syn-global-room");
    assert_eq!(config.snapshot_path, PathBuf::from("syn-index-db.automerge"));
    assert_eq!(config.flush_interval, Duration::from_millis(1000));
    assert_eq!(config.demo_peers, 2);
    assert!(config.user_name.is_none());
}

#[test]
fn overrides_are_applied() {
    let config = CanvasConfig::from_lookup(lookup(&[
        ("CANVAS_ROOM", "team-room"),
        ("CANVAS_SNAPSHOT_PATH", "/tmp/canvas.automerge"),
        ("CANVAS_USER_NAME", "ada"),
        ("CANVAS_FLUSH_INTERVAL_MS", "250"),
        ("CANVAS_DEMO_PEERS", "4"),
    ]))
    .unwrap();

    assert_eq!(config.room, "team-room");
    assert_eq!(config.snapshot_path, PathBuf::from("/tmp/canvas.automerge"));
    assert_eq!(config.user_name.as_deref(), Some("ada"));
    assert_eq!(config.flush_interval, Duration::from_millis(250));
    assert_eq!(config.demo_peers, 4);
}

#[test]
fn blank_values_fall_back_to_defaults() {
    let config = CanvasConfig::from_lookup(lookup(&[("CANVAS_ROOM", "  "), ("CANVAS_USER_NAME", "")])).unwrap();
    assert_eq!(config.room, "syn-global-room");
    assert!(config.user_name.is_none());
}

#[test]
fn invalid_number_is_rejected() {
    let err = CanvasConfig::from_lookup(lookup(&[("CANVAS_FLUSH_INTERVAL_MS", "soon")])).unwrap_err();
    assert_eq!(err, ConfigError::Invalid { var: "CANVAS_FLUSH_INTERVAL_MS", value: "soon".into() });
    assert_eq!(err.error_code(), "E_CONFIG_INVALID");
}

#[test]
fn zero_is_rejected() {
    let err = CanvasConfig::from_lookup(lookup(&[("CANVAS_DEMO_PEERS", "0")])).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { var: "CANVAS_DEMO_PEERS", .. }));
}

#[test]
fn from_env_reads_process_environment() {
    unsafe { std::env::set_var("CANVAS_DEMO_PEERS", "3") };
    let config = CanvasConfig::from_env().unwrap();
    unsafe { std::env::remove_var("CANVAS_DEMO_PEERS") };
    assert_eq!(config.demo_peers, 3);
}
