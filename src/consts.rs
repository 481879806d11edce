//! Shared constants for the canvas core.

// ── Box geometry ────────────────────────────────────────────────

/// Smallest width or height a resize may leave a box with.
pub const MIN_BOX_SIZE: f64 = 50.0;

/// Width and height of a box created by a bare pointer-up.
pub const DEFAULT_BOX_SIZE: f64 = 100.0;

// ── Document layout ─────────────────────────────────────────────

/// Root key of the replicated box list.
pub const BOXES_KEY: &str = "boxes";

/// Box map key holding the nested `{top, left}` map.
pub const POSITION_KEY: &str = "position";

/// Box map key holding the nested `{width, height}` map.
pub const SIZE_KEY: &str = "size";

/// Box map key holding the palette color name.
pub const COLOR_KEY: &str = "color";

// ── Defaults ────────────────────────────────────────────────────

/// Room every peer joins unless configured otherwise.
pub const DEFAULT_ROOM: &str = "syn-global-room";

/// Local snapshot file used unless configured otherwise.
pub const DEFAULT_SNAPSHOT_PATH: &str = "syn-index-db.automerge";

/// Snapshot flush period in milliseconds.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1000;

/// Number of peers the demo binary simulates.
pub const DEFAULT_DEMO_PEERS: usize = 2;

/// Outgoing frame buffer per room member.
pub const ROOM_CHANNEL_CAPACITY: usize = 64;
