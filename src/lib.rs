//! Collaborative box canvas: a shared, conflict-free list of colored boxes.
//!
//! Every peer holds a replica of the same automerge document. Logged-in
//! peers create boxes by releasing the pointer on empty canvas, move and
//! resize them by dragging, and delete them. Edits are applied as deltas
//! against the box's current value, so concurrent edits from other peers
//! are built upon instead of reverted. Cursor positions are shared as
//! ephemeral presence and never stored.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`doc`] | Replicated box list and typed box records |
//! | [`projection`] | Incrementally refreshed read model over the document |
//! | [`engine`] | Gesture state machine turning pointer events into edits |
//! | [`input`] | Pointer event types, gesture state, and drag affordance |
//! | [`presence`] | Login identity, connected peers, and live cursors |
//! | [`palette`] | Named colors assigned to boxes and users |
//! | [`room`] | In-process relay of document updates between peers |
//! | [`persistence`] | Snapshot load/save and the periodic flush task |
//! | [`config`] | Environment-driven configuration |
//! | [`error`] | Shared error-code trait |
//! | [`consts`] | Geometry limits, document keys, and defaults |

pub mod config;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod error;
pub mod input;
pub mod palette;
pub mod persistence;
pub mod presence;
pub mod projection;
pub mod room;
