//! Gesture engine: pointer events in, replicated box mutations out.
//!
//! DESIGN
//! ======
//! `CanvasEngine` is the single writer for one peer. It owns the gesture
//! state, the projection over the shared list, and the peer's presence
//! handle. The rendering surface drives it through four commands
//! (`on_move_cursor`, `on_draw_pointer_up`, `on_box_pointer_down`,
//! `on_box_delete`) and reads `boxes`, `is_dragging`, and `drag_state` back.
//!
//! Moves and resizes are applied as relative updates: each pointer move
//! computes `pointer - anchor`, reads the target's *current* field from the
//! document, writes `current + delta`, and re-anchors. A remote write that
//! lands between two local moves is therefore built upon, not overwritten
//! with a value derived from the gesture's starting point.
//!
//! ERROR HANDLING
//! ==============
//! Commands never fail. Without a local identity every mutating event is
//! ignored. A target that vanished (remote delete shrank the list below the
//! gesture's index) or turned malformed aborts the gesture back to `Idle`.
//! A target index still in range after a remote delete addresses whichever
//! box now occupies it. Failed deletes are logged and dropped.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::doc::{BoxRecord, DocError, Position, Size};
use crate::error::ErrorCode;
use crate::input::{BoxPointerDown, DragState, Gesture, GestureKind, InputState};
use crate::palette::PaletteColor;
use crate::presence::{Identity, PeerId, PresenceHandle, RemotePeer};
use crate::projection::Projection;

/// Effects of a command, in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The local cursor was broadcast to the room.
    CursorBroadcast(Position),
    /// A move or resize gesture began.
    GestureStarted(Gesture),
    /// The gesture ended normally (pointer-up or delete).
    GestureEnded,
    /// The gesture's target could not be edited; state is back to `Idle`.
    GestureAborted { index: usize },
    /// The box at `index` now sits at `position`.
    Moved { index: usize, position: Position },
    /// The box at `index` now has `size`.
    Resized { index: usize, size: Size },
    /// A new box was appended at `index`.
    Created { index: usize, record: BoxRecord },
    /// The box at `index` was removed.
    Deleted { index: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no local identity; log in first")]
    NotAuthorized,
    #[error("box index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error(transparent)]
    Doc(DocError),
}

impl From<DocError> for EngineError {
    fn from(err: DocError) -> Self {
        match err {
            DocError::IndexOutOfRange { index, len } => Self::IndexOutOfRange { index, len },
            other => Self::Doc(other),
        }
    }
}

impl ErrorCode for EngineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotAuthorized => "E_NOT_AUTHORIZED",
            Self::IndexOutOfRange { .. } => "E_INDEX_OUT_OF_RANGE",
            Self::Doc(e) => e.error_code(),
        }
    }
}

pub struct CanvasEngine {
    projection: Projection,
    presence: PresenceHandle,
    input: InputState,
}

impl CanvasEngine {
    #[must_use]
    pub fn new(projection: Projection, presence: PresenceHandle) -> Self {
        Self { projection, presence, input: InputState::Idle }
    }

    // --- Session ---

    /// Log in (idempotent). Mutating commands are ignored until this runs.
    pub fn login(&mut self) -> Identity {
        self.presence.login()
    }

    #[must_use]
    pub fn local_user(&self) -> Option<&Identity> {
        self.presence.local_user()
    }

    #[must_use]
    pub fn peer_id(&self) -> PeerId {
        self.presence.peer_id()
    }

    #[must_use]
    pub fn remote_peers(&self) -> HashMap<PeerId, RemotePeer> {
        self.presence.remote_peers()
    }

    // --- Commands ---

    /// Pointer moved anywhere on the canvas.
    ///
    /// Always broadcasts the cursor; also advances an active gesture.
    pub fn on_move_cursor(&mut self, position: Position) -> Vec<Action> {
        self.presence.set_local_cursor(position);
        let mut actions = vec![Action::CursorBroadcast(position)];
        let result = self.drag(position);
        actions.extend(self.settle("pointer_move", result));
        actions
    }

    /// Pointer released over the drawing area.
    ///
    /// Ends an active gesture; otherwise creates a default box at `position`.
    pub fn on_draw_pointer_up(&mut self, position: Position) -> Vec<Action> {
        let result = self.release(position);
        self.settle("pointer_up", result)
    }

    /// Pointer pressed on a box body or resize handle.
    pub fn on_box_pointer_down(&mut self, down: BoxPointerDown) -> Vec<Action> {
        let result = self.press(down);
        self.settle("box_pointer_down", result)
    }

    /// Delete requested for the box at `index`. Clears any gesture.
    pub fn on_box_delete(&mut self, index: usize) -> Vec<Action> {
        let result = self.remove(index);
        self.settle("box_delete", result)
    }

    // --- Queries ---

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.input.is_dragging()
    }

    #[must_use]
    pub fn drag_state(&self) -> DragState {
        if self.input.is_dragging() {
            DragState::Dragging
        } else if self.presence.is_logged_in() {
            DragState::Ready
        } else {
            DragState::None
        }
    }

    #[must_use]
    pub fn input_state(&self) -> InputState {
        self.input
    }

    /// The current ordered boxes, for display.
    #[must_use]
    pub fn boxes(&self) -> &[BoxRecord] {
        self.projection.boxes()
    }

    #[must_use]
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn projection_mut(&mut self) -> &mut Projection {
        &mut self.projection
    }

    // --- Replication ---

    /// Merge another in-process peer's document into this one.
    ///
    /// # Errors
    ///
    /// Propagates automerge merge errors.
    pub fn merge_from(&mut self, other: &mut CanvasEngine) -> Result<(), DocError> {
        self.projection.merge(other.projection.doc_mut())
    }

    // --- Transitions ---

    fn authorize(&self) -> Result<(), EngineError> {
        if self.presence.is_logged_in() { Ok(()) } else { Err(EngineError::NotAuthorized) }
    }

    fn press(&mut self, down: BoxPointerDown) -> Result<Vec<Action>, EngineError> {
        self.authorize()?;
        if let InputState::Dragging(active) = self.input {
            debug!(active = active.index, pressed = down.index, "pointer-down ignored mid-gesture");
            return Ok(Vec::new());
        }

        let gesture = Gesture::from(down);
        self.input = InputState::Dragging(gesture);
        debug!(kind = ?gesture.kind, index = gesture.index, "gesture started");
        Ok(vec![Action::GestureStarted(gesture)])
    }

    fn drag(&mut self, pointer: Position) -> Result<Vec<Action>, EngineError> {
        self.authorize()?;
        let InputState::Dragging(gesture) = self.input else {
            return Ok(Vec::new());
        };

        let delta = pointer.delta_from(gesture.anchor);
        let index = gesture.index;
        let action = match gesture.kind {
            GestureKind::Move => {
                let position = self.projection.position(index)?.translated(delta);
                self.projection.set_position(index, position)?;
                Action::Moved { index, position }
            }
            GestureKind::Resize => {
                let size = self.projection.size(index)?.grown_by(delta);
                self.projection.set_size(index, size)?;
                Action::Resized { index, size }
            }
        };

        self.input = InputState::Dragging(Gesture { anchor: pointer, ..gesture });
        Ok(vec![action])
    }

    fn release(&mut self, position: Position) -> Result<Vec<Action>, EngineError> {
        self.authorize()?;
        if self.input.is_dragging() {
            self.input = InputState::Idle;
            debug!("gesture ended");
            return Ok(vec![Action::GestureEnded]);
        }

        let record = BoxRecord::new(position, PaletteColor::random());
        let index = self.projection.push(record)?;
        debug!(index, color = %record.color, "box created");
        Ok(vec![Action::Created { index, record }])
    }

    fn remove(&mut self, index: usize) -> Result<Vec<Action>, EngineError> {
        self.authorize()?;
        let mut actions = Vec::new();
        if self.input.is_dragging() {
            self.input = InputState::Idle;
            actions.push(Action::GestureEnded);
        }

        match self.projection.delete(index) {
            Ok(()) => {
                debug!(index, "box deleted");
                actions.push(Action::Deleted { index });
            }
            Err(e) => {
                let e = EngineError::from(e);
                warn!(index, code = e.error_code(), error = %e, "delete ignored");
            }
        }
        Ok(actions)
    }

    /// Turn a transition failure into a no-op, aborting any gesture.
    fn settle(&mut self, event: &'static str, result: Result<Vec<Action>, EngineError>) -> Vec<Action> {
        match result {
            Ok(actions) => actions,
            Err(EngineError::NotAuthorized) => {
                debug!(event, "ignored without local identity");
                Vec::new()
            }
            Err(e) => {
                let mut actions = Vec::new();
                if let Some(gesture) = self.input.gesture() {
                    actions.push(Action::GestureAborted { index: gesture.index });
                }
                self.input = InputState::Idle;
                warn!(event, code = e.error_code(), error = %e, "event dropped; back to idle");
                actions
            }
        }
    }
}
