//! Input model: pointer events from the rendering surface and the gesture state.
//!
//! `InputState` is the local-only gesture tracked between a pointer-down on
//! a box and the matching pointer-up. It is never replicated or persisted.
//! The anchor is the pointer position at the previous event, so every move
//! turns into a delta against it.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::doc::Position;

/// What a drag on a box does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureKind {
    /// Drag the box body.
    Move,
    /// Drag the resize handle.
    Resize,
}

/// Pointer-down on a box, as reported by the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxPointerDown {
    pub kind: GestureKind,
    /// Index of the box in the shared list.
    pub index: usize,
    /// Pointer position in canvas coordinates.
    pub position: Position,
}

/// An in-progress drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gesture {
    pub kind: GestureKind,
    /// Target box index at pointer-down; may go stale under remote deletes.
    pub index: usize,
    /// Pointer position at the previous event.
    pub anchor: Position,
}

impl From<BoxPointerDown> for Gesture {
    fn from(down: BoxPointerDown) -> Self {
        Self { kind: down.kind, index: down.index, anchor: down.position }
    }
}

/// Gesture state machine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InputState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// A box is being moved or resized.
    Dragging(Gesture),
}

impl InputState {
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self, Self::Dragging(_))
    }

    /// The active gesture, if any.
    #[must_use]
    pub fn gesture(&self) -> Option<Gesture> {
        match self {
            Self::Idle => None,
            Self::Dragging(gesture) => Some(*gesture),
        }
    }
}

/// Cursor affordance for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragState {
    /// Not logged in; the canvas is read-only.
    None,
    /// Logged in and idle.
    Ready,
    /// A gesture is in progress.
    Dragging,
}
