//! Document model: box records and the replicated box list.
//!
//! `CanvasDoc` wraps an automerge document whose root holds a single list,
//! `boxes`. Each list entry is a map:
//!
//! ```text
//! { position: { top, left }, size: { width, height }, color: "<palette name>" }
//! ```
//!
//! Every scalar is an independently merged register, so two peers editing
//! different fields of the same box never clobber each other, and a reader
//! fetching `position` then `size` may see them from different writers.
//!
//! Records are validated here, at the boundary: anything that crosses out of
//! the automerge map is a typed `BoxRecord` or a `DocError::Schema`.
//!
//! Observers call `subscribe` once and receive a `Change` for every local
//! mutation and one `Change::Merged` per remote update that applied anything.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::sync::mpsc;

use automerge::transaction::Transactable;
use automerge::{AutoCommit, AutomergeError, ObjId, ObjType, ROOT, ReadDoc, ScalarValue, Value};
use serde::{Deserialize, Serialize};

use crate::consts::{BOXES_KEY, COLOR_KEY, DEFAULT_BOX_SIZE, MIN_BOX_SIZE, POSITION_KEY, SIZE_KEY};
use crate::error::ErrorCode;
use crate::palette::PaletteColor;

/// A point on the canvas, also used for pointer deltas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub top: f64,
    pub left: f64,
}

impl Position {
    #[must_use]
    pub fn new(top: f64, left: f64) -> Self {
        Self { top, left }
    }

    /// Component-wise `self - origin`.
    #[must_use]
    pub fn delta_from(self, origin: Position) -> Position {
        Position { top: self.top - origin.top, left: self.left - origin.left }
    }

    /// Component-wise `self + delta`.
    #[must_use]
    pub fn translated(self, delta: Position) -> Position {
        Position { top: self.top + delta.top, left: self.left + delta.left }
    }
}

/// Box dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Grow by a pointer delta, clamping each axis to `MIN_BOX_SIZE`.
    ///
    /// Vertical movement (`top`) drives height, horizontal (`left`) drives width.
    #[must_use]
    pub fn grown_by(self, delta: Position) -> Size {
        Size {
            width: (self.width + delta.left).max(MIN_BOX_SIZE),
            height: (self.height + delta.top).max(MIN_BOX_SIZE),
        }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self { width: DEFAULT_BOX_SIZE, height: DEFAULT_BOX_SIZE }
    }
}

/// One box as read from (or written to) the shared list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxRecord {
    pub position: Position,
    pub size: Size,
    pub color: PaletteColor,
}

impl BoxRecord {
    /// A default-sized box at `position`.
    #[must_use]
    pub fn new(position: Position, color: PaletteColor) -> Self {
        Self { position, size: Size::default(), color }
    }
}

/// Field of a box a local write can target. Color is fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxField {
    Position,
    Size,
}

/// Notification sent to subscribers after the list changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// A record was appended or inserted at `index`.
    Inserted { index: usize },
    /// The record at `index` was removed; later records shifted down by one.
    Deleted { index: usize },
    /// One field of the record at `index` was overwritten locally.
    Updated { index: usize, field: BoxField },
    /// Remote changes were merged; any record may differ.
    Merged,
}

#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("box index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("box {index} has a malformed `{field}` field")]
    Schema { index: usize, field: &'static str },
    #[error("document has no `boxes` list")]
    MissingCollection,
    #[error("automerge error: {0}")]
    Automerge(#[from] AutomergeError),
}

impl ErrorCode for DocError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::IndexOutOfRange { .. } => "E_INDEX_OUT_OF_RANGE",
            Self::Schema { .. } => "E_SCHEMA",
            Self::MissingCollection => "E_MISSING_COLLECTION",
            Self::Automerge(_) => "E_AUTOMERGE",
        }
    }
}

/// The replicated, ordered box list.
pub struct CanvasDoc {
    doc: AutoCommit,
    boxes: ObjId,
    subscribers: Vec<mpsc::Sender<Change>>,
}

impl CanvasDoc {
    /// Create a fresh document with an empty box list.
    ///
    /// Peers must share one genesis: join an existing canvas with `fork` or
    /// `load`, never by creating a second genesis.
    ///
    /// # Errors
    ///
    /// Returns an automerge error if the list cannot be created.
    pub fn genesis() -> Result<Self, DocError> {
        let mut doc = AutoCommit::new();
        let boxes = doc.put_object(ROOT, BOXES_KEY, ObjType::List)?;
        Ok(Self { doc, boxes, subscribers: Vec::new() })
    }

    /// Load a document from a saved snapshot.
    ///
    /// # Errors
    ///
    /// Fails if the bytes are not an automerge document or lack the box list.
    pub fn load(bytes: &[u8]) -> Result<Self, DocError> {
        let doc = AutoCommit::load(bytes)?;
        let boxes = match doc.get(ROOT, BOXES_KEY)? {
            Some((Value::Object(ObjType::List), id)) => id,
            _ => return Err(DocError::MissingCollection),
        };
        Ok(Self { doc, boxes, subscribers: Vec::new() })
    }

    /// A new replica of this document with its own actor and no subscribers.
    #[must_use]
    pub fn fork(&mut self) -> Self {
        Self { doc: self.doc.fork(), boxes: self.boxes.clone(), subscribers: Vec::new() }
    }

    /// Full snapshot of the document.
    ///
    /// Saves a fork so the incremental update cursor used by `encode_update`
    /// is left where it was.
    #[must_use]
    pub fn save(&mut self) -> Vec<u8> {
        self.doc.fork().save()
    }

    /// Changes made since the previous call, for relaying to peers.
    #[must_use]
    pub fn encode_update(&mut self) -> Vec<u8> {
        self.doc.save_incremental()
    }

    /// Apply bytes produced by a peer's `encode_update` (or `save`).
    ///
    /// # Errors
    ///
    /// Returns an automerge error if the bytes cannot be decoded.
    pub fn apply_update(&mut self, bytes: &[u8]) -> Result<(), DocError> {
        let applied = self.doc.load_incremental(bytes)?;
        if applied > 0 {
            self.notify(Change::Merged);
        }
        Ok(())
    }

    /// Merge every change `other` has that this replica lacks.
    ///
    /// # Errors
    ///
    /// Returns an automerge error if the change graphs cannot be combined.
    pub fn merge(&mut self, other: &mut CanvasDoc) -> Result<(), DocError> {
        let merged = self.doc.merge(&mut other.doc)?;
        if !merged.is_empty() {
            self.notify(Change::Merged);
        }
        Ok(())
    }

    /// Register an observer. Dropped receivers are pruned on the next change.
    pub fn subscribe(&mut self) -> mpsc::Receiver<Change> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Number of boxes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.doc.length(&self.boxes)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the record at `index`.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` past the end; `Schema` if the entry is malformed.
    pub fn get(&self, index: usize) -> Result<BoxRecord, DocError> {
        let obj = self.box_obj(index)?;
        Ok(BoxRecord {
            position: self.read_position(index, &obj)?,
            size: self.read_size(index, &obj)?,
            color: self.read_color(index, &obj)?,
        })
    }

    /// Read every record in order.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed entry.
    pub fn records(&self) -> Result<Vec<BoxRecord>, DocError> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }

    /// Current position of the box at `index`.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` or `Schema`.
    pub fn position(&self, index: usize) -> Result<Position, DocError> {
        let obj = self.box_obj(index)?;
        self.read_position(index, &obj)
    }

    /// Current size of the box at `index`.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` or `Schema`.
    pub fn size(&self, index: usize) -> Result<Size, DocError> {
        let obj = self.box_obj(index)?;
        self.read_size(index, &obj)
    }

    /// Current color of the box at `index`.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` or `Schema`.
    pub fn color(&self, index: usize) -> Result<PaletteColor, DocError> {
        let obj = self.box_obj(index)?;
        self.read_color(index, &obj)
    }

    /// Overwrite the position of the box at `index`.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange`, `Schema`, or an automerge write error.
    pub fn set_position(&mut self, index: usize, position: Position) -> Result<(), DocError> {
        let obj = self.box_obj(index)?;
        let map = self.child_map(index, &obj, POSITION_KEY)?;
        self.doc.put(&map, "top", position.top)?;
        self.doc.put(&map, "left", position.left)?;
        self.notify(Change::Updated { index, field: BoxField::Position });
        Ok(())
    }

    /// Overwrite the size of the box at `index`.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange`, `Schema`, or an automerge write error.
    pub fn set_size(&mut self, index: usize, size: Size) -> Result<(), DocError> {
        let obj = self.box_obj(index)?;
        let map = self.child_map(index, &obj, SIZE_KEY)?;
        self.doc.put(&map, "width", size.width)?;
        self.doc.put(&map, "height", size.height)?;
        self.notify(Change::Updated { index, field: BoxField::Size });
        Ok(())
    }

    /// Append a record; returns its index.
    ///
    /// # Errors
    ///
    /// Returns an automerge write error.
    pub fn push(&mut self, record: BoxRecord) -> Result<usize, DocError> {
        let index = self.len();
        let obj = self.doc.insert_object(&self.boxes, index, ObjType::Map)?;

        let position = self.doc.put_object(&obj, POSITION_KEY, ObjType::Map)?;
        self.doc.put(&position, "top", record.position.top)?;
        self.doc.put(&position, "left", record.position.left)?;

        let size = self.doc.put_object(&obj, SIZE_KEY, ObjType::Map)?;
        self.doc.put(&size, "width", record.size.width)?;
        self.doc.put(&size, "height", record.size.height)?;

        self.doc.put(&obj, COLOR_KEY, record.color.name())?;

        self.notify(Change::Inserted { index });
        Ok(index)
    }

    /// Remove the record at `index`.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` past the end, or an automerge write error.
    pub fn delete(&mut self, index: usize) -> Result<(), DocError> {
        let len = self.len();
        if index >= len {
            return Err(DocError::IndexOutOfRange { index, len });
        }
        self.doc.delete(&self.boxes, index)?;
        self.notify(Change::Deleted { index });
        Ok(())
    }

    // --- Boundary reads ---

    fn box_obj(&self, index: usize) -> Result<ObjId, DocError> {
        let len = self.len();
        if index >= len {
            return Err(DocError::IndexOutOfRange { index, len });
        }
        match self.doc.get(&self.boxes, index)? {
            Some((Value::Object(ObjType::Map), id)) => Ok(id),
            _ => Err(DocError::Schema { index, field: "box" }),
        }
    }

    fn child_map(&self, index: usize, obj: &ObjId, key: &'static str) -> Result<ObjId, DocError> {
        match self.doc.get(obj, key)? {
            Some((Value::Object(ObjType::Map), id)) => Ok(id),
            _ => Err(DocError::Schema { index, field: key }),
        }
    }

    fn read_f64(&self, index: usize, obj: &ObjId, key: &'static str) -> Result<f64, DocError> {
        let number = match self.doc.get(obj, key)? {
            Some((Value::Scalar(scalar), _)) => scalar_to_f64(&scalar),
            _ => None,
        };
        number.ok_or(DocError::Schema { index, field: key })
    }

    fn read_position(&self, index: usize, obj: &ObjId) -> Result<Position, DocError> {
        let map = self.child_map(index, obj, POSITION_KEY)?;
        Ok(Position { top: self.read_f64(index, &map, "top")?, left: self.read_f64(index, &map, "left")? })
    }

    fn read_size(&self, index: usize, obj: &ObjId) -> Result<Size, DocError> {
        let map = self.child_map(index, obj, SIZE_KEY)?;
        Ok(Size { width: self.read_f64(index, &map, "width")?, height: self.read_f64(index, &map, "height")? })
    }

    fn read_color(&self, index: usize, obj: &ObjId) -> Result<PaletteColor, DocError> {
        let color = match self.doc.get(obj, COLOR_KEY)? {
            Some((Value::Scalar(scalar), _)) => match &*scalar {
                ScalarValue::Str(name) => name.parse::<PaletteColor>().map_err(|_| ()),
                _ => Err(()),
            },
            _ => Err(()),
        };
        color.map_err(|()| DocError::Schema { index, field: COLOR_KEY })
    }

    fn notify(&mut self, change: Change) {
        self.subscribers.retain(|tx| tx.send(change).is_ok());
    }
}

#[cfg(test)]
impl CanvasDoc {
    /// Overwrite a box's color with an arbitrary string, bypassing validation.
    pub(crate) fn corrupt_color(&mut self, index: usize, raw: &str) -> Result<(), DocError> {
        let obj = self.box_obj(index)?;
        self.doc.put(&obj, COLOR_KEY, raw)?;
        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
fn scalar_to_f64(scalar: &ScalarValue) -> Option<f64> {
    match scalar {
        ScalarValue::F64(f) => Some(*f),
        ScalarValue::Int(i) => Some(*i as f64),
        ScalarValue::Uint(u) => Some(*u as f64),
        _ => None,
    }
}
