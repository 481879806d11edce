//! Reactive projection: a plain, index-addressable view of the shared box list.
//!
//! The projection owns the `CanvasDoc`, subscribes to its change feed once,
//! and keeps `boxes()` equal to the document's current contents. Every write
//! made through the projection refreshes the view before returning; changes
//! that arrive through `merge` or `apply_update` do the same.
//!
//! Refresh is incremental. Local inserts, deletes, and field updates patch
//! only the affected entry (and only the affected field). A remote merge, or
//! more than one change queued between refreshes, is reconciled entry by entry: records that did not change keep their slot
//! untouched. `revision()` moves only when the view actually changed, which
//! is what a renderer keys re-draws on.
//!
//! Reads used for editing (`get`, `position`, `size`) go to the document,
//! never to the cached view, so they always see the latest merged value.

#[cfg(test)]
#[path = "projection_test.rs"]
mod projection_test;

use std::sync::mpsc;

use tracing::{debug, warn};

use crate::doc::{BoxField, BoxRecord, CanvasDoc, Change, DocError, Position, Size};
use crate::error::ErrorCode;

pub struct Projection {
    doc: CanvasDoc,
    changes: mpsc::Receiver<Change>,
    view: Vec<BoxRecord>,
    revision: u64,
}

impl Projection {
    /// Wrap a document and build the initial view.
    #[must_use]
    pub fn new(mut doc: CanvasDoc) -> Self {
        let changes = doc.subscribe();
        let mut projection = Self { doc, changes, view: Vec::new(), revision: 0 };
        if projection.reconcile() {
            projection.revision += 1;
        }
        projection
    }

    // --- Read model ---

    /// The current ordered boxes, for display.
    #[must_use]
    pub fn boxes(&self) -> &[BoxRecord] {
        &self.view
    }

    /// Bumped every time `boxes()` changes.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Length of the underlying collection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.doc.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }

    // --- Fresh reads ---

    /// Read the record at `index` from the document.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` if the box vanished; `Schema` if it is malformed.
    pub fn get(&self, index: usize) -> Result<BoxRecord, DocError> {
        self.doc.get(index)
    }

    /// # Errors
    ///
    /// `IndexOutOfRange` or `Schema`.
    pub fn position(&self, index: usize) -> Result<Position, DocError> {
        self.doc.position(index)
    }

    /// # Errors
    ///
    /// `IndexOutOfRange` or `Schema`.
    pub fn size(&self, index: usize) -> Result<Size, DocError> {
        self.doc.size(index)
    }

    // --- Writes ---

    /// # Errors
    ///
    /// Propagates document errors; the view is untouched on failure.
    pub fn set_position(&mut self, index: usize, position: Position) -> Result<(), DocError> {
        self.doc.set_position(index, position)?;
        self.refresh();
        Ok(())
    }

    /// # Errors
    ///
    /// Propagates document errors; the view is untouched on failure.
    pub fn set_size(&mut self, index: usize, size: Size) -> Result<(), DocError> {
        self.doc.set_size(index, size)?;
        self.refresh();
        Ok(())
    }

    /// Append a record; returns its index.
    ///
    /// # Errors
    ///
    /// Propagates document errors.
    pub fn push(&mut self, record: BoxRecord) -> Result<usize, DocError> {
        let index = self.doc.push(record)?;
        self.refresh();
        Ok(index)
    }

    /// Remove the record at `index`; later records shift down by one.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` past the end.
    pub fn delete(&mut self, index: usize) -> Result<(), DocError> {
        self.doc.delete(index)?;
        self.refresh();
        Ok(())
    }

    // --- Replication ---

    /// Merge a peer replica held in the same process.
    ///
    /// # Errors
    ///
    /// Propagates automerge merge errors.
    pub fn merge(&mut self, other: &mut CanvasDoc) -> Result<(), DocError> {
        self.doc.merge(other)?;
        self.refresh();
        Ok(())
    }

    /// Apply an update relayed from a peer.
    ///
    /// # Errors
    ///
    /// Propagates decode errors.
    pub fn apply_update(&mut self, bytes: &[u8]) -> Result<(), DocError> {
        self.doc.apply_update(bytes)?;
        self.refresh();
        Ok(())
    }

    /// Changes to relay to peers since the previous call.
    #[must_use]
    pub fn encode_update(&mut self) -> Vec<u8> {
        self.doc.encode_update()
    }

    /// Full snapshot for persistence.
    #[must_use]
    pub fn save(&mut self) -> Vec<u8> {
        self.doc.save()
    }

    /// Direct access to the document. Call `refresh` after writing through it.
    pub fn doc_mut(&mut self) -> &mut CanvasDoc {
        &mut self.doc
    }

    /// Apply pending change notifications. Returns whether the view changed.
    pub fn refresh(&mut self) -> bool {
        let pending: Vec<Change> = self.changes.try_iter().collect();
        if pending.is_empty() {
            return false;
        }

        // Each notice is patched against the document's current state, which
        // only matches the state it describes when it is the sole one pending.
        let changed = match pending.as_slice() {
            [change] => self.apply_incremental(*change),
            _ => self.reconcile(),
        };

        if changed {
            self.revision += 1;
        }
        changed
    }

    fn apply_incremental(&mut self, change: Change) -> bool {
        let changed = match self.apply_change(change) {
            Ok(changed) => changed,
            Err(e) => {
                debug!(?change, code = e.error_code(), error = %e, "incremental refresh failed; reconciling");
                return self.reconcile();
            }
        };
        if self.view.len() != self.doc.len() {
            return self.reconcile() || changed;
        }
        changed
    }

    fn apply_change(&mut self, change: Change) -> Result<bool, DocError> {
        match change {
            Change::Inserted { index } => {
                if index > self.view.len() {
                    return Err(DocError::IndexOutOfRange { index, len: self.view.len() });
                }
                let record = self.doc.get(index)?;
                self.view.insert(index, record);
                Ok(true)
            }
            Change::Deleted { index } => {
                if index >= self.view.len() {
                    return Err(DocError::IndexOutOfRange { index, len: self.view.len() });
                }
                self.view.remove(index);
                Ok(true)
            }
            Change::Updated { index, field } => {
                let len = self.view.len();
                match field {
                    BoxField::Position => {
                        let position = self.doc.position(index)?;
                        let entry = self.view.get_mut(index).ok_or(DocError::IndexOutOfRange { index, len })?;
                        let changed = entry.position != position;
                        entry.position = position;
                        Ok(changed)
                    }
                    BoxField::Size => {
                        let size = self.doc.size(index)?;
                        let entry = self.view.get_mut(index).ok_or(DocError::IndexOutOfRange { index, len })?;
                        let changed = entry.size != size;
                        entry.size = size;
                        Ok(changed)
                    }
                }
            }
            Change::Merged => Ok(self.reconcile()),
        }
    }

    /// Bring the whole view in line with the document, slot by slot.
    ///
    /// A malformed entry truncates the view at its index so every visible
    /// slot still addresses the same record in the document.
    fn reconcile(&mut self) -> bool {
        let len = self.doc.len();
        let mut changed = false;

        for index in 0..len {
            let record = match self.doc.get(index) {
                Ok(record) => record,
                Err(e) => {
                    warn!(index, code = e.error_code(), error = %e, "hiding malformed box and its successors");
                    if self.view.len() > index {
                        self.view.truncate(index);
                        changed = true;
                    }
                    return changed;
                }
            };
            match self.view.get_mut(index) {
                Some(slot) if *slot == record => {}
                Some(slot) => {
                    *slot = record;
                    changed = true;
                }
                None => {
                    self.view.push(record);
                    changed = true;
                }
            }
        }

        if self.view.len() > len {
            self.view.truncate(len);
            changed = true;
        }
        changed
    }
}
