//! Room relay: fan out document updates between the peers of one canvas.
//!
//! DESIGN
//! ======
//! A `Room` is a named set of members, each reached through a bounded
//! `mpsc` sender. `broadcast` delivers a frame to every member except its
//! sender. The room also owns the shared `Awareness`, so presence and
//! document traffic are scoped to the same set of peers.
//!
//! A `RoomMember` bundles a peer's id, its receive queue, and the room. It
//! turns a projection's pending local changes into one frame (`publish`) and
//! folds queued remote frames back into the projection (`sync`).
//!
//! ERROR HANDLING
//! ==============
//! Delivery is best-effort: a member whose queue is full misses the frame,
//! which is logged and otherwise ignored. Later changes that depend on a
//! missed one stay pending inside automerge until the gap is filled, e.g. by
//! applying a full `save` snapshot through `apply_update`. A member dropped
//! without `leave` closes its queue and is pruned on the next `join` or
//! `broadcast`.

#[cfg(test)]
#[path = "room_test.rs"]
mod room_test;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::consts::ROOM_CHANNEL_CAPACITY;
use crate::doc::DocError;
use crate::error::ErrorCode;
use crate::presence::{Awareness, PeerId};
use crate::projection::Projection;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("peer already in room: {0}")]
    AlreadyJoined(PeerId),
    #[error("peer not in room: {0}")]
    NotJoined(PeerId),
    #[error(transparent)]
    Doc(#[from] DocError),
}

impl ErrorCode for RoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyJoined(_) => "E_ALREADY_JOINED",
            Self::NotJoined(_) => "E_NOT_JOINED",
            Self::Doc(e) => e.error_code(),
        }
    }
}

/// One relayed document update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomFrame {
    pub from: PeerId,
    /// Bytes from `CanvasDoc::encode_update`.
    pub update: Vec<u8>,
}

#[derive(Clone)]
pub struct Room {
    name: Arc<str>,
    awareness: Awareness,
    clients: Arc<RwLock<HashMap<PeerId, mpsc::Sender<RoomFrame>>>>,
}

// =============================================================================
// ROOM
// =============================================================================

impl Room {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self { name: Arc::from(name), awareness: Awareness::new(), clients: Arc::default() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Presence state shared by this room's peers.
    #[must_use]
    pub fn awareness(&self) -> &Awareness {
        &self.awareness
    }

    /// Add a peer and return its membership.
    ///
    /// # Errors
    ///
    /// `AlreadyJoined` if `peer_id` is already a member.
    pub async fn join(&self, peer_id: PeerId) -> Result<RoomMember, RoomError> {
        let (tx, rx) = mpsc::channel(ROOM_CHANNEL_CAPACITY);
        let mut clients = self.clients.write().await;
        self.prune_closed(&mut clients);
        if clients.contains_key(&peer_id) {
            return Err(RoomError::AlreadyJoined(peer_id));
        }
        clients.insert(peer_id, tx);
        info!(room = %self.name, %peer_id, clients = clients.len(), "peer joined room");
        Ok(RoomMember { peer_id, room: self.clone(), rx })
    }

    /// Remove a peer. Unknown peers are ignored.
    pub async fn part(&self, peer_id: PeerId) {
        let mut clients = self.clients.write().await;
        if clients.remove(&peer_id).is_some() {
            info!(room = %self.name, %peer_id, remaining = clients.len(), "peer left room");
        }
    }

    /// Members whose membership is still alive.
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.values().filter(|tx| !tx.is_closed()).count()
    }

    /// Send `frame` to every member except its sender; returns how many
    /// members it reached.
    ///
    /// # Errors
    ///
    /// `NotJoined` if the sender is not a member.
    pub async fn broadcast(&self, frame: &RoomFrame) -> Result<usize, RoomError> {
        let mut clients = self.clients.write().await;
        self.prune_closed(&mut clients);
        if !clients.contains_key(&frame.from) {
            return Err(RoomError::NotJoined(frame.from));
        }

        let mut delivered = 0;
        for (peer_id, tx) in clients.iter() {
            if *peer_id == frame.from {
                continue;
            }
            match tx.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(room = %self.name, %peer_id, error = %e, "dropped frame"),
            }
        }
        Ok(delivered)
    }

    /// Drop members whose `RoomMember` was dropped without `leave`.
    fn prune_closed(&self, clients: &mut HashMap<PeerId, mpsc::Sender<RoomFrame>>) {
        clients.retain(|peer_id, tx| {
            let open = !tx.is_closed();
            if !open {
                info!(room = %self.name, %peer_id, "pruned dropped peer");
            }
            open
        });
    }
}

// =============================================================================
// MEMBER
// =============================================================================

/// A peer's membership in a room.
pub struct RoomMember {
    peer_id: PeerId,
    room: Room,
    rx: mpsc::Receiver<RoomFrame>,
}

impl RoomMember {
    #[must_use]
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    #[must_use]
    pub fn room(&self) -> &Room {
        &self.room
    }

    /// Relay local changes made since the last publish.
    ///
    /// Returns the number of peers reached; zero when nothing changed.
    ///
    /// # Errors
    ///
    /// `NotJoined` if this member already left.
    pub async fn publish(&self, projection: &mut Projection) -> Result<usize, RoomError> {
        let update = projection.encode_update();
        if update.is_empty() {
            return Ok(0);
        }
        let bytes = update.len();
        let delivered = self.room.broadcast(&RoomFrame { from: self.peer_id, update }).await?;
        debug!(peer_id = %self.peer_id, bytes, delivered, "published update");
        Ok(delivered)
    }

    /// Apply every queued remote frame; returns how many were applied.
    ///
    /// # Errors
    ///
    /// Stops at the first frame that fails to decode.
    pub fn sync(&mut self, projection: &mut Projection) -> Result<usize, RoomError> {
        let mut applied = 0;
        while let Ok(frame) = self.rx.try_recv() {
            projection.apply_update(&frame.update)?;
            applied += 1;
        }
        if applied > 0 {
            debug!(peer_id = %self.peer_id, applied, boxes = projection.len(), "synced remote updates");
        }
        Ok(applied)
    }

    /// Wait for the next remote frame and apply it.
    ///
    /// Returns `false` once the room dropped this member.
    ///
    /// # Errors
    ///
    /// Fails if the frame cannot be decoded.
    pub async fn recv(&mut self, projection: &mut Projection) -> Result<bool, RoomError> {
        let Some(frame) = self.rx.recv().await else {
            return Ok(false);
        };
        projection.apply_update(&frame.update)?;
        Ok(true)
    }

    /// Leave the room.
    pub async fn leave(self) {
        self.room.part(self.peer_id).await;
    }
}
