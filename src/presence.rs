//! Presence: who is connected, who is logged in, and where their cursors are.
//!
//! DESIGN
//! ======
//! `Awareness` is the room-wide ephemeral state, shared by cloning. Each peer
//! holds one `PresenceHandle`, which owns that peer's entry: it is created on
//! connect, written by `login` and `set_local_cursor`, and removed when the
//! handle is dropped. Nothing here is persisted or merged into the document.
//!
//! Cursor broadcasts are best-effort and unacknowledged; the last write per
//! peer wins.

#[cfg(test)]
#[path = "presence_test.rs"]
mod presence_test;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::doc::Position;
use crate::palette::PaletteColor;

/// Connection-scoped peer identifier.
pub type PeerId = Uuid;

/// Display identity assigned at login. Immutable for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub color: PaletteColor,
}

/// Another logged-in peer as seen from the local session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePeer {
    pub identity: Identity,
    /// Last broadcast cursor position, if the peer has moved its pointer yet.
    pub cursor: Option<Position>,
}

#[derive(Debug, Clone, Default)]
struct PeerState {
    identity: Option<Identity>,
    cursor: Option<Position>,
}

#[derive(Default)]
struct AwarenessInner {
    peers: HashMap<PeerId, PeerState>,
    /// Bumped on every join, login, cursor move, and leave.
    version: u64,
}

/// Room-wide ephemeral state shared by every connected peer.
#[derive(Clone, Default)]
pub struct Awareness {
    inner: Arc<Mutex<AwarenessInner>>,
}

impl Awareness {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new peer. Its identity is assigned on `login`.
    #[must_use]
    pub fn connect(&self) -> PresenceHandle {
        self.register(None)
    }

    /// Register a new peer that will log in under `name`.
    #[must_use]
    pub fn connect_as(&self, name: impl Into<String>) -> PresenceHandle {
        self.register(Some(name.into()))
    }

    /// Number of connected peers, logged in or not.
    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.lock().peers.len()
    }

    /// Changes whenever any peer's presence changes.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    fn register(&self, display_name: Option<String>) -> PresenceHandle {
        let peer_id = Uuid::new_v4();
        {
            let mut inner = self.lock();
            inner.peers.insert(peer_id, PeerState::default());
            inner.version += 1;
        }
        info!(%peer_id, "peer connected");
        PresenceHandle { peer_id, awareness: self.clone(), local_user: None, display_name }
    }

    fn lock(&self) -> MutexGuard<'_, AwarenessInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One peer's view of, and write access to, the shared awareness state.
pub struct PresenceHandle {
    peer_id: PeerId,
    awareness: Awareness,
    local_user: Option<Identity>,
    display_name: Option<String>,
}

impl PresenceHandle {
    #[must_use]
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// Assign the local identity. Idempotent: later calls return the
    /// identity assigned by the first.
    pub fn login(&mut self) -> Identity {
        if let Some(identity) = &self.local_user {
            return identity.clone();
        }

        let name = self.display_name.clone().unwrap_or_else(|| guest_name(self.peer_id));
        let identity = Identity { name, color: PaletteColor::random() };
        {
            let mut inner = self.awareness.lock();
            inner.peers.entry(self.peer_id).or_default().identity = Some(identity.clone());
            inner.version += 1;
        }
        info!(peer_id = %self.peer_id, name = %identity.name, color = %identity.color, "logged in");

        self.local_user = Some(identity.clone());
        identity
    }

    /// The local identity, once logged in.
    #[must_use]
    pub fn local_user(&self) -> Option<&Identity> {
        self.local_user.as_ref()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.local_user.is_some()
    }

    /// Broadcast the local cursor position to the room.
    pub fn set_local_cursor(&self, position: Position) {
        let mut inner = self.awareness.lock();
        inner.peers.entry(self.peer_id).or_default().cursor = Some(position);
        inner.version += 1;
    }

    /// Every other logged-in peer, keyed by peer id.
    #[must_use]
    pub fn remote_peers(&self) -> HashMap<PeerId, RemotePeer> {
        let inner = self.awareness.lock();
        inner
            .peers
            .iter()
            .filter(|(id, _)| **id != self.peer_id)
            .filter_map(|(id, state)| {
                let identity = state.identity.clone()?;
                Some((*id, RemotePeer { identity, cursor: state.cursor }))
            })
            .collect()
    }
}

impl Drop for PresenceHandle {
    fn drop(&mut self) {
        let mut inner = self.awareness.lock();
        inner.peers.remove(&self.peer_id);
        inner.version += 1;
        drop(inner);
        info!(peer_id = %self.peer_id, "peer disconnected");
    }
}

fn guest_name(peer_id: PeerId) -> String {
    format!("guest-{:08x}", peer_id.as_fields().0)
}
