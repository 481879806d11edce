//! Demo binary: a scripted multi-peer session on one shared canvas.
//!
//! Loads configuration, opens the room and snapshot, drives every simulated
//! peer through the gesture engine, relays updates until all replicas agree,
//! flushes the snapshot, and prints the converged canvas as JSON.

use std::process::ExitCode;

use serde::Serialize;
use tracing::{error, info, warn};

use boxboard::config::{CanvasConfig, ConfigError};
use boxboard::doc::{BoxRecord, Position};
use boxboard::engine::CanvasEngine;
use boxboard::error::ErrorCode;
use boxboard::input::{BoxPointerDown, GestureKind};
use boxboard::persistence::{PersistenceError, SnapshotStore, spawn_flush_task};
use boxboard::presence::Identity;
use boxboard::projection::Projection;
use boxboard::room::{Room, RoomError, RoomMember};

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Room(#[from] RoomError),
    #[error("encode output: {0}")]
    Json(#[from] serde_json::Error),
}

impl ErrorCode for DemoError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Persistence(e) => e.error_code(),
            Self::Room(e) => e.error_code(),
            Self::Json(_) => "E_JSON",
        }
    }
}

struct Peer {
    engine: CanvasEngine,
    member: RoomMember,
}

#[derive(Serialize)]
struct Summary<'a> {
    room: &'a str,
    peers: Vec<Identity>,
    converged: bool,
    boxes: &'a [BoxRecord],
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.error_code(), error = %e, "demo failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), DemoError> {
    let config = CanvasConfig::from_env()?;
    let room = Room::new(&config.room);
    let store = SnapshotStore::new(&config.snapshot_path);
    let mut host = store.load_or_genesis().await?;
    let flush = spawn_flush_task(store.clone(), config.flush_interval);

    // PHASE: JOIN
    // WHY: every replica must descend from the same genesis.
    let mut docs = (1..config.demo_peers).map(|_| host.fork()).collect::<Vec<_>>();
    docs.insert(0, host);

    let mut peers = Vec::with_capacity(docs.len());
    for (i, doc) in docs.into_iter().enumerate() {
        let presence = match (i, &config.user_name) {
            (0, Some(name)) => room.awareness().connect_as(name.clone()),
            _ => room.awareness().connect(),
        };
        let mut engine = CanvasEngine::new(Projection::new(doc), presence);
        let identity = engine.login();
        let member = room.join(engine.peer_id()).await?;
        info!(peer = i, name = %identity.name, color = %identity.color, "peer ready");
        peers.push(Peer { engine, member });
    }

    // PHASE: CREATE
    let target = peers.first().map_or(0, |p| p.engine.boxes().len());
    let mut offset = 0.0;
    for peer in &mut peers {
        peer.engine.on_draw_pointer_up(Position::new(40.0 + offset, 60.0 + offset));
        offset += 30.0;
    }
    relay(&mut peers).await?;

    // PHASE: CONCURRENT EDITS
    // WHY: a move and a resize on the same box before either is relayed.
    if let Some(first) = peers.first_mut() {
        drag(&mut first.engine, GestureKind::Move, target, Position::new(5.0, 5.0));
    }
    if peers.len() > 1 {
        if let Some(last) = peers.last_mut() {
            drag(&mut last.engine, GestureKind::Resize, target, Position::new(10.0, 20.0));
        }
    }
    relay(&mut peers).await?;

    // PHASE: DELETE
    if peers.len() > 1 {
        if let Some(last) = peers.last_mut() {
            let index = last.engine.boxes().len().saturating_sub(1);
            last.engine.on_box_delete(index);
        }
        relay(&mut peers).await?;
    }

    let converged = peers.windows(2).all(|pair| pair[0].engine.boxes() == pair[1].engine.boxes());
    if !converged {
        warn!("replicas disagree after relay");
    }

    let Some(first) = peers.first_mut() else {
        flush.abort();
        return Ok(());
    };
    store.stage(first.engine.projection_mut().save());
    store.flush().await?;
    flush.abort();

    let identities = peers.iter().filter_map(|p| p.engine.local_user().cloned()).collect();
    let summary = Summary { room: room.name(), peers: identities, converged, boxes: peers[0].engine.boxes() };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    for peer in peers {
        peer.member.leave().await;
    }
    Ok(())
}

/// Press on box `index`, drag by `delta`, release.
fn drag(engine: &mut CanvasEngine, kind: GestureKind, index: usize, delta: Position) {
    let start = Position::new(0.0, 0.0);
    engine.on_box_pointer_down(BoxPointerDown { kind, index, position: start });
    let end = start.translated(delta);
    engine.on_move_cursor(end);
    engine.on_draw_pointer_up(end);
}

/// Publish every peer's pending changes, then apply what each received.
async fn relay(peers: &mut [Peer]) -> Result<(), DemoError> {
    for peer in peers.iter_mut() {
        peer.member.publish(peer.engine.projection_mut()).await?;
    }
    for peer in peers.iter_mut() {
        peer.member.sync(peer.engine.projection_mut())?;
    }
    Ok(())
}
