//! Room Registry: exactly one engine per broadcasting room.
use crate::config::EngineConfig;
use crate::events::{BroadcastEvent, BroadcastStatus, StatusBoard};
use crate::orchestrator::{BroadcastEngine, Collaborators};
use livecast_domain::{BroadcastError, RoomId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Observation handle for a running broadcast.
#[derive(Clone)]
pub struct BroadcastHandle {
    room: RoomId,
    board: StatusBoard,
}

impl BroadcastHandle {
    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn status(&self) -> BroadcastStatus {
        self.board.snapshot()
    }

    pub fn watch_status(&self) -> watch::Receiver<BroadcastStatus> {
        self.board.watch()
    }

    pub fn events(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.board.subscribe()
    }
}

struct RunningBroadcast {
    handle: BroadcastHandle,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

#[derive(Clone, Default)]
pub struct BroadcastRegistry {
    rooms: Arc<Mutex<HashMap<RoomId, RunningBroadcast>>>,
}

impl BroadcastRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start broadcasting `room`. Must be called from within a tokio runtime.
    pub fn start(
        &self,
        room: RoomId,
        collaborators: Collaborators,
        config: EngineConfig,
    ) -> Result<BroadcastHandle, BroadcastError> {
        config.validate()?;

        let mut rooms = self.rooms.lock();
        if let Some(running) = rooms.get(&room) {
            if !running.task.is_finished() {
                return Err(BroadcastError::AlreadyBroadcasting(room));
            }
        }

        let board = StatusBoard::new();
        let handle = BroadcastHandle {
            room: room.clone(),
            board: board.clone(),
        };
        let (stop, stop_rx) = watch::channel(false);
        let engine = BroadcastEngine::new(room.clone(), collaborators, config, board);
        let task = tokio::spawn(engine.run(stop_rx));
        info!(room = %room, "broadcast registered");

        rooms.insert(
            room,
            RunningBroadcast {
                handle: handle.clone(),
                stop,
                task,
            },
        );
        Ok(handle)
    }

    /// Stop `room` and wait until playback has halted, the device is released
    /// and the track is withdrawn.
    pub async fn stop(&self, room: &RoomId) -> Result<(), BroadcastError> {
        let running = self
            .rooms
            .lock()
            .remove(room)
            .ok_or_else(|| BroadcastError::NotBroadcasting(room.clone()))?;
        shutdown(room, running).await;
        Ok(())
    }

    pub async fn stop_all(&self) {
        let running: Vec<(RoomId, RunningBroadcast)> = self.rooms.lock().drain().collect();
        for (room, broadcast) in running {
            shutdown(&room, broadcast).await;
        }
    }

    pub fn is_broadcasting(&self, room: &RoomId) -> bool {
        self.rooms
            .lock()
            .get(room)
            .is_some_and(|running| !running.task.is_finished())
    }

    pub fn rooms(&self) -> Vec<RoomId> {
        let mut rooms: Vec<RoomId> = self.rooms.lock().keys().cloned().collect();
        rooms.sort();
        rooms
    }

    pub fn handle(&self, room: &RoomId) -> Option<BroadcastHandle> {
        self.rooms.lock().get(room).map(|running| running.handle.clone())
    }

    pub fn status(&self, room: &RoomId) -> Option<BroadcastStatus> {
        self.rooms.lock().get(room).map(|running| running.handle.status())
    }
}

async fn shutdown(room: &RoomId, running: RunningBroadcast) {
    running.stop.send_replace(true);
    if let Err(e) = running.task.await {
        error!(room = %room, error = %e, "broadcast task failed");
    }
    info!(room = %room, "broadcast unregistered");
}
