//! What a broadcaster UI can observe about a running engine.
use livecast_domain::{RoomId, SpeakerSlot};
use std::time::Duration;
use tokio::sync::{broadcast, watch};

/// Phase of the broadcast orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Idle,
    Initializing,
    Running,
    HandlingComments,
    Stopped,
}

/// State of the playback driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Starting,
    Buffering,
    Speaking,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub speaker_name: String,
    pub speaker_slot: SpeakerSlot,
    pub text: String,
    pub source_turn_index: i64,
}

/// Snapshot of one room's engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastStatus {
    pub phase: EnginePhase,
    pub playback: PlaybackState,
    /// Set while outbound calls are paused after a rate limit.
    pub cooldown_remaining: Option<Duration>,
    pub listener_count: usize,
    pub queued_turns: usize,
    pub buffered_segments: usize,
    pub now_playing: Option<NowPlaying>,
    /// The track has been published and real audio is flowing.
    pub is_live: bool,
}

impl Default for BroadcastStatus {
    fn default() -> Self {
        Self {
            phase: EnginePhase::Idle,
            playback: PlaybackState::Idle,
            cooldown_remaining: None,
            listener_count: 0,
            queued_turns: 0,
            buffered_segments: 0,
            now_playing: None,
            is_live: false,
        }
    }
}

impl BroadcastStatus {
    /// Listeners would hear silence for a reason other than the show ending.
    pub fn is_stalled(&self) -> bool {
        self.playback == PlaybackState::Buffering && self.phase != EnginePhase::Stopped
    }

    pub fn is_cooling_down(&self) -> bool {
        self.cooldown_remaining.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastEvent {
    /// The broadcast track was published.
    Live { room: RoomId },
    SegmentStarted { source_turn_index: i64, speaker_name: String },
    SegmentFinished { source_turn_index: i64 },
    TurnSkipped { source_turn_index: i64, reason: String },
    CommentsDetected { count: usize },
    CommentsAddressed { comments: usize, turns: usize, requeued_turns: usize },
    CommentResponseDiscarded { reason: String },
    CoolingDown { remaining: Duration },
    Resumed,
    CheckpointWriteFailed { reason: String },
    Stopped { room: RoomId },
}

/// Publishes status snapshots and events for one engine.
#[derive(Clone)]
pub struct StatusBoard {
    status: watch::Sender<BroadcastStatus>,
    events: broadcast::Sender<BroadcastEvent>,
}

impl StatusBoard {
    pub fn new() -> Self {
        let (status, _) = watch::channel(BroadcastStatus::default());
        let (events, _) = broadcast::channel(256);
        Self { status, events }
    }

    pub fn update(&self, f: impl FnOnce(&mut BroadcastStatus)) {
        self.status.send_modify(f);
    }

    pub fn snapshot(&self) -> BroadcastStatus {
        self.status.borrow().clone()
    }

    pub fn emit(&self, event: BroadcastEvent) {
        tracing::trace!(?event, "broadcast event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn watch(&self) -> watch::Receiver<BroadcastStatus> {
        self.status.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.events.subscribe()
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}
