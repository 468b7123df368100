//! Narrow contracts for the external services a broadcast depends on.
//!
//! Every trait is object safe and `Send + Sync` so one engine can hold
//! `Arc<dyn Trait>` handles and share them between its tasks.

use crate::comment::Comment;
use crate::dialogue::{DialogueRequest, DialogueTurn};
use crate::error::{GenerationError, StoreError, SynthesisError, TransportError};
use crate::pcm_audio::PcmAudio;
use crate::room_id::RoomId;
use crate::voice_id::VoiceId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Language-model dialogue generator.
#[async_trait]
pub trait DialogueGenerator: Send + Sync {
    /// Produce `request.turn_count` ordered turns.
    ///
    /// A response that cannot be parsed as a turn list is a full failure
    /// (`MalformedOutput`), never a partial result.
    async fn generate(&self, request: &DialogueRequest)
    -> Result<Vec<DialogueTurn>, GenerationError>;
}

/// Text-to-speech synthesizer.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` in `voice`, returning decoded samples in whatever
    /// rate and channel layout the provider produced.
    async fn synthesize(&self, text: &str, voice: &VoiceId) -> Result<PcmAudio, SynthesisError>;
}

/// Durable room and comment store.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Comments created strictly after `since`, oldest first.
    async fn unprocessed_comments(
        &self,
        room: &RoomId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Comment>, StoreError>;

    async fn advance_checkpoint(&self, room: &RoomId, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn room_topic_prompt(&self, room: &RoomId) -> Result<Option<String>, StoreError>;

    /// Last persisted checkpoint, if any.
    async fn load_checkpoint(&self, room: &RoomId) -> Result<Option<DateTime<Utc>>, StoreError>;
}

/// Description of the local audio signal an [`AudioOutput`] produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAudioSignal {
    pub name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Opaque handle to a published track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackHandle {
    pub sid: String,
}

/// Real-time media relay.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    async fn publish(&self, signal: &LocalAudioSignal) -> Result<TrackHandle, TransportError>;

    async fn unpublish(&self, track: TrackHandle) -> Result<(), TransportError>;

    /// Remote participants currently in the room.
    fn participant_count(&self) -> usize;
}

/// The audio device the playback driver drives.
#[async_trait]
pub trait AudioOutput: Send {
    /// Sample rate `play` expects, mono.
    fn sample_rate(&self) -> u32;

    async fn open(&mut self) -> Result<LocalAudioSignal, TransportError>;

    /// Play `audio` to completion. Resolves when the segment has finished.
    async fn play(&mut self, audio: &PcmAudio) -> Result<(), TransportError>;

    async fn close(&mut self);
}
