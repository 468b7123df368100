//! # Livecast Domain
//!
//! Shared domain objects for the livecast broadcast engine.
//!
//! This crate holds the value types, the failure taxonomy and the
//! collaborator traits shared between the engine and the provider packages,
//! so providers can be swapped without the engine depending on any of them.

pub mod collaborators;
pub mod comment;
pub mod dialogue;
pub mod error;
pub mod pcm_audio;
pub mod room_id;
pub mod speaker;
pub mod voice_id;

pub use collaborators::{
    AudioOutput, CommentStore, DialogueGenerator, LocalAudioSignal, MediaTransport,
    SpeechSynthesizer, TrackHandle,
};
pub use comment::{BatchTrigger, Comment, CommentBatch};
pub use dialogue::{DialogueRequest, DialogueTurn};
pub use error::{BroadcastError, GenerationError, StoreError, SynthesisError, TransportError};
pub use pcm_audio::{AudioSegment, PcmAudio};
pub use room_id::RoomId;
pub use speaker::{HostLineup, HostSpeaker, SpeakerSlot};
pub use voice_id::VoiceId;

/// Convenience re-exports for provider and engine crates.
pub mod prelude {
    pub use crate::collaborators::*;
    pub use crate::comment::{BatchTrigger, Comment, CommentBatch};
    pub use crate::dialogue::{DialogueRequest, DialogueTurn};
    pub use crate::error::*;
    pub use crate::pcm_audio::{AudioSegment, PcmAudio};
    pub use crate::room_id::RoomId;
    pub use crate::speaker::{HostLineup, HostSpeaker, SpeakerSlot};
    pub use crate::voice_id::VoiceId;
}
