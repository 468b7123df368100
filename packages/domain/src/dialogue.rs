//! Dialogue turns and the requests that produce them.

use crate::comment::Comment;
use crate::speaker::{HostSpeaker, SpeakerSlot};
use crate::voice_id::VoiceId;
use serde::{Deserialize, Serialize};

/// One line of dialogue attributed to one of the two hosts.
///
/// Immutable once produced by the dialogue generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub speaker_slot: SpeakerSlot,
    pub speaker_name: String,
    pub text: String,
    pub voice_id: VoiceId,
}

impl DialogueTurn {
    /// Build a turn spoken by `host` in `slot`.
    pub fn spoken_by(slot: SpeakerSlot, host: &HostSpeaker, text: impl Into<String>) -> Self {
        Self {
            speaker_slot: slot,
            speaker_name: host.name.clone(),
            text: text.into(),
            voice_id: host.voice_id.clone(),
        }
    }

    /// `"<speaker>: <text>"`, the form used for prior-context prompts.
    pub fn as_script_line(&self) -> String {
        format!("{}: {}", self.speaker_name, self.text)
    }
}

/// Input to one dialogue generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogueRequest {
    /// Number of turns to produce.
    pub turn_count: usize,
    /// Recent lines of the show, oldest first.
    pub prior_context: Option<String>,
    /// Whether this call answers an audience comment batch.
    pub is_comment_response: bool,
    pub comments: Option<Vec<Comment>>,
    /// Room-level topic configured by the host.
    pub topic_prompt: Option<String>,
}

impl DialogueRequest {
    /// Request continuing the normal flow of the show.
    pub fn continuation(
        turn_count: usize,
        prior_context: Option<String>,
        topic_prompt: Option<String>,
    ) -> Self {
        Self {
            turn_count,
            prior_context,
            is_comment_response: false,
            comments: None,
            topic_prompt,
        }
    }

    /// Request for turns in which the hosts address `comments`.
    pub fn comment_response(
        turn_count: usize,
        prior_context: Option<String>,
        comments: Vec<Comment>,
        topic_prompt: Option<String>,
    ) -> Self {
        Self {
            turn_count,
            prior_context,
            is_comment_response: true,
            comments: Some(comments),
            topic_prompt,
        }
    }
}
