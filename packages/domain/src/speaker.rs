//! The two fixed host roles of a show and the voices behind them.

use crate::voice_id::VoiceId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two fixed speaker roles in the dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeakerSlot {
    A,
    B,
}

impl SpeakerSlot {
    /// Positional slot used when a model's speaker label cannot be resolved:
    /// even index is slot A, odd index is slot B.
    pub const fn for_position(index: usize) -> Self {
        if index % 2 == 0 { Self::A } else { Self::B }
    }

    /// The other host.
    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

impl fmt::Display for SpeakerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A configured host: display name plus synthesizer voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSpeaker {
    pub name: String,
    pub voice_id: VoiceId,
}

impl HostSpeaker {
    pub fn new(name: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            voice_id: VoiceId::new(voice_id),
        }
    }
}

/// Both hosts of a show, indexed by [`SpeakerSlot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostLineup {
    pub a: HostSpeaker,
    pub b: HostSpeaker,
}

impl HostLineup {
    pub fn new(a: HostSpeaker, b: HostSpeaker) -> Self {
        Self { a, b }
    }

    pub fn host(&self, slot: SpeakerSlot) -> &HostSpeaker {
        match slot {
            SpeakerSlot::A => &self.a,
            SpeakerSlot::B => &self.b,
        }
    }

    /// Resolve a model-emitted speaker label to a slot.
    ///
    /// Accepts the slot letters (`A`, `B`, `Host A`, `Speaker B`) and the hosts'
    /// configured names, case-insensitively. Returns `None` when the label is
    /// empty, unknown, or matches both hosts.
    pub fn slot_for_label(&self, label: &str) -> Option<SpeakerSlot> {
        let normalized = label.trim().trim_end_matches(':').trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }

        let stripped = normalized
            .strip_prefix("host ")
            .or_else(|| normalized.strip_prefix("speaker "))
            .unwrap_or(&normalized);
        match stripped {
            "a" | "1" => return Some(SpeakerSlot::A),
            "b" | "2" => return Some(SpeakerSlot::B),
            _ => {}
        }

        let matches_a = self.a.name.to_lowercase() == normalized;
        let matches_b = self.b.name.to_lowercase() == normalized;
        match (matches_a, matches_b) {
            (true, false) => Some(SpeakerSlot::A),
            (false, true) => Some(SpeakerSlot::B),
            _ => None,
        }
    }
}

impl Default for HostLineup {
    fn default() -> Self {
        Self {
            a: HostSpeaker::new("Alex", "21m00Tcm4TlvDq8ikWAM"),
            b: HostSpeaker::new("Jordan", "pNInz6obpgDQGcFmaJgB"),
        }
    }
}
