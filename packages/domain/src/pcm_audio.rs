//! Decoded audio samples and the segments built from them.

use crate::dialogue::DialogueTurn;
use std::time::Duration;

/// Interleaved signed 16-bit PCM.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PcmAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmAudio {
    pub fn new(samples: Vec<i16>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn mono(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self::new(samples, sample_rate, 1)
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Audible duration derived from the sample count.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Whether this buffer can be handed to a device running at `sample_rate` mono.
    pub fn is_playable_at(&self, sample_rate: u32) -> bool {
        self.channels == 1 && self.sample_rate == sample_rate && !self.is_empty()
    }
}

/// Synthesized audio for exactly one turn, ready to play.
///
/// Owned by the prefetch buffer until the playback driver dequeues it; never
/// shared or mutated concurrently.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    pub audio: PcmAudio,
    pub speaker_name: String,
    /// Position of the source turn in the turn queue. Negative values mark
    /// comment-response segments.
    pub source_turn_index: i64,
    /// The turn this audio was synthesized from.
    pub turn: DialogueTurn,
}

impl AudioSegment {
    pub fn new(audio: PcmAudio, source_turn_index: i64, turn: DialogueTurn) -> Self {
        Self {
            audio,
            speaker_name: turn.speaker_name.clone(),
            source_turn_index,
            turn,
        }
    }

    pub fn is_comment_response(&self) -> bool {
        self.source_turn_index < 0
    }

    pub fn duration(&self) -> Duration {
        self.audio.duration()
    }
}
