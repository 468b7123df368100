//! Speech Synthesis Client: one dialogue turn in, one playable segment out.
use crate::cooldown::CooldownGate;
use crate::transcode::{self, TranscodeError};
use livecast_domain::{AudioSegment, DialogueTurn, PcmAudio, SpeechSynthesizer, SynthesisError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further attempt.
    pub backoff: Duration,
    pub timeout: Duration,
}

/// Wraps a [`SpeechSynthesizer`] with the room's cooldown gate, bounded
/// retries and conversion to the output device format.
#[derive(Clone)]
pub struct SpeechClient {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    cooldown: Arc<CooldownGate>,
    device_rate: u32,
    retry: RetryPolicy,
}

impl SpeechClient {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        cooldown: Arc<CooldownGate>,
        device_rate: u32,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            synthesizer,
            cooldown,
            device_rate,
            retry,
        }
    }

    /// Synthesize `turn` into a segment tagged with `source_turn_index`.
    ///
    /// A provider rate limit trips the cooldown gate before it is returned;
    /// while the gate is closed no call is made at all.
    pub async fn synthesize(
        &self,
        turn: &DialogueTurn,
        source_turn_index: i64,
    ) -> Result<AudioSegment, SynthesisError> {
        if turn.text.trim().is_empty() {
            return Err(SynthesisError::NoAudioProduced);
        }

        let mut attempt = 0;
        let audio = loop {
            if let Some(remaining) = self.cooldown.remaining() {
                return Err(SynthesisError::RateLimited {
                    retry_after: Some(remaining),
                });
            }

            match self.call(turn).await {
                Ok(audio) => break audio,
                Err(e) if e.is_rate_limited() => {
                    let pause = self.cooldown.trip(e.retry_after());
                    warn!(turn = source_turn_index, ?pause, "speech synthesizer rate limited");
                    return Err(e);
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.backoff * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    warn!(turn = source_turn_index, attempt, error = %e, "retrying synthesis");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        };

        let audio = transcode::to_device_format(&audio, self.device_rate).map_err(|e| {
            warn!(turn = source_turn_index, error = %e, "synthesized audio is not playable");
            match e {
                TranscodeError::Empty | TranscodeError::Layout(_) => SynthesisError::NoAudioProduced,
                TranscodeError::Resample(reason) => SynthesisError::Transient(reason),
            }
        })?;
        debug!(
            turn = source_turn_index,
            speaker = %turn.speaker_name,
            duration_ms = audio.duration().as_millis() as u64,
            "turn synthesized"
        );
        Ok(AudioSegment::new(audio, source_turn_index, turn.clone()))
    }

    async fn call(&self, turn: &DialogueTurn) -> Result<PcmAudio, SynthesisError> {
        tokio::time::timeout(
            self.retry.timeout,
            self.synthesizer.synthesize(&turn.text, &turn.voice_id),
        )
        .await
        .map_err(|_| SynthesisError::Timeout)?
    }
}
