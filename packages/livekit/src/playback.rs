use crate::util::{ResultExt as _, ten_ms_frames};
use crate::{NUM_CHANNELS, SAMPLE_RATE};
use async_trait::async_trait;
use livecast_domain::{AudioOutput, LocalAudioSignal, PcmAudio, TransportError};
use livekit::webrtc::{audio_frame::AudioFrame, audio_source::native::NativeAudioSource};
use std::borrow::Cow;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};

/// The broadcast "device": writes 10 ms frames into a native WebRTC audio
/// source at real-time pace.
pub struct NativeSourceOutput {
    source: NativeAudioSource,
    track_name: String,
    pacer: Option<Interval>,
}

impl NativeSourceOutput {
    pub fn new(source: NativeAudioSource, track_name: impl Into<String>) -> Self {
        Self {
            source,
            track_name: track_name.into(),
            pacer: None,
        }
    }
}

#[async_trait]
impl AudioOutput for NativeSourceOutput {
    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    async fn open(&mut self) -> Result<LocalAudioSignal, TransportError> {
        let mut pacer = tokio::time::interval(Duration::from_millis(10));
        pacer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.pacer = Some(pacer);
        Ok(LocalAudioSignal {
            name: self.track_name.clone(),
            sample_rate: SAMPLE_RATE,
            channels: NUM_CHANNELS as u16,
        })
    }

    async fn play(&mut self, audio: &PcmAudio) -> Result<(), TransportError> {
        if !audio.is_playable_at(SAMPLE_RATE) {
            return Err(TransportError::Device(format!(
                "expected mono {SAMPLE_RATE} Hz, got {} channel(s) at {} Hz",
                audio.channels, audio.sample_rate
            )));
        }
        let pacer = self
            .pacer
            .as_mut()
            .ok_or_else(|| TransportError::Device("output is not open".into()))?;

        for frame in ten_ms_frames(&audio.samples, SAMPLE_RATE) {
            pacer.tick().await;
            let frame = AudioFrame {
                data: Cow::Owned(frame),
                sample_rate: SAMPLE_RATE,
                num_channels: NUM_CHANNELS,
                samples_per_channel: SAMPLE_RATE / 100,
            };
            // Dropped frames are logged and skipped.
            self.source.capture_frame(&frame).await.warn_on_err();
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.pacer = None;
        tracing::debug!(track = %self.track_name, "audio output closed");
    }
}
