//! Playback Driver: drains the prefetch buffer into the audio output and
//! publishes that output on the media transport.
use crate::events::{BroadcastEvent, NowPlaying, PlaybackState, StatusBoard};
use crate::prefetch_buffer::PrefetchBuffer;
use crate::util::ResultExt as _;
use livecast_domain::{
    AudioOutput, LocalAudioSignal, MediaTransport, RoomId, TrackHandle, TransportError,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Progress reports from the driver to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DriverSignal {
    SegmentStarted(i64),
    SegmentFinished(i64),
}

pub(crate) struct PlaybackDriver {
    room: RoomId,
    output: Box<dyn AudioOutput>,
    transport: Arc<dyn MediaTransport>,
    buffer: Arc<PrefetchBuffer>,
    board: StatusBoard,
    signals: mpsc::UnboundedSender<DriverSignal>,
    stop: watch::Receiver<bool>,
    track: Option<TrackHandle>,
}

impl PlaybackDriver {
    pub(crate) fn new(
        room: RoomId,
        output: Box<dyn AudioOutput>,
        transport: Arc<dyn MediaTransport>,
        buffer: Arc<PrefetchBuffer>,
        board: StatusBoard,
        signals: mpsc::UnboundedSender<DriverSignal>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            room,
            output,
            transport,
            buffer,
            board,
            signals,
            stop,
            track: None,
        }
    }

    /// Run until the stop signal, then release the device and withdraw the track.
    /// Returns early with the error if the audio output cannot be opened.
    pub(crate) async fn run(mut self) -> Result<(), TransportError> {
        self.set_state(PlaybackState::Starting);
        let opened = tokio::select! {
            biased;
            _ = stopped(&mut self.stop) => None,
            opened = self.output.open() => Some(opened),
        };
        let signal = match opened {
            Some(Ok(signal)) => signal,
            Some(Err(e)) => {
                warn!(room = %self.room, error = %e, "audio output failed to open");
                self.set_state(PlaybackState::Stopped);
                return Err(e);
            }
            None => {
                self.set_state(PlaybackState::Stopped);
                return Ok(());
            }
        };
        debug!(room = %self.room, rate = signal.sample_rate, "audio output open");

        loop {
            self.set_state(PlaybackState::Buffering);
            let segment = tokio::select! {
                biased;
                _ = stopped(&mut self.stop) => break,
                segment = self.buffer.pop_wait() => segment,
            };
            let index = segment.source_turn_index;
            self.board.update(|s| s.buffered_segments = self.buffer.len());

            if self.track.is_none() {
                self.publish(&signal).await;
            }

            self.board.update(|s| {
                s.playback = PlaybackState::Speaking;
                s.now_playing = Some(NowPlaying {
                    speaker_name: segment.speaker_name.clone(),
                    speaker_slot: segment.turn.speaker_slot,
                    text: segment.turn.text.clone(),
                    source_turn_index: index,
                });
            });
            self.board.emit(BroadcastEvent::SegmentStarted {
                source_turn_index: index,
                speaker_name: segment.speaker_name.clone(),
            });
            let _ = self.signals.send(DriverSignal::SegmentStarted(index));

            let played = tokio::select! {
                biased;
                _ = stopped(&mut self.stop) => break,
                played = self.output.play(&segment.audio) => played,
            };
            if let Err(e) = played {
                warn!(room = %self.room, turn = index, error = %e, "segment playback failed");
            }

            self.board.update(|s| s.now_playing = None);
            self.board.emit(BroadcastEvent::SegmentFinished {
                source_turn_index: index,
            });
            let _ = self.signals.send(DriverSignal::SegmentFinished(index));
        }

        self.teardown().await;
        Ok(())
    }

    async fn publish(&mut self, signal: &LocalAudioSignal) {
        match self.transport.publish(signal).await {
            Ok(track) => {
                info!(room = %self.room, track = %track.sid, "broadcast track published");
                self.track = Some(track);
                self.board.update(|s| s.is_live = true);
                self.board.emit(BroadcastEvent::Live {
                    room: self.room.clone(),
                });
            }
            // Playback continues; publishing is retried before the next segment.
            Err(e) => warn!(room = %self.room, error = %e, "track publish failed"),
        }
    }

    async fn teardown(&mut self) {
        self.output.close().await;
        if let Some(track) = self.track.take() {
            let _ = self
                .transport
                .unpublish(track)
                .await
                .log_err("track unpublish failed");
        }
        self.board.update(|s| {
            s.playback = PlaybackState::Stopped;
            s.now_playing = None;
            s.is_live = false;
        });
        debug!(room = %self.room, "playback stopped");
    }

    fn set_state(&self, state: PlaybackState) {
        self.board.update(|s| s.playback = state);
    }
}

/// Resolves once stop has been requested or the stop sender is gone.
pub(crate) async fn stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}
