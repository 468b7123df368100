use anyhow::Result;
use async_trait::async_trait;
use futures::{SinkExt, channel::mpsc};
use livecast_domain::{LocalAudioSignal, MediaTransport, TrackHandle, TransportError};
use livekit::webrtc::audio_source::{AudioSourceOptions, RtcAudioSource, native::NativeAudioSource};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::participants::ParticipantRoster;
use crate::playback::NativeSourceOutput;
use crate::{LiveKitConfig, NUM_CHANNELS, ParticipantIdentity, RoomEvent, SAMPLE_RATE};

#[derive(Clone, Debug)]
pub struct LocalTrackPublication(pub livekit::publication::LocalTrackPublication);

impl LocalTrackPublication {
    pub fn sid(&self) -> String {
        self.0.sid().to_string()
    }
}

/// A connected LiveKit room plus the audio source the broadcast feeds.
pub struct Room {
    room: livekit::Room,
    source: NativeAudioSource,
    roster: ParticipantRoster,
    publications: Mutex<HashMap<String, LocalTrackPublication>>,
    _task: JoinHandle<()>,
}

impl Room {
    pub async fn connect(
        config: &LiveKitConfig,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<RoomEvent>)> {
        let options = livekit::RoomOptions::default();
        let (room, mut events) = livekit::Room::connect(&config.url, &config.token, options).await?;

        let roster = ParticipantRoster::new();
        roster.seed(
            room.remote_participants()
                .into_keys()
                .map(|identity| ParticipantIdentity(identity.0)),
        );

        let (mut tx, rx) = mpsc::unbounded();
        let task = tokio::spawn({
            let roster = roster.clone();
            async move {
                while let Some(event) = events.recv().await {
                    if let Some(event) = room_event_from_livekit(event) {
                        if let Some(count) = roster.apply(&event) {
                            tracing::debug!(listeners = count, "participant count changed");
                        }
                        tx.send(event).await.ok();
                    }
                }
            }
        });

        let source = NativeAudioSource::new(
            AudioSourceOptions::default(),
            SAMPLE_RATE,
            NUM_CHANNELS,
            10,
        );

        tracing::info!(url = %config.url, "connected to livekit room");
        Ok((
            Arc::new(Self {
                room,
                source,
                roster,
                publications: Mutex::new(HashMap::new()),
                _task: task,
            }),
            rx,
        ))
    }

    pub fn participant_count(&self) -> usize {
        self.roster.count()
    }

    /// Output device writing into this room's audio source.
    pub fn audio_output(&self, track_name: impl Into<String>) -> NativeSourceOutput {
        NativeSourceOutput::new(self.source.clone(), track_name)
    }

    pub async fn publish_audio_track(&self, name: &str) -> Result<LocalTrackPublication> {
        let track = livekit::track::LocalAudioTrack::create_audio_track(
            name,
            RtcAudioSource::Native(self.source.clone()),
        );
        let publication = self
            .room
            .local_participant()
            .publish_track(
                livekit::track::LocalTrack::Audio(track),
                livekit::options::TrackPublishOptions {
                    source: livekit::track::TrackSource::Microphone,
                    ..Default::default()
                },
            )
            .await
            .map(LocalTrackPublication)
            .map_err(|error| anyhow::anyhow!("failed to publish track: {error}"))?;

        self.publications
            .lock()
            .insert(publication.sid(), publication.clone());
        Ok(publication)
    }

    pub async fn unpublish_track(&self, sid: &str) -> Result<()> {
        let publication = self
            .publications
            .lock()
            .remove(sid)
            .ok_or_else(|| anyhow::anyhow!("track {sid} is not published"))?;
        self.room
            .local_participant()
            .unpublish_track(&publication.0.sid())
            .await
            .map(|_| ())
            .map_err(|error| anyhow::anyhow!("failed to unpublish track: {error}"))
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.room
            .close()
            .await
            .map_err(|error| anyhow::anyhow!("failed to close room: {error}"))
    }
}

/// [`MediaTransport`] backed by a LiveKit [`Room`].
#[derive(Clone)]
pub struct LiveKitTransport {
    room: Arc<Room>,
}

impl LiveKitTransport {
    pub fn new(room: Arc<Room>) -> Self {
        Self { room }
    }
}

#[async_trait]
impl MediaTransport for LiveKitTransport {
    async fn publish(&self, signal: &LocalAudioSignal) -> Result<TrackHandle, TransportError> {
        let publication = self
            .room
            .publish_audio_track(&signal.name)
            .await
            .map_err(|e| TransportError::Publish(e.to_string()))?;
        let sid = publication.sid();
        tracing::info!(track = %signal.name, sid = %sid, "published broadcast track");
        Ok(TrackHandle { sid })
    }

    async fn unpublish(&self, track: TrackHandle) -> Result<(), TransportError> {
        self.room
            .unpublish_track(&track.sid)
            .await
            .map_err(|e| TransportError::Unpublish(e.to_string()))?;
        tracing::info!(sid = %track.sid, "unpublished broadcast track");
        Ok(())
    }

    fn participant_count(&self) -> usize {
        self.room.participant_count()
    }
}

fn room_event_from_livekit(event: livekit::RoomEvent) -> Option<RoomEvent> {
    let event = match event {
        livekit::RoomEvent::ParticipantConnected(remote_participant) => {
            RoomEvent::ParticipantConnected(ParticipantIdentity(remote_participant.identity().0))
        }
        livekit::RoomEvent::ParticipantDisconnected(remote_participant) => {
            RoomEvent::ParticipantDisconnected(ParticipantIdentity(
                remote_participant.identity().0,
            ))
        }
        livekit::RoomEvent::LocalTrackPublished { publication, .. } => {
            RoomEvent::LocalTrackPublished {
                sid: publication.sid().to_string(),
            }
        }
        livekit::RoomEvent::LocalTrackUnpublished { publication, .. } => {
            RoomEvent::LocalTrackUnpublished {
                sid: publication.sid().to_string(),
            }
        }
        livekit::RoomEvent::Connected {
            participants_with_tracks,
        } => RoomEvent::Connected {
            participants: participants_with_tracks
                .into_iter()
                .map(|(p, _)| ParticipantIdentity(p.identity().0))
                .collect(),
        },
        livekit::RoomEvent::Disconnected { reason } => RoomEvent::Disconnected {
            reason: reason.as_str_name(),
        },
        livekit::RoomEvent::Reconnecting => RoomEvent::Reconnecting,
        livekit::RoomEvent::Reconnected => RoomEvent::Reconnected,
        _ => {
            tracing::trace!("dropping livekit event: {event:?}");
            return None;
        }
    };

    Some(event)
}
