use serde::Deserialize;

mod livekit_client;
pub mod participants;
pub mod playback;
pub mod util;

pub use livekit_client::*;
pub use participants::ParticipantRoster;
pub use playback::NativeSourceOutput;

/// Sample rate of the published audio source.
pub const SAMPLE_RATE: u32 = 48_000;
/// The broadcast is mono.
pub const NUM_CHANNELS: u32 = 1;

#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct ParticipantIdentity(pub String);

/// Room events the broadcaster cares about.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum RoomEvent {
    ParticipantConnected(ParticipantIdentity),
    ParticipantDisconnected(ParticipantIdentity),
    LocalTrackPublished { sid: String },
    LocalTrackUnpublished { sid: String },
    Connected { participants: Vec<ParticipantIdentity> },
    Disconnected { reason: &'static str },
    Reconnecting,
    Reconnected,
}

/// Where and as whom to connect.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LiveKitConfig {
    pub url: String,
    pub token: String,
    pub track_name: String,
}

impl Default for LiveKitConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            track_name: "podcast-audio".to_string(),
        }
    }
}

impl LiveKitConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let url = std::env::var("LIVEKIT_URL")
            .map_err(|_| anyhow::anyhow!("LIVEKIT_URL is not set"))?;
        let token = std::env::var("LIVEKIT_TOKEN")
            .map_err(|_| anyhow::anyhow!("LIVEKIT_TOKEN is not set"))?;
        let mut config = Self {
            url,
            token,
            ..Self::default()
        };
        if let Ok(track_name) = std::env::var("LIVEKIT_TRACK_NAME") {
            config.track_name = track_name;
        }
        Ok(config)
    }
}
