//! Run one live show end to end.
//!
//! ```sh
//! OPENAI_API_KEY=... ELEVENLABS_API_KEY=... \
//! SUPABASE_URL=... SUPABASE_SERVICE_ROLE_KEY=... \
//! LIVEKIT_URL=wss://... LIVEKIT_TOKEN=... \
//! RUST_LOG=livecast=debug cargo run --example live_show -- <room-id>
//! ```
use anyhow::Context as _;
use livecast::{BroadcastEvent, BroadcastRegistry, Collaborators, EngineConfig};
use livecast_domain::{HostLineup, RoomId};
use livecast_elevenlabs::ElevenLabsClient;
use livecast_livekit::{LiveKitConfig, LiveKitTransport, Room};
use livecast_openai::OpenAiDialogueClient;
use livecast_supabase::SupabaseStore;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let room_id = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("LIVECAST_ROOM").ok())
        .context("usage: live_show <room-id> (or set LIVECAST_ROOM)")?;
    let room_id = RoomId::new(room_id);

    let config = EngineConfig::from_env()?;
    let hosts = HostLineup::default();
    let generator = OpenAiDialogueClient::from_env(hosts)?;
    let synthesizer = ElevenLabsClient::from_env()?;
    let store = SupabaseStore::from_env()?;

    let livekit_config = LiveKitConfig::from_env()?;
    let (room, mut room_events) = Room::connect(&livekit_config).await?;
    tokio::spawn(async move {
        use futures::StreamExt as _;
        while let Some(event) = room_events.next().await {
            tracing::debug!(?event, "room event");
        }
    });

    let collaborators = Collaborators {
        generator: Arc::new(generator),
        synthesizer: Arc::new(synthesizer),
        store: Arc::new(store),
        transport: Arc::new(LiveKitTransport::new(room.clone())),
        output: Box::new(room.audio_output(livekit_config.track_name.clone())),
    };

    let registry = BroadcastRegistry::new();
    let handle = registry.start(room_id.clone(), collaborators, config)?;
    let mut events = handle.events();
    tracing::info!(room = %room_id, "show starting; press ctrl-c to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(BroadcastEvent::SegmentStarted { source_turn_index, speaker_name }) => {
                    let status = handle.status();
                    tracing::info!(
                        turn = source_turn_index,
                        speaker = %speaker_name,
                        listeners = status.listener_count,
                        buffered = status.buffered_segments,
                        "on air"
                    );
                }
                Ok(BroadcastEvent::CoolingDown { remaining }) => {
                    tracing::warn!(?remaining, "rate limited; the show pauses after buffered audio");
                }
                Ok(BroadcastEvent::Stopped { .. }) => break,
                Ok(event) => tracing::debug!(?event, "broadcast event"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event stream lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    registry.stop(&room_id).await?;
    room.disconnect().await?;
    Ok(())
}
