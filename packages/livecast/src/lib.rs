//! # Livecast
//!
//! Host-side engine for a live two-host AI podcast.
//!
//! The engine keeps a continuous dialogue between two synthetic hosts
//! playing into a real-time media room: it requests dialogue from a
//! language model, synthesizes each turn while the previous one plays, and
//! interrupts the scheduled flow to answer listener comments.
//!
//! Every external service sits behind a trait from [`livecast_domain`], so
//! providers are plugged in through [`Collaborators`]:
//!
//! ```no_run
//! use livecast::{BroadcastRegistry, Collaborators, EngineConfig};
//! use livecast_domain::RoomId;
//!
//! # async fn run(collaborators: Collaborators) -> Result<(), livecast_domain::BroadcastError> {
//! let registry = BroadcastRegistry::new();
//! let room = RoomId::from("room-42");
//! let handle = registry.start(room.clone(), collaborators, EngineConfig::from_env()?)?;
//!
//! let mut status = handle.watch_status();
//! while status.changed().await.is_ok() {
//!     if status.borrow().is_live {
//!         break;
//!     }
//! }
//! registry.stop(&room).await
//! # }
//! ```

pub mod comment_bridge;
pub mod config;
pub mod cooldown;
pub mod dialogue;
pub mod events;
pub mod history;
mod orchestrator;
mod playback;
pub mod prefetch_buffer;
pub mod registry;
pub mod speech;
pub mod transcode;
pub mod turn_queue;
mod util;

pub use comment_bridge::CommentIntakeBridge;
pub use config::EngineConfig;
pub use cooldown::CooldownGate;
pub use dialogue::DialogueClient;
pub use events::{BroadcastEvent, BroadcastStatus, EnginePhase, NowPlaying, PlaybackState};
pub use orchestrator::{BroadcastEngine, Collaborators};
pub use prefetch_buffer::PrefetchBuffer;
pub use registry::{BroadcastHandle, BroadcastRegistry};
pub use speech::{RetryPolicy, SpeechClient};
pub use turn_queue::{QueuedTurn, TurnQueue};
