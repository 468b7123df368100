//! ElevenLabs speech synthesis for livecast
//!
//! Implements [`livecast_domain::SpeechSynthesizer`] over the ElevenLabs
//! text-to-speech REST endpoint and decodes whatever encoding the provider
//! returns into interleaved i16 PCM.
//!
//! # Usage
//!
//! ```no_run
//! use livecast_domain::{SpeechSynthesizer, VoiceId};
//! use livecast_elevenlabs::ElevenLabsClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ElevenLabsClient::from_env()?;
//! let audio = client
//!     .synthesize("Welcome back to the show!", &VoiceId::new("21m00Tcm4TlvDq8ikWAM"))
//!     .await?;
//! println!("{:?} of audio", audio.duration());
//! # Ok(())
//! # }
//! ```

pub mod audio_decoders;
pub mod audio_format_detection;
mod client;
pub mod endpoints;
pub mod error;
pub mod output_format;

pub use client::{ElevenLabsClient, ElevenLabsConfig};
pub use endpoints::tts::VoiceSettings;
pub use error::Error;
pub use output_format::{Encoding, OutputFormat};
