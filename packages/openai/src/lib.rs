//! Dialogue generation for livecast over OpenAI-compatible chat completions.
//!
//! [`OpenAiDialogueClient`] implements [`livecast_domain::DialogueGenerator`]:
//! it renders a request into a system and user prompt, asks for a JSON script
//! and resolves each line's speaker label against the show's [`HostLineup`].
//!
//! [`HostLineup`]: livecast_domain::HostLineup

mod client;
pub mod error;
pub mod prompt;
pub mod script;

pub use client::{OpenAiConfig, OpenAiDialogueClient};
pub use error::Error;
