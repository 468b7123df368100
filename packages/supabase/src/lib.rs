//! Durable room and comment store for livecast.
//!
//! [`SupabaseStore`] talks to the hosted database through PostgREST;
//! [`MemoryStore`] keeps everything in process for local runs and tests.

mod client;
pub mod memory;

pub use client::{SupabaseConfig, SupabaseStore};
pub use memory::MemoryStore;
