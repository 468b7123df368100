//! Failure taxonomy shared by every collaborator and the engine.
use crate::room_id::RoomId;
use std::time::Duration;
use thiserror::Error;

/// Failure of a dialogue generation call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Provider asked us to back off.
    #[error("dialogue generator rate limited")]
    RateLimited { retry_after: Option<Duration> },
    /// Output could not be parsed as a turn list. The whole call failed.
    #[error("malformed dialogue output: {0}")]
    MalformedOutput(String),
    #[error("dialogue generation timed out")]
    Timeout,
    #[error("transient dialogue generator failure: {0}")]
    Transient(String),
    /// Another generation call is already in flight for this room.
    #[error("a dialogue generation call is already in flight")]
    Busy,
}

impl GenerationError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Failure of a speech synthesis call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("speech synthesizer rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("transient speech synthesis failure: {0}")]
    Transient(String),
    #[error("speech synthesis timed out")]
    Timeout,
    /// Permanent for the turn: skip it.
    #[error("speech synthesizer produced no audio")]
    NoAudioProduced,
}

impl SynthesisError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Whether a bounded retry is worthwhile.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout)
    }
}

/// Failure talking to the durable room/comment store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("checkpoint write failed: {0}")]
    CheckpointWrite(String),
    #[error("store request failed: {0}")]
    Request(String),
    #[error("room not found: {0}")]
    RoomNotFound(String),
}

/// Failure of the real-time media transport or its audio device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport connect failed: {0}")]
    Connect(String),
    #[error("track publish failed: {0}")]
    Publish(String),
    #[error("track unpublish failed: {0}")]
    Unpublish(String),
    #[error("audio device: {0}")]
    Device(String),
}

/// Top-level error returned by the broadcast registry.
#[derive(Debug, Clone, Error)]
pub enum BroadcastError {
    #[error("room {0} is already broadcasting")]
    AlreadyBroadcasting(RoomId),
    #[error("room {0} is not broadcasting")]
    NotBroadcasting(RoomId),
    #[error("configuration: {0}")]
    Configuration(String),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl BroadcastError {
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::Generation(e) => e.is_rate_limited(),
            Self::Synthesis(e) => e.is_rate_limited(),
            _ => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Generation(e) => e.retry_after(),
            Self::Synthesis(e) => e.retry_after(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_hint_survives_wrapping() {
        let err: BroadcastError = SynthesisError::RateLimited {
            retry_after: Some(Duration::from_secs(42)),
        }
        .into();
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(42)));

        let err: BroadcastError = GenerationError::Timeout.into();
        assert!(!err.is_rate_limited());
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn only_transient_synthesis_failures_retry() {
        assert!(SynthesisError::Timeout.is_retryable());
        assert!(SynthesisError::Transient("502".into()).is_retryable());
        assert!(!SynthesisError::NoAudioProduced.is_retryable());
        assert!(!SynthesisError::RateLimited { retry_after: None }.is_retryable());
    }
}
