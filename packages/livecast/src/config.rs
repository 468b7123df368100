//! Engine tuning knobs.
//!
//! Every value has a default suitable for a live show; a host application can
//! override them from any serde format (durations in milliseconds) or from
//! `LIVECAST_*` environment variables.
use livecast_domain::BroadcastError;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Period of the prefetch and comment-poll tick.
    #[serde(with = "duration_ms")]
    pub tick_interval: Duration,
    /// Synthesized segments kept ready ahead of playback.
    pub buffer_target_depth: usize,
    /// Turns requested per normal dialogue generation call.
    pub generation_batch_size: usize,
    /// Turns requested when answering a comment batch.
    pub comment_response_turns: usize,
    /// Recent turns offered to the generator as prior context.
    pub history_len: usize,
    /// Outbound pause after a rate-limit signal.
    #[serde(with = "duration_ms")]
    pub cooldown: Duration,
    /// Retries of a transient synthesis failure before the turn is skipped.
    pub synthesis_max_retries: u32,
    #[serde(with = "duration_ms")]
    pub retry_backoff: Duration,
    #[serde(with = "duration_ms")]
    pub generation_timeout: Duration,
    #[serde(with = "duration_ms")]
    pub synthesis_timeout: Duration,
    /// Sample rate handed to the audio output when it does not report one.
    pub output_sample_rate: u32,
    /// Unprocessed comments that trigger a batch immediately.
    pub comment_count_threshold: usize,
    /// Time since the last checkpoint after which any pending comment triggers a batch.
    #[serde(with = "duration_ms")]
    pub comment_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(2),
            buffer_target_depth: 3,
            generation_batch_size: 6,
            comment_response_turns: 4,
            history_len: 5,
            cooldown: Duration::from_secs(30),
            synthesis_max_retries: 2,
            retry_backoff: Duration::from_millis(500),
            generation_timeout: Duration::from_secs(45),
            synthesis_timeout: Duration::from_secs(30),
            output_sample_rate: 48_000,
            comment_count_threshold: 50,
            comment_interval: Duration::from_secs(120),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `LIVECAST_*` variables. Unparseable values are
    /// reported rather than ignored.
    pub fn from_env() -> Result<Self, BroadcastError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BroadcastError> {
        let mut config = Self::default();
        let ms = |key: &str, target: &mut Duration| -> Result<(), BroadcastError> {
            if let Some(raw) = lookup(key) {
                *target = Duration::from_millis(parse(key, &raw)?);
            }
            Ok(())
        };
        let secs = |key: &str, target: &mut Duration| -> Result<(), BroadcastError> {
            if let Some(raw) = lookup(key) {
                *target = Duration::from_secs(parse(key, &raw)?);
            }
            Ok(())
        };

        ms("LIVECAST_TICK_INTERVAL_MS", &mut config.tick_interval)?;
        secs("LIVECAST_COOLDOWN_SECS", &mut config.cooldown)?;
        ms("LIVECAST_RETRY_BACKOFF_MS", &mut config.retry_backoff)?;
        secs("LIVECAST_GENERATION_TIMEOUT_SECS", &mut config.generation_timeout)?;
        secs("LIVECAST_SYNTHESIS_TIMEOUT_SECS", &mut config.synthesis_timeout)?;
        secs("LIVECAST_COMMENT_INTERVAL_SECS", &mut config.comment_interval)?;

        if let Some(raw) = lookup("LIVECAST_BUFFER_DEPTH") {
            config.buffer_target_depth = parse("LIVECAST_BUFFER_DEPTH", &raw)?;
        }
        if let Some(raw) = lookup("LIVECAST_BATCH_SIZE") {
            config.generation_batch_size = parse("LIVECAST_BATCH_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("LIVECAST_COMMENT_RESPONSE_TURNS") {
            config.comment_response_turns = parse("LIVECAST_COMMENT_RESPONSE_TURNS", &raw)?;
        }
        if let Some(raw) = lookup("LIVECAST_HISTORY_LEN") {
            config.history_len = parse("LIVECAST_HISTORY_LEN", &raw)?;
        }
        if let Some(raw) = lookup("LIVECAST_SYNTHESIS_MAX_RETRIES") {
            config.synthesis_max_retries = parse("LIVECAST_SYNTHESIS_MAX_RETRIES", &raw)?;
        }
        if let Some(raw) = lookup("LIVECAST_OUTPUT_SAMPLE_RATE") {
            config.output_sample_rate = parse("LIVECAST_OUTPUT_SAMPLE_RATE", &raw)?;
        }
        if let Some(raw) = lookup("LIVECAST_COMMENT_THRESHOLD") {
            config.comment_count_threshold = parse("LIVECAST_COMMENT_THRESHOLD", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BroadcastError> {
        let invalid = |what: &str| Err(BroadcastError::Configuration(what.to_string()));
        if self.tick_interval.is_zero() {
            return invalid("tick_interval must be greater than zero");
        }
        if self.buffer_target_depth == 0 {
            return invalid("buffer_target_depth must be at least 1");
        }
        if self.generation_batch_size == 0 || self.comment_response_turns == 0 {
            return invalid("turn counts must be at least 1");
        }
        if self.comment_count_threshold == 0 {
            return invalid("comment_count_threshold must be at least 1");
        }
        if self.output_sample_rate == 0 {
            return invalid("output_sample_rate must be greater than zero");
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, BroadcastError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| BroadcastError::Configuration(format!("{key}={raw}: {e}")))
}

mod duration_ms {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
