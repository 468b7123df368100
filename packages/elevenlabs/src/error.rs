use livecast_domain::SynthesisError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("serde error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("http error {status}: {body}")]
    HttpError {
        status: u16,
        body: String,
        retry_after: Option<Duration>,
    },
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("no ElevenLabs API key found; set ELEVENLABS_API_KEY or ELEVEN_API_KEY")]
    MissingApiKey,
    #[error("Audio format detection failed: {reason}")]
    FormatDetectionFailed { reason: String },
    #[error("Audio decoding failed for format {format}: {details}")]
    AudioDecodingFailed { format: String, details: String },
    #[error("response contained no audio")]
    EmptyAudio,
}

impl Error {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpError { status, .. } => Some(*status),
            Self::ReqwestError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Collapse a provider error into the engine's synthesis taxonomy.
impl From<Error> for SynthesisError {
    fn from(err: Error) -> Self {
        match err {
            Error::HttpError {
                status: 429,
                retry_after,
                ..
            } => SynthesisError::RateLimited { retry_after },
            // The text itself was rejected; retrying the same turn cannot help.
            Error::HttpError {
                status: 400 | 422, ..
            } => SynthesisError::NoAudioProduced,
            Error::HttpError { status, body, .. } if status >= 500 => {
                SynthesisError::Transient(format!("{status}: {body}"))
            }
            Error::ReqwestError(e) if e.is_timeout() => SynthesisError::Timeout,
            Error::ReqwestError(e) if e.is_connect() || e.is_request() || e.is_body() => {
                SynthesisError::Transient(e.to_string())
            }
            Error::EmptyAudio | Error::AudioDecodingFailed { .. } => {
                SynthesisError::NoAudioProduced
            }
            other => SynthesisError::Transient(other.to_string()),
        }
    }
}

/// Parse a `Retry-After` header given in delta-seconds.
pub(crate) fn parse_retry_after(headers: &http::HeaderMap) -> Option<Duration> {
    headers
        .get(http::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}
