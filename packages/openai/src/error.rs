use livecast_domain::GenerationError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("http error {status}: {body}")]
    HttpError {
        status: u16,
        body: String,
        retry_after: Option<Duration>,
    },
    #[error("unparseable script: {0}")]
    Script(String),
    #[error("no OpenAI API key found; set OPENAI_API_KEY")]
    MissingApiKey,
}

impl From<Error> for GenerationError {
    fn from(err: Error) -> Self {
        match err {
            Error::HttpError {
                status: 429,
                retry_after,
                ..
            } => GenerationError::RateLimited { retry_after },
            Error::HttpError { status, body, .. } => {
                GenerationError::Transient(format!("{status}: {body}"))
            }
            Error::ReqwestError(e) if e.is_timeout() => GenerationError::Timeout,
            Error::ReqwestError(e) if e.is_decode() => GenerationError::MalformedOutput(e.to_string()),
            Error::ReqwestError(e) => GenerationError::Transient(e.to_string()),
            Error::Script(reason) => GenerationError::MalformedOutput(reason),
            Error::MissingApiKey => GenerationError::Transient(Error::MissingApiKey.to_string()),
        }
    }
}

pub(crate) fn parse_retry_after(headers: &http::HeaderMap) -> Option<Duration> {
    let value = headers.get(http::header::RETRY_AFTER)?.to_str().ok()?;
    let secs: f64 = value.trim().parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_requests_is_rate_limited() {
        let err = Error::HttpError {
            status: 429,
            body: String::new(),
            retry_after: Some(Duration::from_secs(20)),
        };
        let mapped = GenerationError::from(err);
        assert!(mapped.is_rate_limited());
        assert_eq!(mapped.retry_after(), Some(Duration::from_secs(20)));
    }

    #[test]
    fn script_errors_are_malformed_output() {
        assert!(matches!(
            GenerationError::from(Error::Script("no turns".into())),
            GenerationError::MalformedOutput(_)
        ));
    }
}
