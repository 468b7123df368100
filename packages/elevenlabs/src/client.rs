use crate::endpoints::{ElevenLabsEndpoint, RequestBody, Result};
use crate::endpoints::tts::{TextToSpeech, TextToSpeechBody, VoiceSettings};
use crate::error::{Error, parse_retry_after};
use crate::output_format::OutputFormat;
use async_trait::async_trait;
use livecast_domain::{PcmAudio, SpeechSynthesizer, SynthesisError, VoiceId};
use reqwest::{Method, header::CONTENT_TYPE};
use serde::Deserialize;
use std::time::Duration;

const XI_API_KEY_HEADER: &str = "xi-api-key";
const APPLICATION_JSON: &str = "application/json";

/// Connection and voice settings for [`ElevenLabsClient`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ElevenLabsConfig {
    pub api_key: String,
    pub base_url: String,
    pub model_id: String,
    pub output_format: OutputFormat,
    pub voice_settings: Option<VoiceSettings>,
    pub request_timeout: Duration,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.elevenlabs.io".to_string(),
            model_id: "eleven_turbo_v2_5".to_string(),
            output_format: OutputFormat::Pcm24000Hz,
            voice_settings: Some(VoiceSettings::default()),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ElevenLabsConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ELEVENLABS_API_KEY")
            .or_else(|_| std::env::var("ELEVEN_API_KEY"))
            .map_err(|_| Error::MissingApiKey)?;

        let mut config = Self {
            api_key,
            ..Self::default()
        };
        if let Ok(model_id) = std::env::var("ELEVENLABS_MODEL_ID") {
            config.model_id = model_id;
        }
        if let Ok(format) = std::env::var("ELEVENLABS_OUTPUT_FORMAT") {
            match format.parse() {
                Ok(format) => config.output_format = format,
                Err(e) => tracing::warn!(error = %e, "ignoring ELEVENLABS_OUTPUT_FORMAT"),
            }
        }
        Ok(config)
    }
}

#[derive(Clone)]
pub struct ElevenLabsClient {
    inner: reqwest::Client,
    config: ElevenLabsConfig,
}

impl ElevenLabsClient {
    pub fn from_env() -> Result<Self> {
        Self::new(ElevenLabsConfig::from_env()?)
    }

    pub fn new(config: ElevenLabsConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::MissingApiKey);
        }
        let inner = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { inner, config })
    }

    pub fn config(&self) -> &ElevenLabsConfig {
        &self.config
    }

    pub async fn hit<T: ElevenLabsEndpoint>(&self, endpoint: T) -> Result<T::ResponseBody> {
        let mut builder = self
            .inner
            .request(T::METHOD, endpoint.url(&self.config.base_url)?)
            .header(XI_API_KEY_HEADER, &self.config.api_key);

        if matches!(T::METHOD, Method::POST | Method::PATCH) {
            builder = match endpoint.request_body()? {
                RequestBody::Json(json) => {
                    builder.header(CONTENT_TYPE, APPLICATION_JSON).json(&json)
                }
                RequestBody::Empty => builder,
            };
        }

        let resp = builder.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(resp.headers());
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::HttpError {
                status: status.as_u16(),
                body,
                retry_after,
            });
        }

        endpoint.response_body(resp).await
    }

    pub fn text_to_speech(&self, text: &str, voice: &VoiceId) -> TextToSpeech {
        TextToSpeech::new(
            voice.id(),
            self.config.output_format,
            TextToSpeechBody {
                text: text.to_string(),
                model_id: self.config.model_id.clone(),
                voice_settings: self.config.voice_settings,
            },
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceId,
    ) -> std::result::Result<PcmAudio, SynthesisError> {
        let endpoint = self.text_to_speech(text, voice);
        match self.hit(endpoint).await {
            Ok(audio) => {
                tracing::debug!(
                    voice = %voice,
                    samples = audio.samples.len(),
                    sample_rate = audio.sample_rate,
                    "synthesized"
                );
                Ok(audio)
            }
            Err(e) => {
                tracing::warn!(voice = %voice, status = ?e.status(), error = %e, "text-to-speech failed");
                Err(e.into())
            }
        }
    }
}
