//! `POST /v1/text-to-speech/{voice_id}`
use super::{ElevenLabsEndpoint, RequestBody, Result};
use crate::audio_decoders::KnownFormatDecoder;
use crate::audio_format_detection::AudioFormatDetector;
use crate::output_format::OutputFormat;
use livecast_domain::PcmAudio;
use reqwest::{Method, Response};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TextToSpeechBody {
    pub text: String,
    pub model_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_settings: Option<VoiceSettings>,
}

#[derive(Debug, Clone)]
pub struct TextToSpeech {
    pub voice_id: String,
    pub output_format: OutputFormat,
    pub body: TextToSpeechBody,
}

impl TextToSpeech {
    pub fn new(voice_id: impl Into<String>, output_format: OutputFormat, body: TextToSpeechBody) -> Self {
        Self {
            voice_id: voice_id.into(),
            output_format,
            body,
        }
    }
}

impl ElevenLabsEndpoint for TextToSpeech {
    const PATH: &'static str = "/v1/text-to-speech/:voice_id";

    const METHOD: Method = Method::POST;

    type ResponseBody = PcmAudio;

    fn path_params(&self) -> Vec<(&'static str, &str)> {
        vec![(":voice_id", self.voice_id.as_str())]
    }

    fn query_params(&self) -> Option<Vec<(&'static str, String)>> {
        Some(vec![("output_format", self.output_format.as_query().to_string())])
    }

    fn request_body(&self) -> Result<RequestBody> {
        Ok(RequestBody::Json(serde_json::to_value(&self.body)?))
    }

    async fn response_body(self, resp: Response) -> Result<Self::ResponseBody> {
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await?;
        let detected = AudioFormatDetector::new().detect(Some(self.output_format), &headers, &bytes)?;
        KnownFormatDecoder::new(detected).decode_to_pcm(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> TextToSpeech {
        TextToSpeech::new(
            "21m00Tcm4TlvDq8ikWAM",
            OutputFormat::Pcm24000Hz,
            TextToSpeechBody {
                text: "Welcome back to the show".into(),
                model_id: "eleven_turbo_v2_5".into(),
                voice_settings: None,
            },
        )
    }

    #[test]
    fn url_carries_voice_and_format() {
        let url = endpoint().url("https://api.elevenlabs.io").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.elevenlabs.io/v1/text-to-speech/21m00Tcm4TlvDq8ikWAM?output_format=pcm_24000"
        );
    }

    #[test]
    fn body_omits_unset_voice_settings() {
        let RequestBody::Json(json) = endpoint().request_body().unwrap() else {
            panic!("expected json body");
        };
        assert_eq!(json["text"], "Welcome back to the show");
        assert_eq!(json["model_id"], "eleven_turbo_v2_5");
        assert!(json.get("voice_settings").is_none());
    }
}
