//! Layered detection of the encoding of a synthesis response.
//!
//! The requested `output_format` wins, then the `Content-Type` header, then
//! the leading magic bytes of the body.
use crate::error::Error;
use crate::output_format::{Encoding, OutputFormat};
use http::HeaderMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionLayer {
    QueryParameter(OutputFormat),
    ContentTypeHeader(String),
    MagicNumber(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedFormat {
    pub encoding: Encoding,
    /// Sample rate implied by the declaration. Containers carry their own.
    pub sample_rate: Option<u32>,
    pub detection_method: DetectionLayer,
}

struct FormatSignature {
    signature: &'static [u8],
    format_name: &'static str,
    encoding: Encoding,
}

const SIGNATURES: &[FormatSignature] = &[
    FormatSignature {
        signature: b"ID3",
        format_name: "MP3",
        encoding: Encoding::Compressed,
    },
    FormatSignature {
        signature: &[0xFF, 0xFB],
        format_name: "MP3",
        encoding: Encoding::Compressed,
    },
    FormatSignature {
        signature: &[0xFF, 0xF3],
        format_name: "MP3",
        encoding: Encoding::Compressed,
    },
    FormatSignature {
        signature: &[0xFF, 0xF2],
        format_name: "MP3",
        encoding: Encoding::Compressed,
    },
    FormatSignature {
        signature: b"RIFF",
        format_name: "WAV",
        encoding: Encoding::Wav,
    },
    FormatSignature {
        signature: b"fLaC",
        format_name: "FLAC",
        encoding: Encoding::Compressed,
    },
    FormatSignature {
        signature: b"OggS",
        format_name: "OGG",
        encoding: Encoding::Compressed,
    },
];

#[derive(Debug, Default, Clone)]
pub struct AudioFormatDetector;

impl AudioFormatDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(
        &self,
        requested: Option<OutputFormat>,
        headers: &HeaderMap,
        data: &[u8],
    ) -> Result<DetectedFormat, Error> {
        // A WAV body always describes itself, whatever was requested.
        if let Some(found) = self.detect_magic(data).filter(|d| d.encoding == Encoding::Wav) {
            return Ok(found);
        }

        if let Some(format) = requested {
            return Ok(DetectedFormat {
                encoding: format.encoding(),
                sample_rate: Some(format.sample_rate()),
                detection_method: DetectionLayer::QueryParameter(format),
            });
        }

        if let Some(found) = Self::detect_content_type(headers) {
            return Ok(found);
        }

        self.detect_magic(data)
            .ok_or_else(|| Error::FormatDetectionFailed {
                reason: "no declared format, unknown content type and no known signature".into(),
            })
    }

    fn detect_content_type(headers: &HeaderMap) -> Option<DetectedFormat> {
        let raw = headers.get(http::header::CONTENT_TYPE)?.to_str().ok()?;
        let main_type = raw.split(';').next()?.trim().to_lowercase();
        let (encoding, sample_rate) = match main_type.as_str() {
            "audio/mpeg" | "audio/mp3" | "audio/ogg" | "audio/vorbis" | "audio/flac" => {
                (Encoding::Compressed, None)
            }
            "audio/wav" | "audio/wave" | "audio/x-wav" => (Encoding::Wav, None),
            "audio/basic" => (Encoding::MuLaw, Some(8_000)),
            "audio/pcm" | "audio/l16" => (Encoding::RawPcm, rate_parameter(raw)),
            _ => return None,
        };
        Some(DetectedFormat {
            encoding,
            sample_rate,
            detection_method: DetectionLayer::ContentTypeHeader(main_type),
        })
    }

    fn detect_magic(&self, data: &[u8]) -> Option<DetectedFormat> {
        SIGNATURES
            .iter()
            .find(|sig| data.starts_with(sig.signature))
            .map(|sig| DetectedFormat {
                encoding: sig.encoding,
                sample_rate: None,
                detection_method: DetectionLayer::MagicNumber(sig.format_name),
            })
    }
}

/// `rate=` parameter of an `audio/L16`-style content type.
fn rate_parameter(content_type: &str) -> Option<u32> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("rate"))
        .and_then(|(_, value)| value.trim().parse().ok())
}
