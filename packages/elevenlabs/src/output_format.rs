//! `output_format` query values accepted by the text-to-speech endpoint.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    #[serde(rename = "mp3_22050_32")]
    Mp3_22050Hz32kbps,
    #[serde(rename = "mp3_44100_64")]
    Mp3_44100Hz64kbps,
    #[serde(rename = "mp3_44100_128")]
    Mp3_44100Hz128kbps,
    #[serde(rename = "mp3_44100_192")]
    Mp3_44100Hz192kbps,
    #[serde(rename = "pcm_16000")]
    Pcm16000Hz,
    #[serde(rename = "pcm_22050")]
    Pcm22050Hz,
    #[serde(rename = "pcm_24000")]
    Pcm24000Hz,
    #[serde(rename = "pcm_44100")]
    Pcm44100Hz,
    #[serde(rename = "pcm_48000")]
    Pcm48000Hz,
    #[serde(rename = "ulaw_8000")]
    MuLaw8000Hz,
}

/// How the bytes of a given format must be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Headerless little-endian signed 16-bit mono.
    RawPcm,
    /// G.711 mu-law, 8 bit mono.
    MuLaw,
    /// A compressed or containerized stream (MP3, Ogg, FLAC).
    Compressed,
    /// RIFF/WAVE container.
    Wav,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 10] = [
        Self::Mp3_22050Hz32kbps,
        Self::Mp3_44100Hz64kbps,
        Self::Mp3_44100Hz128kbps,
        Self::Mp3_44100Hz192kbps,
        Self::Pcm16000Hz,
        Self::Pcm22050Hz,
        Self::Pcm24000Hz,
        Self::Pcm44100Hz,
        Self::Pcm48000Hz,
        Self::MuLaw8000Hz,
    ];

    pub const fn as_query(self) -> &'static str {
        match self {
            Self::Mp3_22050Hz32kbps => "mp3_22050_32",
            Self::Mp3_44100Hz64kbps => "mp3_44100_64",
            Self::Mp3_44100Hz128kbps => "mp3_44100_128",
            Self::Mp3_44100Hz192kbps => "mp3_44100_192",
            Self::Pcm16000Hz => "pcm_16000",
            Self::Pcm22050Hz => "pcm_22050",
            Self::Pcm24000Hz => "pcm_24000",
            Self::Pcm44100Hz => "pcm_44100",
            Self::Pcm48000Hz => "pcm_48000",
            Self::MuLaw8000Hz => "ulaw_8000",
        }
    }

    pub const fn sample_rate(self) -> u32 {
        match self {
            Self::MuLaw8000Hz => 8_000,
            Self::Pcm16000Hz => 16_000,
            Self::Mp3_22050Hz32kbps | Self::Pcm22050Hz => 22_050,
            Self::Pcm24000Hz => 24_000,
            Self::Mp3_44100Hz64kbps
            | Self::Mp3_44100Hz128kbps
            | Self::Mp3_44100Hz192kbps
            | Self::Pcm44100Hz => 44_100,
            Self::Pcm48000Hz => 48_000,
        }
    }

    pub const fn encoding(self) -> Encoding {
        match self {
            Self::Pcm16000Hz
            | Self::Pcm22050Hz
            | Self::Pcm24000Hz
            | Self::Pcm44100Hz
            | Self::Pcm48000Hz => Encoding::RawPcm,
            Self::MuLaw8000Hz => Encoding::MuLaw,
            Self::Mp3_22050Hz32kbps
            | Self::Mp3_44100Hz64kbps
            | Self::Mp3_44100Hz128kbps
            | Self::Mp3_44100Hz192kbps => Encoding::Compressed,
        }
    }

    /// Accept header value for requests in this format.
    pub const fn accept(self) -> &'static str {
        match self.encoding() {
            Encoding::Compressed => "audio/mpeg",
            Encoding::MuLaw => "audio/basic",
            Encoding::RawPcm | Encoding::Wav => "audio/pcm",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.as_query() == wanted)
            .ok_or_else(|| format!("unknown output format `{s}`"))
    }
}
