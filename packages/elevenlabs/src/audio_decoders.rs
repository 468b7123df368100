//! Decoders from synthesis response bodies to interleaved i16 PCM.
use crate::audio_format_detection::DetectedFormat;
use crate::error::Error;
use crate::output_format::Encoding;
use livecast_domain::PcmAudio;
use std::io::Cursor;

pub struct KnownFormatDecoder {
    format: DetectedFormat,
}

impl KnownFormatDecoder {
    pub fn new(format: DetectedFormat) -> Self {
        Self { format }
    }

    pub fn decode_to_pcm(&self, data: &[u8]) -> Result<PcmAudio, Error> {
        if data.is_empty() {
            return Err(Error::EmptyAudio);
        }
        let audio = match self.format.encoding {
            Encoding::RawPcm => {
                let rate = self.declared_rate("PCM")?;
                PcmAudio::mono(decode_pcm_direct(data), rate)
            }
            Encoding::MuLaw => {
                let rate = self.format.sample_rate.unwrap_or(8_000);
                PcmAudio::mono(data.iter().map(|&b| mulaw_to_linear(b)).collect(), rate)
            }
            Encoding::Wav => decode_wav(data)?,
            Encoding::Compressed => decode_with_rodio(data)?,
        };
        if audio.is_empty() {
            return Err(Error::EmptyAudio);
        }
        Ok(audio)
    }

    fn declared_rate(&self, name: &str) -> Result<u32, Error> {
        self.format
            .sample_rate
            .ok_or_else(|| Error::AudioDecodingFailed {
                format: name.to_string(),
                details: "headerless PCM without a declared sample rate".into(),
            })
    }
}

fn decode_pcm_direct(data: &[u8]) -> Vec<i16> {
    data.chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
        .collect()
}

/// G.711 mu-law expansion.
pub fn mulaw_to_linear(mulaw: u8) -> i16 {
    const BIAS: i16 = 0x84;

    let mulaw = !mulaw;
    let sign = mulaw & 0x80;
    let exponent = (mulaw >> 4) & 0x07;
    let mantissa = (mulaw & 0x0F) as i16;

    let magnitude = ((mantissa << 3) + BIAS) << exponent;
    let linear = magnitude - BIAS;
    if sign != 0 { -linear } else { linear }
}

fn decode_wav(data: &[u8]) -> Result<PcmAudio, Error> {
    let failed = |details: String| Error::AudioDecodingFailed {
        format: "WAV".into(),
        details,
    };

    let mut reader = hound::WavReader::new(Cursor::new(data)).map_err(|e| failed(e.to_string()))?;
    let spec = reader.spec();
    let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .collect::<Result<_, _>>()
            .map_err(|e| failed(e.to_string()))?,
        (hound::SampleFormat::Int, bits) if bits <= 32 => {
            let shift = bits.saturating_sub(16);
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| if bits > 16 { (v >> shift) as i16 } else { (v << (16 - bits)) as i16 }))
                .collect::<Result<_, _>>()
                .map_err(|e| failed(e.to_string()))?
        }
        (hound::SampleFormat::Float, _) => reader
            .samples::<f32>()
            .map(|s| s.map(f32_to_i16))
            .collect::<Result<_, _>>()
            .map_err(|e| failed(e.to_string()))?,
        (_, bits) => return Err(failed(format!("unsupported bit depth {bits}"))),
    };

    Ok(PcmAudio::new(samples, spec.sample_rate, spec.channels))
}

fn decode_with_rodio(data: &[u8]) -> Result<PcmAudio, Error> {
    use rodio::{Decoder, Source};

    let cursor = Cursor::new(data.to_vec());
    let decoder = Decoder::try_from(cursor).map_err(|e| Error::AudioDecodingFailed {
        format: "compressed".into(),
        details: e.to_string(),
    })?;

    let sample_rate = decoder.sample_rate();
    let channels = decoder.channels();
    let samples: Vec<i16> = decoder.map(f32_to_i16).collect();

    Ok(PcmAudio::new(samples, sample_rate, channels))
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}
