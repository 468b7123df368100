use http::HeaderMap;
use livecast_elevenlabs::audio_decoders::KnownFormatDecoder;
use livecast_elevenlabs::audio_format_detection::{AudioFormatDetector, DetectionLayer};
use livecast_elevenlabs::{Encoding, Error, OutputFormat};
use std::io::Cursor;

fn wav_bytes(rate: u32, samples: &[i16]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut out = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut out, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }
    out.into_inner()
}

#[cfg(test)]
mod audio_format_detection_tests {
    use super::*;

    /// A WAV body overrides a raw PCM declaration so the header is not played as noise.
    #[test]
    fn test_wav_body_beats_declared_pcm() {
        let bytes = wav_bytes(16_000, &[1, 2, 3, 4]);
        let detected = AudioFormatDetector::new()
            .detect(Some(OutputFormat::Pcm24000Hz), &HeaderMap::new(), &bytes)
            .unwrap();
        assert_eq!(detected.encoding, Encoding::Wav);
        assert_eq!(detected.detection_method, DetectionLayer::MagicNumber("WAV"));

        let audio = KnownFormatDecoder::new(detected).decode_to_pcm(&bytes).unwrap();
        assert_eq!(audio.sample_rate, 16_000);
        assert_eq!(audio.samples, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_content_type_detection() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "audio/mpeg; charset=binary".parse().unwrap());

        let detected = AudioFormatDetector::new()
            .detect(None, &headers, b"dummy_audio_data")
            .unwrap();
        assert_eq!(detected.encoding, Encoding::Compressed);
        match detected.detection_method {
            DetectionLayer::ContentTypeHeader(content_type) => {
                assert_eq!(content_type, "audio/mpeg");
            }
            other => panic!("expected content type detection, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_mp3_is_a_decoding_failure() {
        let detected = AudioFormatDetector::new()
            .detect(Some(OutputFormat::Mp3_44100Hz128kbps), &HeaderMap::new(), b"not an mp3")
            .unwrap();
        let result = KnownFormatDecoder::new(detected).decode_to_pcm(b"not an mp3");
        assert!(matches!(result, Err(Error::AudioDecodingFailed { .. })));
    }
}
