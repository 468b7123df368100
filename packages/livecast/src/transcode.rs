//! Conversion of synthesizer output to what the audio output plays: mono
//! i16 at the device rate.
use livecast_domain::PcmAudio;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use thiserror::Error;

const CHUNK_FRAMES: usize = 1024;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("audio has no samples")]
    Empty,
    #[error("invalid audio layout: {0}")]
    Layout(String),
    #[error("resampler: {0}")]
    Resample(String),
}

pub fn to_device_format(audio: &PcmAudio, target_rate: u32) -> Result<PcmAudio, TranscodeError> {
    if audio.channels == 0 || audio.sample_rate == 0 || target_rate == 0 {
        return Err(TranscodeError::Layout(format!(
            "{} channel(s) at {} Hz to {} Hz",
            audio.channels, audio.sample_rate, target_rate
        )));
    }
    if audio.is_empty() {
        return Err(TranscodeError::Empty);
    }

    let mono = downmix(audio);
    if audio.sample_rate == target_rate {
        return Ok(PcmAudio::mono(mono, target_rate));
    }

    let input: Vec<f64> = mono.iter().map(|&s| s as f64 / 32768.0).collect();
    let resampled = resample(&input, audio.sample_rate, target_rate)?;
    let samples = resampled
        .into_iter()
        .map(|s| (s * 32768.0).round().clamp(i16::MIN as f64, i16::MAX as f64) as i16)
        .collect();
    Ok(PcmAudio::mono(samples, target_rate))
}

/// Average interleaved channels into one.
fn downmix(audio: &PcmAudio) -> Vec<i16> {
    let channels = audio.channels as usize;
    if channels == 1 {
        return audio.samples.clone();
    }
    audio
        .samples
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

fn resample(input: &[f64], from: u32, to: u32) -> Result<Vec<f64>, TranscodeError> {
    let ratio = to as f64 / from as f64;
    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f64>::new(ratio, 1.0, params, CHUNK_FRAMES, 1)
        .map_err(|e| TranscodeError::Resample(e.to_string()))?;

    let expected = (input.len() as f64 * ratio).ceil() as usize;
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected + delay);

    let mut pos = 0;
    while input.len() - pos >= resampler.input_frames_next() {
        let end = pos + resampler.input_frames_next();
        let chunk = resampler
            .process(&[&input[pos..end]], None)
            .map_err(|e| TranscodeError::Resample(e.to_string()))?;
        output.extend_from_slice(&chunk[0]);
        pos = end;
    }
    if pos < input.len() {
        let tail: [&[f64]; 1] = [&input[pos..]];
        let chunk = resampler
            .process_partial(Some(&tail[..]), None)
            .map_err(|e| TranscodeError::Resample(e.to_string()))?;
        output.extend_from_slice(&chunk[0]);
    }
    // Flush the filter delay line until the tail is out.
    while output.len() < expected + delay {
        let chunk = resampler
            .process_partial::<&[f64]>(None, None)
            .map_err(|e| TranscodeError::Resample(e.to_string()))?;
        if chunk[0].is_empty() {
            break;
        }
        output.extend_from_slice(&chunk[0]);
    }

    let start = delay.min(output.len());
    let mut trimmed = output.split_off(start);
    trimmed.truncate(expected);
    Ok(trimmed)
}
