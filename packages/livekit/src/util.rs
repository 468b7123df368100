//! Small helpers shared by the room wrapper and the audio output.
use std::fmt::Debug;

pub trait ResultExt<T, E: Debug> {
    /// Log the error at warn level and drop it.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: Debug> ResultExt<T, E> for Result<T, E> {
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = ?e, "ignoring error");
                None
            }
        }
    }
}

/// Split mono samples into 10 ms frames at `sample_rate`, zero-padding the tail
/// so every frame has the same length.
pub fn ten_ms_frames(samples: &[i16], sample_rate: u32) -> impl Iterator<Item = Vec<i16>> + '_ {
    let frame_len = (sample_rate / 100).max(1) as usize;
    samples.chunks(frame_len).map(move |chunk| {
        let mut frame = chunk.to_vec();
        frame.resize(frame_len, 0);
        frame
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_padded_to_ten_ms() {
        let samples = vec![7i16; 1_000];
        let frames: Vec<_> = ten_ms_frames(&samples, 48_000).collect();
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| f.len() == 480));
        assert_eq!(frames[2][39], 7);
        assert_eq!(frames[2][40], 0);
    }

    #[test]
    fn warn_on_err_keeps_success() {
        let ok: Result<u8, &str> = Ok(3);
        assert_eq!(ok.warn_on_err(), Some(3));
        let err: Result<u8, &str> = Err("boom");
        assert_eq!(err.warn_on_err(), None);
    }
}
