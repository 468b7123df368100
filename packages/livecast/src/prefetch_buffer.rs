//! Bounded FIFO of synthesized segments waiting to be played.
use livecast_domain::AudioSegment;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;

/// Segments are owned by the buffer until the playback driver pops them.
///
/// The target depth only bounds normal pushes. A comment response replaces
/// the pending segments in one piece and may leave the buffer above depth
/// until it drains.
#[derive(Debug)]
pub struct PrefetchBuffer {
    depth: usize,
    segments: Mutex<VecDeque<AudioSegment>>,
    available: Notify,
}

impl PrefetchBuffer {
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            segments: Mutex::new(VecDeque::with_capacity(depth)),
            available: Notify::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Append at the tail. Hands the segment back when the buffer is at depth.
    pub fn try_push(&self, segment: AudioSegment) -> Result<(), AudioSegment> {
        {
            let mut segments = self.segments.lock();
            if segments.len() >= self.depth {
                return Err(segment);
            }
            segments.push_back(segment);
        }
        self.available.notify_one();
        Ok(())
    }

    pub fn pop(&self) -> Option<AudioSegment> {
        self.segments.lock().pop_front()
    }

    /// Wait until a segment is available and take it. Meant for a single consumer.
    pub async fn pop_wait(&self) -> AudioSegment {
        loop {
            let notified = self.available.notified();
            if let Some(segment) = self.pop() {
                return segment;
            }
            notified.await;
        }
    }

    /// Replace every pending normal segment with `comment_segments`.
    ///
    /// Comment segments already waiting stay at the front, followed by the new
    /// ones. Returns the discarded normal segments in their original order.
    pub fn replace_pending(&self, comment_segments: Vec<AudioSegment>) -> Vec<AudioSegment> {
        let discarded = {
            let mut segments = self.segments.lock();
            let (kept, discarded): (VecDeque<_>, VecDeque<_>) = segments
                .drain(..)
                .partition(|segment| segment.is_comment_response());
            *segments = kept;
            segments.extend(comment_segments);
            Vec::from(discarded)
        };
        self.available.notify_one();
        discarded
    }

    pub fn len(&self) -> usize {
        self.segments.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.depth
    }

    /// Indices of the pending segments, head first.
    pub fn pending_indices(&self) -> Vec<i64> {
        self.segments
            .lock()
            .iter()
            .map(|segment| segment.source_turn_index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livecast_domain::{DialogueTurn, HostLineup, PcmAudio, SpeakerSlot};
    use std::sync::Arc;
    use std::time::Duration;

    fn segment(index: i64) -> AudioSegment {
        let hosts = HostLineup::default();
        let turn = DialogueTurn::spoken_by(SpeakerSlot::B, &hosts.b, format!("line {index}"));
        AudioSegment::new(PcmAudio::mono(vec![0; 480], 48_000), index, turn)
    }

    #[test]
    fn rejects_pushes_at_depth() {
        let buffer = PrefetchBuffer::new(2);
        assert!(buffer.try_push(segment(0)).is_ok());
        assert!(buffer.try_push(segment(1)).is_ok());
        assert!(buffer.is_full());

        let rejected = buffer.try_push(segment(2)).unwrap_err();
        assert_eq!(rejected.source_turn_index, 2);
        assert_eq!(buffer.pop().map(|s| s.source_turn_index), Some(0));
        assert!(buffer.try_push(rejected).is_ok());
        assert_eq!(buffer.pending_indices(), vec![1, 2]);
    }

    #[test]
    fn comment_response_displaces_normal_segments() {
        let buffer = PrefetchBuffer::new(3);
        for i in [3, 4, 5] {
            buffer.try_push(segment(i)).unwrap();
        }

        let discarded = buffer.replace_pending(vec![segment(-1), segment(-2)]);
        let discarded: Vec<i64> = discarded.iter().map(|s| s.source_turn_index).collect();
        assert_eq!(discarded, vec![3, 4, 5]);
        assert_eq!(buffer.pending_indices(), vec![-1, -2]);
    }

    #[test]
    fn earlier_comment_segments_stay_ahead() {
        let buffer = PrefetchBuffer::new(2);
        buffer.replace_pending(vec![segment(-1)]);
        buffer.try_push(segment(7)).unwrap();

        let discarded = buffer.replace_pending(vec![segment(-2), segment(-3)]);
        assert_eq!(discarded.len(), 1);
        assert_eq!(buffer.pending_indices(), vec![-1, -2, -3]);
        assert!(buffer.is_full());
    }

    #[tokio::test(start_paused = true)]
    async fn pop_wait_wakes_on_push() {
        let buffer = Arc::new(PrefetchBuffer::new(3));
        let consumer = {
            let buffer = buffer.clone();
            tokio::spawn(async move { buffer.pop_wait().await.source_turn_index })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!consumer.is_finished());
        buffer.try_push(segment(9)).unwrap();
        assert_eq!(consumer.await.unwrap(), 9);
        assert!(buffer.is_empty());
    }
}
