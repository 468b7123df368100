//! Comment Intake Bridge.
//!
//! Owns the room's comment checkpoint. A batch returned by [`CommentIntakeBridge::poll`]
//! stays in flight until it is acknowledged (checkpoint advanced) or released
//! (redelivered on the next poll), so a comment never lands in two batches.
use chrono::{DateTime, Utc};
use livecast_domain::{BatchTrigger, CommentBatch, CommentStore, RoomId, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub struct CommentIntakeBridge {
    store: Arc<dyn CommentStore>,
    room: RoomId,
    count_threshold: usize,
    interval: Duration,
    /// Comments at or before this instant are consumed.
    checkpoint: DateTime<Utc>,
    last_checkpoint_at: Instant,
    in_flight: bool,
    unsynced_checkpoint: Option<DateTime<Utc>>,
}

impl CommentIntakeBridge {
    /// Create the bridge, resuming from the store's persisted checkpoint.
    pub async fn open(
        store: Arc<dyn CommentStore>,
        room: RoomId,
        count_threshold: usize,
        interval: Duration,
    ) -> Self {
        let checkpoint = match store.load_checkpoint(&room).await {
            Ok(Some(at)) => at,
            Ok(None) => Utc::now(),
            Err(e) => {
                warn!(room = %room, error = %e, "could not load comment checkpoint; starting from now");
                Utc::now()
            }
        };
        debug!(room = %room, %checkpoint, "comment intake ready");
        Self {
            store,
            room,
            count_threshold,
            interval,
            checkpoint,
            last_checkpoint_at: Instant::now(),
            in_flight: false,
            unsynced_checkpoint: None,
        }
    }

    pub fn checkpoint(&self) -> DateTime<Utc> {
        self.checkpoint
    }

    pub fn has_batch_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Collect a batch if either trigger fires.
    ///
    /// The count trigger takes precedence: a batch reports `Count` when the
    /// unprocessed comments reach the threshold, and `Interval` when the
    /// interval since the last checkpoint has elapsed with at least one pending.
    pub async fn poll(&mut self) -> Result<Option<CommentBatch>, StoreError> {
        self.sync_checkpoint().await;
        if self.in_flight {
            return Ok(None);
        }

        let comments = self
            .store
            .unprocessed_comments(&self.room, Some(self.checkpoint))
            .await?;
        if comments.is_empty() {
            return Ok(None);
        }

        let trigger = if comments.len() >= self.count_threshold {
            BatchTrigger::Count
        } else if self.last_checkpoint_at.elapsed() >= self.interval {
            BatchTrigger::Interval
        } else {
            return Ok(None);
        };

        info!(room = %self.room, comments = comments.len(), ?trigger, "comment batch detected");
        self.in_flight = true;
        Ok(Some(CommentBatch {
            comments,
            collected_at: Utc::now(),
            trigger,
        }))
    }

    /// Mark `batch` consumed.
    ///
    /// The local cursor moves immediately, so the batch is never redelivered.
    /// A failed remote write is reported and retried at the start of the next poll.
    pub async fn acknowledge(&mut self, batch: &CommentBatch) -> Result<(), StoreError> {
        self.in_flight = false;
        let Some(mark) = batch.high_water_mark() else {
            return Ok(());
        };
        if mark > self.checkpoint {
            self.checkpoint = mark;
        }
        self.last_checkpoint_at = Instant::now();
        self.unsynced_checkpoint = Some(self.checkpoint);
        self.write_checkpoint().await
    }

    /// Give an unconsumed batch back; the next poll redelivers its comments.
    pub fn release(&mut self, batch: CommentBatch) {
        debug!(room = %self.room, comments = batch.len(), "comment batch released");
        self.in_flight = false;
    }

    async fn sync_checkpoint(&mut self) {
        if self.unsynced_checkpoint.is_some() {
            if let Err(e) = self.write_checkpoint().await {
                warn!(room = %self.room, error = %e, "checkpoint write still failing");
            }
        }
    }

    async fn write_checkpoint(&mut self) -> Result<(), StoreError> {
        let Some(at) = self.unsynced_checkpoint else {
            return Ok(());
        };
        match self.store.advance_checkpoint(&self.room, at).await {
            Ok(()) => {
                self.unsynced_checkpoint = None;
                Ok(())
            }
            Err(e) => Err(match e {
                StoreError::CheckpointWrite(reason) => StoreError::CheckpointWrite(reason),
                other => StoreError::CheckpointWrite(other.to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use livecast_domain::Comment;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct Store {
        comments: Mutex<Vec<Comment>>,
        checkpoint: Mutex<Option<DateTime<Utc>>>,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl CommentStore for Store {
        async fn unprocessed_comments(
            &self,
            _: &RoomId,
            since: Option<DateTime<Utc>>,
        ) -> Result<Vec<Comment>, StoreError> {
            Ok(self
                .comments
                .lock()
                .iter()
                .filter(|c| since.is_none_or(|s| c.created_at > s))
                .cloned()
                .collect())
        }

        async fn advance_checkpoint(&self, _: &RoomId, at: DateTime<Utc>) -> Result<(), StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Request("503".into()));
            }
            *self.checkpoint.lock() = Some(at);
            Ok(())
        }

        async fn room_topic_prompt(&self, _: &RoomId) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        async fn load_checkpoint(&self, _: &RoomId) -> Result<Option<DateTime<Utc>>, StoreError> {
            Ok(*self.checkpoint.lock())
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn comment(n: i64) -> Comment {
        Comment::new(
            n.to_string(),
            format!("listener{n}"),
            format!("comment {n}"),
            t0() + chrono::Duration::seconds(n),
        )
    }

    async fn bridge(store: &Arc<Store>, threshold: usize) -> CommentIntakeBridge {
        *store.checkpoint.lock() = Some(t0());
        CommentIntakeBridge::open(
            store.clone(),
            RoomId::from("room"),
            threshold,
            Duration::from_secs(120),
        )
        .await
    }

    #[tokio::test(start_paused = true)]
    async fn threshold_triggers_one_batch() {
        let store = Arc::new(Store::default());
        let mut bridge = bridge(&store, 50).await;

        for n in 1..50 {
            store.comments.lock().push(comment(n));
            assert!(bridge.poll().await.unwrap().is_none(), "fired early at {n}");
        }
        store.comments.lock().push(comment(50));
        let batch = bridge.poll().await.unwrap().unwrap();
        assert_eq!(batch.len(), 50);
        assert_eq!(batch.trigger, BatchTrigger::Count);

        store.comments.lock().push(comment(51));
        assert!(bridge.poll().await.unwrap().is_none());
        bridge.acknowledge(&batch).await.unwrap();
        assert_eq!(*store.checkpoint.lock(), Some(t0() + chrono::Duration::seconds(50)));
        assert!(bridge.poll().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn interval_triggers_with_any_pending_comment() {
        let store = Arc::new(Store::default());
        let mut bridge = bridge(&store, 50).await;

        tokio::time::advance(Duration::from_secs(121)).await;
        assert!(bridge.poll().await.unwrap().is_none());

        store.comments.lock().push(comment(1));
        let batch = bridge.poll().await.unwrap().unwrap();
        assert_eq!(batch.trigger, BatchTrigger::Interval);
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_polls_deliver_once() {
        let store = Arc::new(Store::default());
        let mut bridge = bridge(&store, 1).await;
        store.comments.lock().push(comment(1));

        let first = bridge.poll().await.unwrap();
        let second = bridge.poll().await.unwrap();
        assert_eq!(first.iter().chain(second.iter()).count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn released_batch_is_redelivered() {
        let store = Arc::new(Store::default());
        let mut bridge = bridge(&store, 1).await;
        store.comments.lock().push(comment(1));

        let batch = bridge.poll().await.unwrap().unwrap();
        assert!(bridge.has_batch_in_flight());
        let comments = batch.comments.clone();
        bridge.release(batch);

        let again = bridge.poll().await.unwrap().unwrap();
        assert_eq!(again.comments, comments);
        assert_eq!(*store.checkpoint.lock(), Some(t0()));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_checkpoint_write_is_reported_and_retried() {
        let store = Arc::new(Store::default());
        let mut bridge = bridge(&store, 1).await;
        store.comments.lock().push(comment(5));

        store.fail_writes.store(true, Ordering::SeqCst);
        let batch = bridge.poll().await.unwrap().unwrap();
        let err = bridge.acknowledge(&batch).await.unwrap_err();
        assert!(matches!(err, StoreError::CheckpointWrite(_)));
        // The local cursor moved anyway.
        assert_eq!(bridge.checkpoint(), t0() + chrono::Duration::seconds(5));
        assert!(bridge.poll().await.unwrap().is_none());
        assert_eq!(*store.checkpoint.lock(), Some(t0()));

        store.fail_writes.store(false, Ordering::SeqCst);
        assert!(bridge.poll().await.unwrap().is_none());
        assert_eq!(*store.checkpoint.lock(), Some(t0() + chrono::Duration::seconds(5)));
    }
}
