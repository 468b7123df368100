//! In-process [`CommentStore`] for local runs and tests.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use livecast_domain::{Comment, CommentStore, RoomId, StoreError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default, Clone)]
struct RoomRecord {
    topic_prompt: Option<String>,
    checkpoint: Option<DateTime<Utc>>,
    comments: Vec<Comment>,
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    rooms: Arc<Mutex<HashMap<RoomId, RoomRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_room(&self, room: &RoomId, topic_prompt: Option<String>) {
        self.rooms.lock().entry(room.clone()).or_default().topic_prompt = topic_prompt;
    }

    /// Append a comment. Comments are kept ordered by `created_at`.
    pub fn add_comment(&self, room: &RoomId, comment: Comment) {
        let mut rooms = self.rooms.lock();
        let comments = &mut rooms.entry(room.clone()).or_default().comments;
        let at = comments.partition_point(|c| c.created_at <= comment.created_at);
        comments.insert(at, comment);
    }

    pub fn checkpoint(&self, room: &RoomId) -> Option<DateTime<Utc>> {
        self.rooms.lock().get(room).and_then(|r| r.checkpoint)
    }

    fn with_room<T>(
        &self,
        room: &RoomId,
        f: impl FnOnce(&mut RoomRecord) -> T,
    ) -> Result<T, StoreError> {
        let mut rooms = self.rooms.lock();
        rooms
            .get_mut(room)
            .map(f)
            .ok_or_else(|| StoreError::RoomNotFound(room.to_string()))
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn unprocessed_comments(
        &self,
        room: &RoomId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Comment>, StoreError> {
        self.with_room(room, |record| {
            record
                .comments
                .iter()
                .filter(|c| since.is_none_or(|since| c.created_at > since))
                .cloned()
                .collect()
        })
    }

    async fn advance_checkpoint(&self, room: &RoomId, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.with_room(room, |record| {
            record.checkpoint = Some(record.checkpoint.map_or(at, |prev| prev.max(at)));
        })
        .map_err(|e| StoreError::CheckpointWrite(e.to_string()))
    }

    async fn room_topic_prompt(&self, room: &RoomId) -> Result<Option<String>, StoreError> {
        self.with_room(room, |record| record.topic_prompt.clone())
    }

    async fn load_checkpoint(&self, room: &RoomId) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.with_room(room, |record| record.checkpoint)
    }
}
