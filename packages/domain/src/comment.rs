//! Listener comments and the batches the intake bridge collects them into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single listener comment as persisted by the comment store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            text: text.into(),
            created_at,
        }
    }
}

/// Which detection rule produced a batch. Exactly one fires per detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchTrigger {
    /// Unprocessed comment count reached the threshold.
    Count,
    /// The checkpoint interval elapsed with at least one comment pending.
    Interval,
}

/// An ordered group of comments handed to the orchestrator in one piece.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentBatch {
    pub comments: Vec<Comment>,
    pub collected_at: DateTime<Utc>,
    pub trigger: BatchTrigger,
}

impl CommentBatch {
    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// Checkpoint that marks every comment of this batch as consumed:
    /// the newest `created_at` in the batch.
    pub fn high_water_mark(&self) -> Option<DateTime<Utc>> {
        self.comments.iter().map(|c| c.created_at).max()
    }
}
