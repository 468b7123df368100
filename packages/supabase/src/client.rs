use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use livecast_domain::{Comment, CommentStore, RoomId, StoreError};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

/// PostgREST endpoint and table names.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SupabaseConfig {
    pub url: String,
    pub api_key: String,
    pub comments_table: String,
    pub rooms_table: String,
    pub request_timeout: Duration,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            comments_table: "comments".to_string(),
            rooms_table: "rooms".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl SupabaseConfig {
    pub fn from_env() -> Result<Self, StoreError> {
        let url = std::env::var("SUPABASE_URL")
            .map_err(|_| StoreError::Request("SUPABASE_URL is not set".into()))?;
        let api_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
            .or_else(|_| std::env::var("SUPABASE_ANON_KEY"))
            .map_err(|_| {
                StoreError::Request(
                    "set SUPABASE_SERVICE_ROLE_KEY or SUPABASE_ANON_KEY".into(),
                )
            })?;
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            api_key,
            ..Self::default()
        })
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url.trim_end_matches('/'), table)
    }
}

#[derive(Debug, Deserialize)]
struct CommentRow {
    id: Value,
    #[serde(default)]
    username: Option<String>,
    #[serde(alias = "content", alias = "message")]
    text: String,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        let id = match row.id {
            Value::String(id) => id,
            other => other.to_string(),
        };
        Comment {
            id,
            username: row.username.unwrap_or_else(|| "listener".to_string()),
            text: row.text,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RoomRow {
    #[serde(default)]
    topic_prompt: Option<String>,
    #[serde(default)]
    comments_checkpoint: Option<DateTime<Utc>>,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn comment_query(room: &RoomId, since: Option<DateTime<Utc>>) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("select", "id,username,text,created_at".to_string()),
        ("room_id", format!("eq.{room}")),
        ("order", "created_at.asc".to_string()),
    ];
    if let Some(since) = since {
        query.push(("created_at", format!("gt.{}", timestamp(since))));
    }
    query
}

/// [`CommentStore`] over Supabase's PostgREST interface.
#[derive(Clone)]
pub struct SupabaseStore {
    inner: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseStore {
    pub fn from_env() -> Result<Self, StoreError> {
        Self::new(SupabaseConfig::from_env()?)
    }

    pub fn new(config: SupabaseConfig) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| StoreError::Request(format!("api key: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| StoreError::Request(format!("api key: {e}")))?;
        headers.insert("apikey", key);
        headers.insert(reqwest::header::AUTHORIZATION, bearer);

        let inner = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StoreError::Request(e.to_string()))?;
        Ok(Self { inner, config })
    }

    async fn room_row(&self, room: &RoomId) -> Result<RoomRow, StoreError> {
        let resp = self
            .inner
            .get(self.config.table_url(&self.config.rooms_table))
            .query(&[
                ("id", format!("eq.{room}")),
                ("select", "topic_prompt,comments_checkpoint".to_string()),
            ])
            .send()
            .await
            .map_err(request_error)?;
        let rows: Vec<RoomRow> = checked(resp).await?.json().await.map_err(request_error)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::RoomNotFound(room.to_string()))
    }
}

fn request_error(err: reqwest::Error) -> StoreError {
    StoreError::Request(err.to_string())
}

async fn checked(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Request(format!("{status}: {body}")))
}

#[async_trait]
impl CommentStore for SupabaseStore {
    async fn unprocessed_comments(
        &self,
        room: &RoomId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Comment>, StoreError> {
        let resp = self
            .inner
            .get(self.config.table_url(&self.config.comments_table))
            .query(&comment_query(room, since))
            .send()
            .await
            .map_err(request_error)?;
        let rows: Vec<CommentRow> = checked(resp).await?.json().await.map_err(request_error)?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn advance_checkpoint(&self, room: &RoomId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let write_failed = |reason: String| StoreError::CheckpointWrite(reason);
        let resp = self
            .inner
            .patch(self.config.table_url(&self.config.rooms_table))
            .query(&[("id", format!("eq.{room}"))])
            .header("Prefer", "return=representation")
            .json(&json!({ "comments_checkpoint": timestamp(at) }))
            .send()
            .await
            .map_err(|e| write_failed(e.to_string()))?;
        let resp = checked(resp).await.map_err(|e| write_failed(e.to_string()))?;
        let updated: Vec<Value> = resp.json().await.map_err(|e| write_failed(e.to_string()))?;
        if updated.is_empty() {
            return Err(StoreError::RoomNotFound(room.to_string()));
        }
        tracing::debug!(room = %room, checkpoint = %timestamp(at), "checkpoint advanced");
        Ok(())
    }

    async fn room_topic_prompt(&self, room: &RoomId) -> Result<Option<String>, StoreError> {
        Ok(self
            .room_row(room)
            .await?
            .topic_prompt
            .filter(|t| !t.trim().is_empty()))
    }

    async fn load_checkpoint(&self, room: &RoomId) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.room_row(room).await?.comments_checkpoint)
    }
}
