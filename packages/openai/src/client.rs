use crate::error::{Error, parse_retry_after};
use crate::prompt::{self, ChatMessage};
use crate::script::parse_script;
use async_trait::async_trait;
use livecast_domain::{DialogueGenerator, DialogueRequest, DialogueTurn, GenerationError, HostLineup};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection and sampling settings for [`OpenAiDialogueClient`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.9,
            request_timeout: Duration::from_secs(45),
        }
    }
}

impl OpenAiConfig {
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| Error::MissingApiKey)?;
        let mut config = Self {
            api_key,
            ..Self::default()
        };
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Ok(model) = std::env::var("LIVECAST_DIALOGUE_MODEL") {
            config.model = model;
        }
        Ok(config)
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// First choice's content, or a script error if there is none.
fn completion_content(body: &str) -> Result<String, Error> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| Error::Script(format!("response body: {e}")))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| Error::Script("completion has no content".into()))
}

/// [`DialogueGenerator`] over any OpenAI-compatible chat-completions API.
#[derive(Clone)]
pub struct OpenAiDialogueClient {
    inner: reqwest::Client,
    config: OpenAiConfig,
    hosts: HostLineup,
}

impl OpenAiDialogueClient {
    pub fn from_env(hosts: HostLineup) -> Result<Self, Error> {
        Self::new(OpenAiConfig::from_env()?, hosts)
    }

    pub fn new(config: OpenAiConfig, hosts: HostLineup) -> Result<Self, Error> {
        if config.api_key.is_empty() {
            return Err(Error::MissingApiKey);
        }
        let inner = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            inner,
            config,
            hosts,
        })
    }

    pub fn hosts(&self) -> &HostLineup {
        &self.hosts
    }

    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, Error> {
        let body = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let resp = self
            .inner
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(resp.headers());
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::HttpError {
                status: status.as_u16(),
                body,
                retry_after,
            });
        }

        completion_content(&resp.text().await?)
    }
}

#[async_trait]
impl DialogueGenerator for OpenAiDialogueClient {
    async fn generate(
        &self,
        request: &DialogueRequest,
    ) -> Result<Vec<DialogueTurn>, GenerationError> {
        let messages = prompt::messages(&self.hosts, request);
        let result = match self.complete(messages).await {
            Ok(content) => parse_script(&content, &self.hosts, request.turn_count),
            Err(e) => Err(e),
        };
        match result {
            Ok(turns) => {
                tracing::debug!(
                    turns = turns.len(),
                    comment_response = request.is_comment_response,
                    "generated dialogue"
                );
                Ok(turns)
            }
            Err(e) => {
                tracing::warn!(model = %self.config.model, error = %e, "dialogue generation failed");
                Err(e.into())
            }
        }
    }
}
