//! Chat messages for one dialogue request.
use livecast_domain::{DialogueRequest, HostLineup};
use serde::Serialize;
use std::fmt::Write as _;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

const DEFAULT_TOPIC: &str =
    "Whatever is interesting today: tech, culture, science, and the stories behind them.";

pub fn system_prompt(hosts: &HostLineup) -> String {
    format!(
        "You write the script for a live two-host podcast that is broadcast to listeners in \
         real time. The hosts are {a} (speaker \"A\") and {b} (speaker \"B\"). They are warm, \
         curious and conversational, they react to each other, and every line is meant to be \
         spoken aloud: no stage directions, no emojis, no markdown.\n\
         Respond with a JSON object of the form \
         {{\"turns\": [{{\"speaker\": \"A\", \"text\": \"...\"}}, {{\"speaker\": \"B\", \"text\": \"...\"}}]}}. \
         The speaker field must be \"A\" or \"B\".",
        a = hosts.a.name,
        b = hosts.b.name,
    )
}

pub fn user_prompt(request: &DialogueRequest) -> String {
    let mut prompt = String::new();
    let topic = request
        .topic_prompt
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TOPIC);
    let _ = writeln!(prompt, "Show topic: {topic}");

    if let Some(context) = request.prior_context.as_deref().filter(|c| !c.trim().is_empty()) {
        let _ = writeln!(prompt, "\nThe conversation so far ended with:\n{context}");
    }

    match request.comments.as_deref() {
        Some(comments) if request.is_comment_response && !comments.is_empty() => {
            let _ = writeln!(
                prompt,
                "\nListeners just sent these comments in the live chat:"
            );
            for comment in comments {
                let _ = writeln!(prompt, "- {}: {}", comment.username, comment.text);
            }
            let _ = writeln!(
                prompt,
                "\nWrite the next {} turns. The hosts notice the chat right away, read out or \
                 paraphrase a few of the comments, thank listeners by name, and respond to them \
                 before steering back to the topic.",
                request.turn_count
            );
        }
        _ => {
            let _ = writeln!(
                prompt,
                "\nWrite the next {} turns, continuing naturally from where the hosts left off \
                 without repeating earlier points.",
                request.turn_count
            );
        }
    }
    prompt
}

pub fn messages(hosts: &HostLineup, request: &DialogueRequest) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system",
            content: system_prompt(hosts),
        },
        ChatMessage {
            role: "user",
            content: user_prompt(request),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use livecast_domain::Comment;

    #[test]
    fn continuation_prompt_carries_context_and_topic() {
        let request = DialogueRequest::continuation(
            6,
            Some("Alex: so the rover landed\nJordan: on Mars!".into()),
            Some("Space exploration".into()),
        );
        let prompt = user_prompt(&request);
        assert!(prompt.contains("Show topic: Space exploration"));
        assert!(prompt.contains("Jordan: on Mars!"));
        assert!(prompt.contains("next 6 turns"));
        assert!(!prompt.contains("live chat"));
    }

    #[test]
    fn comment_prompt_lists_every_comment() {
        let request = DialogueRequest::comment_response(
            4,
            None,
            vec![
                Comment::new("1", "sam", "love this episode", Utc::now()),
                Comment::new("2", "kit", "what about Venus?", Utc::now()),
            ],
            None,
        );
        let prompt = user_prompt(&request);
        assert!(prompt.contains("- sam: love this episode"));
        assert!(prompt.contains("- kit: what about Venus?"));
        assert!(prompt.contains(DEFAULT_TOPIC));
    }

    #[test]
    fn system_prompt_names_both_hosts() {
        let prompt = system_prompt(&HostLineup::default());
        assert!(prompt.contains("Alex (speaker \"A\")"));
        assert!(prompt.contains("Jordan (speaker \"B\")"));
    }
}
