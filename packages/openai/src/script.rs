//! Parsing of the model's labeled script into dialogue turns.
//!
//! The model answers with `{"turns": [{"speaker": .., "text": ..}, ..]}`. Any
//! other shape fails the whole call. Speaker labels are resolved against the
//! host lineup; a label that names neither host (or both) falls back to the
//! turn's position, even indexes to slot A and odd ones to slot B.
use crate::error::Error;
use livecast_domain::{DialogueTurn, HostLineup, SpeakerSlot};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Script {
    #[serde(alias = "dialogue", alias = "script")]
    turns: Vec<LabeledLine>,
}

#[derive(Debug, Deserialize)]
struct LabeledLine {
    #[serde(alias = "speaker_label", alias = "host", default)]
    speaker: Option<String>,
    text: String,
}

pub fn parse_script(
    content: &str,
    hosts: &HostLineup,
    turn_count: usize,
) -> Result<Vec<DialogueTurn>, Error> {
    let content = strip_code_fence(content);
    let script: Script = match serde_json::from_str(content) {
        Ok(script) => script,
        // Some models return the bare array.
        Err(object_err) => serde_json::from_str::<Vec<LabeledLine>>(content)
            .map(|turns| Script { turns })
            .map_err(|_| Error::Script(object_err.to_string()))?,
    };

    if script.turns.is_empty() {
        return Err(Error::Script("script contains no turns".into()));
    }

    let mut turns = Vec::with_capacity(script.turns.len().min(turn_count.max(1)));
    for (index, line) in script.turns.into_iter().enumerate() {
        let text = line.text.trim();
        if text.is_empty() {
            return Err(Error::Script(format!("turn {index} has no text")));
        }
        let label = line.speaker.as_deref().unwrap_or_default();
        let slot = match hosts.slot_for_label(label) {
            Some(slot) => slot,
            None => {
                let slot = SpeakerSlot::for_position(index);
                tracing::warn!(
                    turn = index,
                    label = %label,
                    fallback = %slot,
                    "ambiguous speaker label, assigning slot by position"
                );
                slot
            }
        };
        turns.push(DialogueTurn::spoken_by(slot, hosts.host(slot), text));
    }

    if turn_count > 0 && turns.len() > turn_count {
        tracing::debug!(requested = turn_count, received = turns.len(), "truncating script");
        turns.truncate(turn_count);
    }
    Ok(turns)
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts() -> HostLineup {
        HostLineup::default()
    }

    #[test]
    fn labeled_turns_keep_order_and_voices() {
        let content = r#"{"turns":[
            {"speaker":"A","text":"Welcome back!"},
            {"speaker":"Jordan","text":"Great to be here."},
            {"speaker":"a","text":"Let's dive in."}
        ]}"#;
        let turns = parse_script(content, &hosts(), 3).unwrap();
        let slots: Vec<_> = turns.iter().map(|t| t.speaker_slot).collect();
        assert_eq!(slots, vec![SpeakerSlot::A, SpeakerSlot::B, SpeakerSlot::A]);
        assert_eq!(turns[1].speaker_name, "Jordan");
        assert_eq!(turns[1].voice_id, hosts().b.voice_id);
        assert_eq!(turns[2].text, "Let's dive in.");
    }

    #[test]
    fn ambiguous_labels_fall_back_to_position() {
        let content = r#"{"turns":[
            {"speaker":"Narrator","text":"one"},
            {"text":"two"},
            {"speaker":"B","text":"three"},
            {"speaker":"???","text":"four"}
        ]}"#;
        let turns = parse_script(content, &hosts(), 4).unwrap();
        let slots: Vec<_> = turns.iter().map(|t| t.speaker_slot).collect();
        assert_eq!(
            slots,
            vec![SpeakerSlot::A, SpeakerSlot::B, SpeakerSlot::B, SpeakerSlot::B]
        );
    }

    #[test]
    fn fenced_and_bare_array_output_is_accepted() {
        let content = "```json\n[{\"speaker\":\"B\",\"text\":\"hi\"}]\n```";
        let turns = parse_script(content, &hosts(), 1).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].speaker_slot, SpeakerSlot::B);
    }

    #[test]
    fn other_shapes_are_malformed() {
        for content in [
            "Alex: hello there",
            r#"{"turns": []}"#,
            r#"{"lines": [{"speaker":"A","text":"x"}]}"#,
            r#"{"turns": [{"speaker":"A","text":"   "}]}"#,
        ] {
            assert!(
                matches!(parse_script(content, &hosts(), 2), Err(Error::Script(_))),
                "accepted {content}"
            );
        }
    }

    #[test]
    fn extra_turns_are_truncated() {
        let content = r#"{"turns":[{"speaker":"A","text":"1"},{"speaker":"B","text":"2"},{"speaker":"A","text":"3"}]}"#;
        assert_eq!(parse_script(content, &hosts(), 2).unwrap().len(), 2);
    }
}
