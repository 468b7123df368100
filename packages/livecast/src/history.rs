use livecast_domain::DialogueTurn;
use std::collections::VecDeque;

/// The last few turns that were synthesized, for generator continuity.
#[derive(Debug, Clone)]
pub struct RollingHistory {
    capacity: usize,
    turns: VecDeque<(i64, DialogueTurn)>,
}

impl RollingHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            turns: VecDeque::with_capacity(capacity),
        }
    }

    /// Record a turn. A turn index already present (a re-synthesized turn) is ignored.
    pub fn record(&mut self, index: i64, turn: &DialogueTurn) {
        if self.capacity == 0 || self.turns.iter().any(|(i, _)| *i == index) {
            return;
        }
        if self.turns.len() == self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back((index, turn.clone()));
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// `"<speaker>: <text>"` lines, oldest first.
    pub fn prior_context(&self) -> Option<String> {
        if self.turns.is_empty() {
            return None;
        }
        let lines: Vec<String> = self.turns.iter().map(|(_, t)| t.as_script_line()).collect();
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livecast_domain::{HostLineup, SpeakerSlot};

    fn turn(text: &str) -> DialogueTurn {
        DialogueTurn::spoken_by(SpeakerSlot::A, &HostLineup::default().a, text)
    }

    #[test]
    fn keeps_only_the_newest_turns() {
        let mut history = RollingHistory::new(2);
        history.record(0, &turn("one"));
        history.record(1, &turn("two"));
        history.record(2, &turn("three"));
        assert_eq!(history.prior_context().unwrap(), "Alex: two\nAlex: three");
    }

    #[test]
    fn resynthesized_turns_are_not_repeated() {
        let mut history = RollingHistory::new(5);
        history.record(3, &turn("hello"));
        history.record(3, &turn("hello"));
        history.record(-1, &turn("thanks for the comments"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn empty_history_has_no_context() {
        assert_eq!(RollingHistory::new(5).prior_context(), None);
    }
}
