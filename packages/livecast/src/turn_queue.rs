//! Ordered, growable list of not-yet-synthesized dialogue turns plus a cursor.
//!
//! `next` is a one-shot dequeue: a turn it has returned is never returned
//! again unless it is explicitly spliced back in.
use livecast_domain::DialogueTurn;

/// A turn together with its position in the show.
///
/// Indices are assigned on `append`/`splice_urgent`, increase monotonically
/// and are never reused, so a turn keeps its index when it is re-queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTurn {
    pub index: i64,
    pub turn: DialogueTurn,
}

#[derive(Debug, Default)]
pub struct TurnQueue {
    turns: Vec<QueuedTurn>,
    cursor: usize,
    next_index: i64,
}

/// Consumed turns are dropped once this many accumulate ahead of the cursor.
const COMPACT_AFTER: usize = 64;

impl TurnQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add turns at the tail, in order.
    pub fn append(&mut self, turns: impl IntoIterator<Item = DialogueTurn>) {
        for turn in turns {
            let index = self.allocate_index();
            self.turns.push(QueuedTurn { index, turn });
        }
    }

    /// The turn at the cursor, advancing it. `None` when the cursor is at the tail.
    pub fn next(&mut self) -> Option<QueuedTurn> {
        let queued = self.turns.get(self.cursor)?.clone();
        self.cursor += 1;
        self.compact();
        Some(queued)
    }

    /// Insert new turns at the cursor, ahead of everything still queued.
    pub fn splice_urgent(&mut self, turns: impl IntoIterator<Item = DialogueTurn>) {
        let fresh: Vec<QueuedTurn> = turns
            .into_iter()
            .map(|turn| QueuedTurn {
                index: self.allocate_index(),
                turn,
            })
            .collect();
        self.insert_at_cursor(fresh);
    }

    /// Splice previously dequeued turns back at the cursor, keeping their indices.
    pub fn requeue(&mut self, turns: impl IntoIterator<Item = QueuedTurn>) {
        let turns: Vec<QueuedTurn> = turns.into_iter().collect();
        self.insert_at_cursor(turns);
    }

    /// Turns still waiting at or after the cursor.
    pub fn remaining(&self) -> usize {
        self.turns.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn peek(&self) -> Option<&QueuedTurn> {
        self.turns.get(self.cursor)
    }

    /// Drop everything still queued.
    pub fn clear_pending(&mut self) {
        self.turns.truncate(self.cursor);
        self.compact();
    }

    fn insert_at_cursor(&mut self, turns: Vec<QueuedTurn>) {
        let at = self.cursor;
        self.turns.splice(at..at, turns);
    }

    fn allocate_index(&mut self) -> i64 {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    fn compact(&mut self) {
        if self.cursor >= COMPACT_AFTER || self.cursor == self.turns.len() {
            self.turns.drain(..self.cursor);
            self.cursor = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livecast_domain::{HostLineup, SpeakerSlot};

    fn turn(text: &str) -> DialogueTurn {
        let hosts = HostLineup::default();
        DialogueTurn::spoken_by(SpeakerSlot::A, &hosts.a, text)
    }

    fn texts(queue: &mut TurnQueue) -> Vec<String> {
        std::iter::from_fn(|| queue.next()).map(|q| q.turn.text).collect()
    }

    #[test]
    fn turns_come_out_in_append_order_once() {
        let mut queue = TurnQueue::new();
        queue.append([turn("a"), turn("b")]);
        queue.append([turn("c")]);

        let first = queue.next().unwrap();
        assert_eq!((first.index, first.turn.text.as_str()), (0, "a"));
        assert_eq!(texts(&mut queue), vec!["b", "c"]);
        assert!(queue.next().is_none());
        assert!(queue.next().is_none());
    }

    #[test]
    fn many_batches_never_repeat_a_turn() {
        let mut queue = TurnQueue::new();
        let mut seen = Vec::new();
        for batch in 0..40 {
            queue.append((0..3).map(|i| turn(&format!("{batch}-{i}"))));
            // Drain only part of each batch to exercise compaction mid-queue.
            for _ in 0..2 {
                seen.push(queue.next().unwrap().index);
            }
        }
        while let Some(q) = queue.next() {
            seen.push(q.index);
        }
        let expected: Vec<i64> = (0..120).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn urgent_turns_jump_ahead_of_queued_ones() {
        let mut queue = TurnQueue::new();
        queue.append([turn("1"), turn("2"), turn("3"), turn("4")]);
        queue.next();
        queue.next();

        queue.splice_urgent([turn("urgent-a"), turn("urgent-b")]);
        assert_eq!(queue.remaining(), 4);
        assert_eq!(texts(&mut queue), vec!["urgent-a", "urgent-b", "3", "4"]);
    }

    #[test]
    fn requeued_turns_keep_their_index() {
        let mut queue = TurnQueue::new();
        queue.append([turn("1"), turn("2"), turn("3")]);
        let one = queue.next().unwrap();
        let two = queue.next().unwrap();

        queue.requeue([one.clone(), two.clone()]);
        assert_eq!(queue.next(), Some(one));
        assert_eq!(queue.next(), Some(two));
        assert_eq!(queue.next().unwrap().index, 2);
    }

    #[test]
    fn splice_into_empty_queue() {
        let mut queue = TurnQueue::new();
        queue.splice_urgent([turn("only")]);
        assert_eq!(queue.peek().map(|q| q.turn.text.as_str()), Some("only"));
        assert_eq!(texts(&mut queue), vec!["only"]);
        assert!(queue.is_empty());
    }
}
