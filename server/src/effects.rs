//! Deadline queue for scheduled future mutations.
//!
//! Buff expiries, invisibility ends and respawn batches are not free-running
//! timers; they are entries in a min-heap keyed by due time. The game loop
//! sleeps until the earliest deadline and pops everything due, and each
//! popped entry is re-validated against the live world before it mutates
//! anything. That keeps every timed mutation inside the single-writer
//! boundary and makes stale entries (disconnected player, already-popped
//! buff) harmless.

use shared::PlayerId;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A scheduled future mutation. The variants carry only ids; the world is
/// consulted again at fire time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectKind {
    /// Pop one value off the player's speed stack.
    SpeedExpiry { player: PlayerId },
    /// Pop one value off the player's damage stack.
    DamageExpiry { player: PlayerId },
    /// Restore visibility unless another action already did.
    InvisibilityEnd { player: PlayerId },
    /// Re-randomize and revive every queued player still present.
    Respawn { players: Vec<PlayerId> },
}

#[derive(Debug, Clone, Eq, PartialEq)]
struct Scheduled {
    due_ms: u64,
    /// Insertion counter; ties on `due_ms` fire in schedule order.
    seq: u64,
    kind: EffectKind,
}

// BinaryHeap is a max-heap, so order by reversed (due, seq).
impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.due_ms, other.seq).cmp(&(self.due_ms, self.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap of pending effect deadlines, polled by the game loop.
#[derive(Debug, Default)]
pub struct EffectQueue {
    heap: BinaryHeap<Scheduled>,
    next_seq: u64,
}

impl EffectQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due_ms: u64, kind: EffectKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled { due_ms, seq, kind });
    }

    /// Earliest pending deadline, if any.
    pub fn next_due(&self) -> Option<u64> {
        self.heap.peek().map(|s| s.due_ms)
    }

    /// Removes and returns every effect due at or before `now_ms`, in
    /// (due, schedule) order.
    pub fn pop_due(&mut self, now_ms: u64) -> Vec<EffectKind> {
        let mut due = Vec::new();
        while let Some(head) = self.heap.peek() {
            if head.due_ms > now_ms {
                break;
            }
            due.push(self.heap.pop().map(|s| s.kind).unwrap());
        }
        due
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_queue() {
        let mut queue = EffectQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.next_due(), None);
        assert!(queue.pop_due(1_000_000).is_empty());
    }

    #[test]
    fn test_pops_in_deadline_order() {
        let mut queue = EffectQueue::new();
        queue.schedule(500, EffectKind::SpeedExpiry { player: 1 });
        queue.schedule(100, EffectKind::DamageExpiry { player: 2 });
        queue.schedule(300, EffectKind::InvisibilityEnd { player: 3 });

        assert_eq!(queue.next_due(), Some(100));

        let due = queue.pop_due(400);
        assert_eq!(
            due,
            vec![
                EffectKind::DamageExpiry { player: 2 },
                EffectKind::InvisibilityEnd { player: 3 },
            ]
        );
        assert_eq!(queue.next_due(), Some(500));
    }

    #[test]
    fn test_same_deadline_fires_in_schedule_order() {
        let mut queue = EffectQueue::new();
        queue.schedule(200, EffectKind::SpeedExpiry { player: 1 });
        queue.schedule(200, EffectKind::SpeedExpiry { player: 2 });
        queue.schedule(200, EffectKind::SpeedExpiry { player: 3 });

        let due = queue.pop_due(200);
        assert_eq!(
            due,
            vec![
                EffectKind::SpeedExpiry { player: 1 },
                EffectKind::SpeedExpiry { player: 2 },
                EffectKind::SpeedExpiry { player: 3 },
            ]
        );
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let mut queue = EffectQueue::new();
        queue.schedule(1000, EffectKind::Respawn { players: vec![4] });
        assert!(queue.pop_due(999).is_empty());
        assert_eq!(queue.pop_due(1000).len(), 1);
        assert!(queue.is_empty());
    }
}
