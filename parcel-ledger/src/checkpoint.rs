use serde::{Deserialize, Serialize};

/// Sequence number type (points in the engine's global operation order)
pub type SequenceNumber = u64;

/// One recorded (sequence, balance) pair in a holder's checkpoint history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    /// Global sequence counter value at the time the balance was recorded
    pub sequence: SequenceNumber,

    /// The holder's balance at that instant
    pub balance: u128,
}

/// Append-only checkpoint history for a single holder
///
/// Entries are strictly ordered by sequence, which is what makes the
/// binary-search historical lookup in [`CheckpointHistory::balance_at`]
/// sound. Once recorded, an entry is never altered by later transfers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointHistory {
    entries: Vec<CheckpointEntry>,
}

impl CheckpointHistory {
    /// Record the holder's balance at the given sequence
    ///
    /// If the last entry carries the same sequence (a self-transfer within
    /// one operation), it is rewritten in place rather than duplicated, so
    /// the sequence ordering stays strict.
    pub fn record(&mut self, sequence: SequenceNumber, balance: u128) {
        if let Some(last) = self.entries.last_mut() {
            debug_assert!(last.sequence <= sequence);
            if last.sequence == sequence {
                last.balance = balance;
                return;
            }
        }
        self.entries.push(CheckpointEntry { sequence, balance });
    }

    /// Balance recorded by the latest entry with `entry.sequence <= sequence`
    ///
    /// Returns 0 if no such entry exists: the holder never held units at or
    /// before that point.
    pub fn balance_at(&self, sequence: SequenceNumber) -> u128 {
        let idx = self.entries.partition_point(|e| e.sequence <= sequence);
        if idx == 0 {
            0
        } else {
            self.entries[idx - 1].balance
        }
    }

    /// Number of recorded entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The recorded entries, oldest first
    pub fn entries(&self) -> &[CheckpointEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history_reads_zero() {
        let history = CheckpointHistory::default();
        assert_eq!(history.balance_at(0), 0);
        assert_eq!(history.balance_at(u64::MAX), 0);
    }

    #[test]
    fn test_balance_at_picks_latest_entry_at_or_before() {
        let mut history = CheckpointHistory::default();
        history.record(2, 100);
        history.record(5, 70);
        history.record(9, 130);

        // Before the first entry the holder held nothing
        assert_eq!(history.balance_at(1), 0);
        // Exact hits
        assert_eq!(history.balance_at(2), 100);
        assert_eq!(history.balance_at(5), 70);
        // Between entries the most recent earlier entry wins
        assert_eq!(history.balance_at(4), 100);
        assert_eq!(history.balance_at(8), 70);
        // At or past the last entry
        assert_eq!(history.balance_at(9), 130);
        assert_eq!(history.balance_at(1_000), 130);
    }

    #[test]
    fn test_same_sequence_rewrites_in_place() {
        let mut history = CheckpointHistory::default();
        history.record(3, 10);
        history.record(3, 25);

        assert_eq!(history.len(), 1);
        assert_eq!(history.balance_at(3), 25);
    }
}
