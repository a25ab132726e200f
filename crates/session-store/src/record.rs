//! Per-session detection state

use serde::{Deserialize, Serialize};

/// Debounce state for one game session (tracked over time)
#[derive(Debug, Clone, Default)]
pub struct SessionRecord {
    /// Consecutive frames classified as a hit, reset on any miss
    pub consecutive_hit_count: u32,

    /// Client-supplied timestamp of the most recent evaluated frame (ms).
    /// Not assumed monotonic.
    pub last_update_ms: Option<f64>,

    /// Timestamp of the frame that first satisfied the debounce (ms).
    /// Set once; cleared only by reset.
    pub confirmed_at_ms: Option<f64>,

    /// Sticky game-over flag. Set iff `confirmed_at_ms` is set.
    pub terminal: bool,

    /// Highest frame sequence number seen (advisory ordering telemetry)
    pub max_frame_seq: Option<u64>,
}

impl SessionRecord {
    /// Return to the zero-initialized state
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Check the record's internal invariants.
    ///
    /// `terminal` and `confirmed_at_ms` must agree; a mismatch means the
    /// single-writer discipline was violated somewhere.
    pub fn invariants_hold(&self) -> bool {
        self.terminal == self.confirmed_at_ms.is_some()
    }

    /// Read-only projection of the current fields
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            consecutive_hit_count: self.consecutive_hit_count,
            last_update_ms: self.last_update_ms,
            confirmed_at_ms: self.confirmed_at_ms,
            game_over: self.terminal,
        }
    }
}

/// Immutable view of a session's state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub consecutive_hit_count: u32,
    pub last_update_ms: Option<f64>,
    pub confirmed_at_ms: Option<f64>,
    pub game_over: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_restores_default() {
        let mut record = SessionRecord {
            consecutive_hit_count: 5,
            last_update_ms: Some(1000.0),
            confirmed_at_ms: Some(1000.0),
            terminal: true,
            max_frame_seq: Some(42),
        };

        record.reset();

        assert_eq!(record.consecutive_hit_count, 0);
        assert!(record.last_update_ms.is_none());
        assert!(record.confirmed_at_ms.is_none());
        assert!(!record.terminal);
    }

    #[test]
    fn test_invariants() {
        let mut record = SessionRecord::default();
        assert!(record.invariants_hold());

        record.terminal = true;
        assert!(!record.invariants_hold());

        record.confirmed_at_ms = Some(123.0);
        assert!(record.invariants_hold());
    }

    #[test]
    fn test_snapshot_projection() {
        let record = SessionRecord {
            consecutive_hit_count: 2,
            last_update_ms: Some(99.5),
            confirmed_at_ms: None,
            terminal: false,
            max_frame_seq: None,
        };

        let snap = record.snapshot();
        assert_eq!(snap.consecutive_hit_count, 2);
        assert_eq!(snap.last_update_ms, Some(99.5));
        assert!(!snap.game_over);
    }
}
