//! Work-stealing row-state table for the parallel block-decision pass.
//!
//! Workers are handed a contiguous row band first; once a worker exhausts
//! its band it scans the whole table for an `Untouched` row and claims it.
//! Only `Done` rows may be read as an "upper neighbour" shortcut during
//! motion search, so the transition is mutex-guarded even though each row's
//! actual block-decision work is lock-free once claimed.

use std::sync::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowState {
    Untouched,
    Processing,
    Done,
}

pub struct RowTable {
    rows: Mutex<Vec<RowState>>,
}

impl RowTable {
    pub fn new(nby: usize) -> Self {
        Self {
            rows: Mutex::new(vec![RowState::Untouched; nby]),
        }
    }

    /// Attempts to claim `row` (transition `Untouched -> Processing`).
    /// Returns `false` if it was already claimed or finished.
    pub fn claim(&self, row: usize) -> bool {
        let mut rows = self.rows.lock().unwrap();
        if rows[row] == RowState::Untouched {
            rows[row] = RowState::Processing;
            true
        } else {
            false
        }
    }

    /// Scans for any `Untouched` row and claims the first one found, for a
    /// worker that has exhausted its own band.
    pub fn steal(&self) -> Option<usize> {
        let mut rows = self.rows.lock().unwrap();
        let idx = rows.iter().position(|&s| s == RowState::Untouched)?;
        rows[idx] = RowState::Processing;
        Some(idx)
    }

    pub fn mark_done(&self, row: usize) {
        let mut rows = self.rows.lock().unwrap();
        rows[row] = RowState::Done;
    }

    pub fn is_done(&self, row: usize) -> bool {
        self.rows.lock().unwrap()[row] == RowState::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_is_exclusive() {
        let table = RowTable::new(4);
        assert!(table.claim(0));
        assert!(!table.claim(0));
    }

    #[test]
    fn steal_only_finds_untouched_rows() {
        let table = RowTable::new(3);
        table.claim(0);
        table.mark_done(0);
        assert_eq!(table.steal(), Some(1));
        assert_eq!(table.steal(), Some(2));
        assert_eq!(table.steal(), None);
    }

    #[test]
    fn upper_neighbour_only_usable_once_done() {
        let table = RowTable::new(2);
        table.claim(0);
        assert!(!table.is_done(0));
        table.mark_done(0);
        assert!(table.is_done(0));
    }
}
