//! # One-shot Result Cell
//!
//! Write-once slot for the round's outcome. Written by the owner, read
//! by anyone. `OnceLock` gives the happens-before edge between the write
//! and every later read on any thread.

use std::fmt;
use std::sync::OnceLock;

use crate::domain::{Outcome, Phase, RendezvousError};

/// Write-once outcome slot.
pub struct ResultCell<T> {
    slot: OnceLock<Outcome<T>>,
}

impl<T> ResultCell<T> {
    /// Empty cell.
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// Fill the cell. A second fill is rejected and leaves the first
    /// outcome untouched.
    pub fn fill(&self, outcome: Outcome<T>) -> Result<(), RendezvousError> {
        let settled = Phase::settled(&outcome);
        self.slot
            .set(outcome)
            .map_err(|_| RendezvousError::InvalidTransition {
                from: self.phase().to_string(),
                to: settled.to_string(),
            })
    }

    /// Outcome, once written.
    pub fn get(&self) -> Option<&Outcome<T>> {
        self.slot.get()
    }

    /// Whether the cell has been written.
    pub fn is_filled(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Phase as visible from outside the owner: `Pending` until written.
    pub fn phase(&self) -> Phase {
        match self.slot.get() {
            None => Phase::Pending,
            Some(outcome) => Phase::settled(outcome),
        }
    }
}

impl<T> Default for ResultCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for ResultCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCell").field("slot", &self.slot.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_new_cell_is_empty() {
        let cell: ResultCell<u32> = ResultCell::new();
        assert!(!cell.is_filled());
        assert!(cell.get().is_none());
        assert_eq!(cell.phase(), Phase::Pending);
    }

    #[test]
    fn test_fill_value() {
        let cell = ResultCell::new();
        cell.fill(Ok(42u32)).unwrap();
        assert!(matches!(cell.get(), Some(Ok(42))));
        assert_eq!(cell.phase(), Phase::Resolved);
    }

    #[test]
    fn test_fill_failure() {
        let cell: ResultCell<u32> = ResultCell::new();
        cell.fill(Err(RendezvousError::generator(anyhow::anyhow!("boom"))))
            .unwrap();
        assert_eq!(cell.phase(), Phase::Failed);
        assert!(cell.get().unwrap().as_ref().unwrap_err().to_string().contains("boom"));
    }

    #[test]
    fn test_second_fill_rejected() {
        let cell = ResultCell::new();
        cell.fill(Ok(1u32)).unwrap();

        let second = cell.fill(Ok(2));
        assert!(matches!(
            second,
            Err(RendezvousError::InvalidTransition { .. })
        ));
        assert!(matches!(cell.get(), Some(Ok(1))));
    }

    #[test]
    fn test_visible_from_other_threads() {
        let cell = Arc::new(ResultCell::new());
        cell.fill(Ok(String::from("v7"))).unwrap();

        let reader = Arc::clone(&cell);
        let seen = std::thread::spawn(move || reader.get().cloned())
            .join()
            .unwrap();
        assert_eq!(seen.unwrap().unwrap(), "v7");
    }
}
