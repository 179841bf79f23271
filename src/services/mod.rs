//! Domain services. Each service owns the business rules for one resource
//! group and is handed the shared connection pool plus the event sender.

pub mod categories;
pub mod commerce;
pub mod ingredients;
pub mod inventory;
pub mod modifiers;
pub mod procurement;
pub mod recipes;
pub mod units;

use serde::Serialize;

/// Outcome of a batch create: per-item results, no silent skips.
///
/// Each entry is validated and persisted independently; a bad entry never
/// fails the rest of the batch, and every failure reports which entry and
/// why.
#[derive(Debug, Serialize)]
pub struct BatchOutcome<T> {
    pub created: Vec<T>,
    pub failed: Vec<BatchFailure>,
}

#[derive(Debug, Serialize)]
pub struct BatchFailure {
    pub name: String,
    pub reason: String,
}

impl<T> BatchOutcome<T> {
    pub fn new() -> Self {
        Self {
            created: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self::new()
    }
}
