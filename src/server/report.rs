//! Final collection report

use std::fmt;
use std::time::Duration;

use crate::client::Identity;
use crate::pool::Scoreboard;

/// Outcome of a collection run, captured once at shutdown.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub capacity: usize,
    pub scoreboard: Scoreboard,
    pub elapsed: Duration,
    /// Session whose admission filled the pool; `None` if the run was interrupted.
    pub triggered_by: Option<Identity>,
}

impl Report {
    /// Number of admitted values across all producers.
    pub fn total(&self) -> usize {
        self.scoreboard.values().sum()
    }

    pub fn is_complete(&self) -> bool {
        self.total() == self.capacity
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Collected {} of {} numbers", self.total(), self.capacity)?;
        writeln!(f, "---SCORES---")?;
        for (identity, count) in &self.scoreboard {
            writeln!(f, "Client {}: {} numbers", identity, count)?;
        }
        write!(
            f,
            "Time taken to collect {} primes: {:?}",
            self.total(),
            self.elapsed
        )
    }
}
