//! Wall-clock and iteration budgets of orchestrator operations.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Limit of a budgeted operation: a wall-clock duration and optionally a
/// number of iterations. Whichever runs out first ends the operation.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use msa_routing::manager::Budget;
///
/// let mut clock = Budget::time(Duration::from_secs(60)).with_iterations(2).start();
/// assert!(!clock.is_exhausted());
/// clock.tick();
/// clock.tick();
/// assert!(clock.is_exhausted());
///
/// assert!(Budget::zero().start().is_exhausted());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    time: Duration,
    iterations: Option<usize>,
}

impl Budget {
    pub fn time(limit: Duration) -> Self {
        Self {
            time: limit,
            iterations: None,
        }
    }

    /// Iteration limit only.
    pub fn iterations(n: usize) -> Self {
        Self {
            time: Duration::MAX,
            iterations: Some(n),
        }
    }

    /// A budget that is exhausted before it starts.
    pub fn zero() -> Self {
        Self::time(Duration::ZERO)
    }

    pub fn with_iterations(mut self, n: usize) -> Self {
        self.iterations = Some(n);
        self
    }

    pub fn time_limit(&self) -> Duration {
        self.time
    }

    pub fn iteration_limit(&self) -> Option<usize> {
        self.iterations
    }

    /// The tighter of two budgets.
    pub fn min(self, other: Budget) -> Budget {
        let iterations = match (self.iterations, other.iterations) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Budget {
            time: self.time.min(other.time),
            iterations,
        }
    }

    /// Starts consuming the budget now.
    pub fn start(self) -> BudgetClock {
        BudgetClock {
            budget: self,
            started: Instant::now(),
            used: 0,
        }
    }
}

/// A running [`Budget`].
#[derive(Debug, Clone)]
pub struct BudgetClock {
    budget: Budget,
    started: Instant,
    used: usize,
}

impl BudgetClock {
    /// Records one iteration.
    pub fn tick(&mut self) {
        self.used += 1;
    }

    pub fn tick_by(&mut self, n: usize) {
        self.used += n;
    }

    pub fn iterations_used(&self) -> usize {
        self.used
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_exhausted(&self) -> bool {
        self.elapsed() >= self.budget.time
            || self.budget.iterations.is_some_and(|n| self.used >= n)
    }

    /// What is left of the budget.
    pub fn remaining(&self) -> Budget {
        Budget {
            time: self.budget.time.saturating_sub(self.elapsed()),
            iterations: self.budget.iterations.map(|n| n.saturating_sub(self.used)),
        }
    }
}
