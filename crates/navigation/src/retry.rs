//! Per-goal recovery accounting.

use blockpilot_core::navigation::GoalId;

/// What to do with a "no path" signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Run recovery round `attempt` (one-based).
    Recover { attempt: u32 },
    /// The ceiling is exceeded; give up after this many recoveries.
    Exhausted(u32),
}

/// Recovery counter owned by exactly one in-flight goal.
#[derive(Debug, Clone)]
pub struct RetryState {
    goal: GoalId,
    recoveries: u32,
    ceiling: u32,
}

impl RetryState {
    pub fn new(goal: GoalId, ceiling: u32) -> Self {
        Self {
            goal,
            recoveries: 0,
            ceiling,
        }
    }

    pub fn goal(&self) -> GoalId {
        self.goal
    }

    /// Recovery rounds started so far.
    pub fn recoveries(&self) -> u32 {
        self.recoveries
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Account for one "no path" signal.
    ///
    /// Rounds are allowed while the count of completed rounds is at most the
    /// ceiling, so a ceiling of 5 permits six rounds and the seventh signal
    /// is exhausted with a count of 6.
    pub fn on_no_path(&mut self) -> RetryDecision {
        if self.recoveries > self.ceiling {
            return RetryDecision::Exhausted(self.recoveries);
        }
        self.recoveries += 1;
        RetryDecision::Recover {
            attempt: self.recoveries,
        }
    }
}
