//! Navigation trait: goal-seeking movement with obstacle recovery.
//!
//! One [`Goal`] is active per session. Callers submit a target and receive a
//! [`NavigationOutcome`] once the goal is reached, abandoned, or superseded;
//! intermediate obstacles are reported through a [`NavigationObserver`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;

use crate::world::{Coordinate, GoalNear, Position};

/// Opaque identifier of one navigation goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoalId(pub uuid::Uuid);

impl GoalId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for GoalId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GoalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable navigation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub target: Coordinate,
    /// Arrival radius around `target`.
    pub tolerance: u32,
    pub issued_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(target: Coordinate, tolerance: u32) -> Self {
        Self {
            id: GoalId::new(),
            target,
            tolerance,
            issued_at: Utc::now(),
        }
    }

    /// The goal as submitted to the navigation engine.
    pub fn as_goal_near(&self) -> GoalNear {
        GoalNear::new(self.target, self.tolerance)
    }
}

/// What kind of obstacle interrupted a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleCause {
    /// The block at the target is missing or cannot be dug; a bridge was attempted.
    BlockedTarget,
    /// No path exists although the target block is diggable.
    NoPath,
}

/// An interruption observed while navigating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleReport {
    pub goal: GoalId,
    /// Where the agent stood when the interruption fired.
    pub position: Position,
    pub cause: ObstacleCause,
    /// One-based recovery attempt number.
    pub attempt: u32,
}

/// Terminal result of a navigation goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NavigationOutcome {
    /// Arrived; carries the rounded final position.
    Reached(Coordinate),
    /// Abandoned after exceeding the recovery ceiling; carries the attempt count.
    Unreachable(u32),
    /// Superseded by a newer goal, stopped, or the session ended.
    Cancelled,
}

/// Receives intermediate progress for one goal.
#[async_trait]
pub trait NavigationObserver: Send + Sync {
    async fn on_obstacle(&self, report: &ObstacleReport);
}

/// An observer that ignores progress.
pub struct SilentObserver;

#[async_trait]
impl NavigationObserver for SilentObserver {
    async fn on_obstacle(&self, _report: &ObstacleReport) {}
}

/// A goal in flight; resolves when the goal ends.
pub type GoalRun = Pin<Box<dyn Future<Output = NavigationOutcome> + Send>>;

/// The core Navigation trait.
pub trait Navigation: Send + Sync {
    /// Navigate to `target`, cancelling any goal already in flight.
    ///
    /// The new goal is active when this returns, so goals submitted in turn
    /// supersede each other in that order however their runs are scheduled.
    /// Dropping the run leaves the goal active until it is cancelled.
    fn navigate_to(&self, target: Coordinate, observer: Arc<dyn NavigationObserver>) -> GoalRun;

    /// Cancel the active goal, returning it if there was one.
    fn cancel(&self) -> Option<Goal>;

    /// The goal currently in flight.
    fn active_goal(&self) -> Option<Goal>;
}
