//! The navigation orchestrator.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use blockpilot_core::event::Subscription;
use blockpilot_core::navigation::{
    Goal, GoalRun, Navigation, NavigationObserver, NavigationOutcome, ObstacleCause,
    ObstacleReport,
};
use blockpilot_core::world::{Coordinate, Movements, PathStatus, World, WorldEvent};

use crate::recovery::{build_path, collect_materials};
use crate::retry::{RetryDecision, RetryState};

/// Tunables for goal handling and recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationSettings {
    /// Recovery rounds allowed beyond the first before giving up.
    pub retry_ceiling: u32,
    /// Arrival radius handed to the navigation engine.
    pub tolerance: u32,
    /// Material scan radius.
    pub scan_radius: u32,
    /// Maximum material blocks inspected per round.
    pub scan_count: usize,
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            retry_ceiling: 5,
            tolerance: 1,
            scan_radius: 32,
            scan_count: 5,
        }
    }
}

/// Where a goal is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationPhase {
    /// Waiting on the engine's next signal.
    Attempting,
    /// Running recovery round `attempt`.
    Recovering { attempt: u32 },
    Reached,
    /// Abandoned after this many recoveries.
    Failed(u32),
}

struct ActiveGoal {
    goal: Goal,
    cancel: oneshot::Sender<()>,
}

/// Drives goals on one world session. Cheap to clone; clones share the
/// active goal.
#[derive(Clone)]
pub struct Navigator {
    world: Arc<dyn World>,
    settings: NavigationSettings,
    active: Arc<Mutex<Option<ActiveGoal>>>,
}

impl Navigator {
    pub fn new(world: Arc<dyn World>, settings: NavigationSettings) -> Self {
        Self {
            world,
            settings,
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn settings(&self) -> NavigationSettings {
        self.settings
    }

    fn active(&self) -> MutexGuard<'_, Option<ActiveGoal>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install `goal` as the active one, cancelling its predecessor.
    fn activate(&self, goal: &Goal) -> oneshot::Receiver<()> {
        let (cancel, cancelled) = oneshot::channel();
        let previous = self.active().replace(ActiveGoal {
            goal: goal.clone(),
            cancel,
        });
        if let Some(previous) = previous {
            info!(
                superseded = %previous.goal.id,
                target = %previous.goal.target,
                "Goal superseded by a new one"
            );
            let _ = previous.cancel.send(());
        }
        cancelled
    }

    /// Clear the active slot if it still holds `goal`.
    fn release(&self, goal: &Goal) {
        let mut active = self.active();
        if active.as_ref().is_some_and(|a| a.goal.id == goal.id) {
            *active = None;
        }
    }

    async fn drive(
        &self,
        goal: &Goal,
        mut signals: Subscription,
        mut cancelled: oneshot::Receiver<()>,
        observer: &dyn NavigationObserver,
    ) -> NavigationOutcome {
        let mut retry = RetryState::new(goal.id, self.settings.retry_ceiling);
        let mut phase = NavigationPhase::Attempting;

        loop {
            debug!(goal = %goal.id, ?phase, "Navigation step");
            match phase {
                NavigationPhase::Attempting => {
                    let event = tokio::select! {
                        biased;
                        _ = &mut cancelled => return NavigationOutcome::Cancelled,
                        event = signals.next() => event,
                    };
                    match event {
                        Some(WorldEvent::GoalReached { .. }) => phase = NavigationPhase::Reached,
                        Some(WorldEvent::PathUpdate {
                            status: PathStatus::NoPath,
                        }) => {
                            phase = match retry.on_no_path() {
                                RetryDecision::Recover { attempt } => {
                                    NavigationPhase::Recovering { attempt }
                                }
                                RetryDecision::Exhausted(count) => NavigationPhase::Failed(count),
                            };
                        }
                        Some(WorldEvent::Death) | Some(WorldEvent::Disconnected { .. }) | None => {
                            info!(goal = %goal.id, "Session ended during navigation");
                            return NavigationOutcome::Cancelled;
                        }
                        Some(_) => {}
                    }
                }
                NavigationPhase::Recovering { attempt } => {
                    let report = tokio::select! {
                        biased;
                        _ = &mut cancelled => return NavigationOutcome::Cancelled,
                        report = self.recover(goal, attempt) => report,
                    };

                    // Signals raised while recovering are stale, except arrival.
                    let mut arrived = false;
                    while let Some(event) = signals.try_next() {
                        match event {
                            WorldEvent::GoalReached { .. } => arrived = true,
                            WorldEvent::Death | WorldEvent::Disconnected { .. } => {
                                return NavigationOutcome::Cancelled;
                            }
                            _ => {}
                        }
                    }
                    if !arrived {
                        self.world.set_goal(Some(goal.as_goal_near()));
                    }
                    observer.on_obstacle(&report).await;
                    phase = if arrived {
                        NavigationPhase::Reached
                    } else {
                        NavigationPhase::Attempting
                    };
                }
                NavigationPhase::Reached => {
                    let at = self.world.position().rounded();
                    info!(goal = %goal.id, position = %at, recoveries = retry.recoveries(), "Goal reached");
                    return NavigationOutcome::Reached(at);
                }
                NavigationPhase::Failed(count) => {
                    warn!(goal = %goal.id, target = %goal.target, attempts = count, "Goal unreachable");
                    return NavigationOutcome::Unreachable(count);
                }
            }
        }
    }

    /// One recovery round. Bridges only when the target block is missing or
    /// cannot be dug.
    async fn recover(&self, goal: &Goal, attempt: u32) -> ObstacleReport {
        let world = self.world.as_ref();
        let position = world.position();
        let blocked = match world.block_at(goal.target) {
            Some(block) => !world.can_dig_block(&block),
            None => true,
        };
        info!(goal = %goal.id, attempt, position = %position, blocked, "Recovering from obstacle");

        if blocked {
            collect_materials(world, self.settings.scan_radius, self.settings.scan_count).await;
            build_path(world, goal.target).await;
        }

        ObstacleReport {
            goal: goal.id,
            position,
            cause: if blocked {
                ObstacleCause::BlockedTarget
            } else {
                ObstacleCause::NoPath
            },
            attempt,
        }
    }
}

impl Navigation for Navigator {
    fn navigate_to(&self, target: Coordinate, observer: Arc<dyn NavigationObserver>) -> GoalRun {
        let goal = Goal::new(target, self.settings.tolerance);
        let cancelled = self.activate(&goal);
        info!(goal = %goal.id, target = %target, "Navigation started");

        self.world.set_movements(Movements::default());
        // Subscribe first so an immediate answer to the goal is not missed.
        let signals = self.world.subscribe();
        self.world.set_goal(Some(goal.as_goal_near()));

        let navigator = self.clone();
        Box::pin(async move {
            let outcome = navigator
                .drive(&goal, signals, cancelled, observer.as_ref())
                .await;
            navigator.release(&goal);
            outcome
        })
    }

    fn cancel(&self) -> Option<Goal> {
        let active = self.active().take()?;
        info!(goal = %active.goal.id, target = %active.goal.target, "Goal cancelled");
        let _ = active.cancel.send(());
        Some(active.goal)
    }

    fn active_goal(&self) -> Option<Goal> {
        self.active().as_ref().map(|a| a.goal.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use blockpilot_core::navigation::SilentObserver;
    use blockpilot_core::world::{Position, WorldEvent};
    use blockpilot_world::{GoalMode, SimWorld, SimWorldConfig, WorldCall};
    use tokio::task::JoinHandle;

    #[derive(Default)]
    struct RecordingObserver {
        reports: Mutex<Vec<ObstacleReport>>,
    }

    impl RecordingObserver {
        fn reports(&self) -> Vec<ObstacleReport> {
            self.reports.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NavigationObserver for RecordingObserver {
        async fn on_obstacle(&self, report: &ObstacleReport) {
            self.reports.lock().unwrap().push(report.clone());
        }
    }

    fn setup(mode: GoalMode) -> (Arc<SimWorld>, Navigator) {
        let world = Arc::new(SimWorld::new(SimWorldConfig {
            goal_mode: mode,
            ..SimWorldConfig::default()
        }));
        let navigator = Navigator::new(world.clone(), NavigationSettings::default());
        (world, navigator)
    }

    fn start(
        navigator: &Navigator,
        target: Coordinate,
        observer: Arc<dyn NavigationObserver>,
    ) -> JoinHandle<NavigationOutcome> {
        tokio::spawn(navigator.navigate_to(target, observer))
    }

    fn no_path() -> WorldEvent {
        WorldEvent::PathUpdate {
            status: PathStatus::NoPath,
        }
    }

    #[tokio::test]
    async fn reached_position_is_rounded() {
        let (world, navigator) = setup(GoalMode::Manual);
        let handle = start(&navigator, Coordinate::new(11, 4, -4), Arc::new(SilentObserver));

        world.wait_for_goal_sets(1).await;
        assert_eq!(
            world.current_goal().unwrap().target,
            Coordinate::new(11, 4, -4)
        );
        assert_eq!(world.calls()[0], WorldCall::SetMovements(Movements::default()));

        let arrival = Position::new(10.6, 4.2, -3.5);
        world.teleport(arrival);
        world.emit(WorldEvent::GoalReached { position: arrival });

        let outcome = handle.await.unwrap();
        assert_eq!(outcome, NavigationOutcome::Reached(Coordinate::new(11, 4, -4)));
        assert_eq!(world.subscriber_count(), 0);
        assert!(navigator.active_goal().is_none());
    }

    #[tokio::test]
    async fn unreachable_after_ceiling_with_no_further_calls() {
        let (world, navigator) = setup(GoalMode::Manual);
        let observer = Arc::new(RecordingObserver::default());
        let handle = start(&navigator, Coordinate::new(5, 64, 5), observer.clone());

        world.wait_for_goal_sets(1).await;
        for round in 1..=6 {
            world.emit(no_path());
            // Each recovery round reissues the goal.
            world.wait_for_goal_sets(round + 1).await;
        }
        let calls_before = world.calls().len();
        world.emit(no_path());

        let outcome = handle.await.unwrap();
        assert_eq!(outcome, NavigationOutcome::Unreachable(6));
        assert_eq!(world.calls().len(), calls_before);
        assert_eq!(world.subscriber_count(), 0);

        let attempts: Vec<u32> = observer.reports().iter().map(|r| r.attempt).collect();
        assert_eq!(attempts, vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn engine_driven_dead_end_is_abandoned() {
        let (world, navigator) = setup(GoalMode::Resolve);
        // Solid but diggable target: every submission answers "no path".
        world.set_block(Coordinate::new(2, 64, 0), "stone");

        let observer = Arc::new(RecordingObserver::default());
        let outcome = navigator
            .navigate_to(Coordinate::new(2, 64, 0), observer.clone())
            .await;

        assert_eq!(outcome, NavigationOutcome::Unreachable(6));
        assert_eq!(world.goal_sets().len(), 7);
        assert!(world.action_calls().is_empty());
        assert!(
            observer
                .reports()
                .iter()
                .all(|r| r.cause == ObstacleCause::NoPath)
        );
    }

    #[tokio::test]
    async fn blocked_target_collects_and_bridges() {
        let (world, navigator) = setup(GoalMode::Manual);
        world.set_block(Coordinate::new(1, 63, 0), "dirt");
        world.set_block(Coordinate::new(-1, 63, 0), "gravel");

        let observer = Arc::new(RecordingObserver::default());
        let handle = start(&navigator, Coordinate::new(6, 64, 0), observer.clone());
        world.wait_for_goal_sets(1).await;
        world.emit(no_path());
        world.wait_for_goal_sets(2).await;

        assert_eq!(world.digs().len(), 2);
        // Only the dirt is usable; it is equipped and placed at each candidate.
        assert_eq!(world.placements().len(), 5);
        assert!(world.calls().contains(&WorldCall::Equip {
            item: "dirt".into(),
            slot: blockpilot_core::world::EquipSlot::Hand,
        }));

        world.emit(WorldEvent::GoalReached {
            position: Position::new(5.5, 64.0, 0.5),
        });
        handle.await.unwrap();
        let reports = observer.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].cause, ObstacleCause::BlockedTarget);
        assert_eq!(reports[0].position, Position::new(0.5, 64.0, 0.5));
    }

    #[tokio::test]
    async fn gravel_only_means_no_placements() {
        let (world, navigator) = setup(GoalMode::Manual);
        world.set_block(Coordinate::new(0, 63, 1), "gravel");

        let handle = start(&navigator, Coordinate::new(6, 64, 0), Arc::new(SilentObserver));
        world.wait_for_goal_sets(1).await;
        world.emit(no_path());
        world.wait_for_goal_sets(2).await;

        assert_eq!(world.digs(), vec![Coordinate::new(0, 63, 1)]);
        assert!(world.placements().is_empty());
        assert!(
            !world
                .calls()
                .iter()
                .any(|c| matches!(c, WorldCall::Equip { .. }))
        );

        navigator.cancel();
        assert_eq!(handle.await.unwrap(), NavigationOutcome::Cancelled);
    }

    #[tokio::test]
    async fn diggable_target_skips_bridging() {
        let (world, navigator) = setup(GoalMode::Manual);
        world.set_block(Coordinate::new(2, 64, 0), "stone");
        world.set_block(Coordinate::new(1, 63, 0), "dirt");
        world.give("dirt", 8);

        let observer = Arc::new(RecordingObserver::default());
        let handle = start(&navigator, Coordinate::new(2, 64, 0), observer.clone());
        world.wait_for_goal_sets(1).await;
        world.emit(no_path());
        world.wait_for_goal_sets(2).await;

        assert!(world.action_calls().is_empty());
        world.emit(WorldEvent::GoalReached {
            position: Position::new(2.5, 64.0, 0.5),
        });
        assert_eq!(
            handle.await.unwrap(),
            NavigationOutcome::Reached(Coordinate::new(1, 64, 1))
        );
        assert_eq!(observer.reports()[0].cause, ObstacleCause::NoPath);
    }

    #[tokio::test]
    async fn queued_arrival_during_recovery_is_honoured() {
        let (world, navigator) = setup(GoalMode::Manual);
        let handle = start(&navigator, Coordinate::new(6, 64, 0), Arc::new(SilentObserver));
        world.wait_for_goal_sets(1).await;

        // Both signals are queued before the navigator wakes: the arrival is
        // seen while recovering from the first.
        let arrival = Position::new(6.5, 64.0, 0.5);
        world.teleport(arrival);
        world.emit(no_path());
        world.emit(WorldEvent::GoalReached { position: arrival });

        assert_eq!(
            handle.await.unwrap(),
            NavigationOutcome::Reached(Coordinate::new(7, 64, 1))
        );
        // Arrival was already queued, so the goal was not resubmitted.
        assert_eq!(world.goal_sets().len(), 1);
    }

    #[tokio::test]
    async fn new_goal_cancels_previous() {
        let (world, navigator) = setup(GoalMode::Manual);
        let first = start(&navigator, Coordinate::new(10, 64, 10), Arc::new(SilentObserver));
        world.wait_for_goal_sets(1).await;

        let second = start(&navigator, Coordinate::new(-4, 64, 2), Arc::new(SilentObserver));
        world.wait_for_goal_sets(2).await;

        assert_eq!(first.await.unwrap(), NavigationOutcome::Cancelled);
        assert_eq!(
            navigator.active_goal().unwrap().target,
            Coordinate::new(-4, 64, 2)
        );
        assert_eq!(world.subscriber_count(), 1);

        world.teleport(Position::new(-3.5, 64.0, 2.5));
        world.emit(WorldEvent::GoalReached {
            position: Position::new(-3.5, 64.0, 2.5),
        });
        assert_eq!(
            second.await.unwrap(),
            NavigationOutcome::Reached(Coordinate::new(-4, 64, 3))
        );
        assert_eq!(world.subscriber_count(), 0);
        assert!(navigator.active_goal().is_none());
    }

    #[tokio::test]
    async fn cancel_returns_active_goal() {
        let (world, navigator) = setup(GoalMode::Manual);
        assert!(navigator.cancel().is_none());

        let handle = start(&navigator, Coordinate::new(3, 70, 3), Arc::new(SilentObserver));
        world.wait_for_goal_sets(1).await;

        let cancelled = navigator.cancel().unwrap();
        assert_eq!(cancelled.target, Coordinate::new(3, 70, 3));
        assert_eq!(cancelled.tolerance, 1);
        assert_eq!(handle.await.unwrap(), NavigationOutcome::Cancelled);
        assert!(navigator.active_goal().is_none());
        assert_eq!(world.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn disconnect_ends_navigation() {
        let (world, navigator) = setup(GoalMode::Manual);
        let handle = start(&navigator, Coordinate::new(3, 70, 3), Arc::new(SilentObserver));
        world.wait_for_goal_sets(1).await;

        world.emit(WorldEvent::Disconnected {
            reason: "kicked".into(),
        });
        assert_eq!(handle.await.unwrap(), NavigationOutcome::Cancelled);
    }
}
