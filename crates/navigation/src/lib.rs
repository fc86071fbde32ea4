//! # blockpilot navigation
//!
//! Goal-seeking movement on top of the world's navigation engine.
//!
//! The [`Navigator`] submits a goal, watches the engine's path and arrival
//! signals, and on a "no path" signal runs a bounded recovery round: gather
//! nearby building material, bridge towards the goal, reissue the goal. After
//! the retry ceiling is exceeded the goal is abandoned as unreachable.
//!
//! One goal is active per session. Submitting a new goal cancels the previous
//! one, whose caller receives [`NavigationOutcome::Cancelled`].
//!
//! [`NavigationOutcome::Cancelled`]: blockpilot_core::NavigationOutcome::Cancelled

pub mod navigator;
pub mod recovery;
pub mod retry;

pub use navigator::{NavigationPhase, NavigationSettings, Navigator};
pub use recovery::{
    ActionTally, COLLECTIBLE_BLOCKS, PLACEABLE_MATERIALS, build_path, collect_materials,
    placement_candidates, placement_material,
};
pub use retry::{RetryDecision, RetryState};
