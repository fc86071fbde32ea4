//! Simulated game world for blockpilot.
//!
//! [`SimWorld`] implements the [`World`](blockpilot_core::World) trait over an
//! in-memory block map, inventory and entity list, and records every action
//! call it receives. [`SimSessionFactory`] hands out fresh worlds the way a
//! real server connection would, and can be scripted to fail logins.
//!
//! The binary uses it when no game transport is configured; tests use it to
//! drive navigation, combat and supervision deterministically.

pub mod factory;
pub mod sim;

pub use factory::{SPAWN_DELAY, SimSessionFactory};
pub use sim::{GoalMode, SimWorld, SimWorldConfig, WorldCall};
