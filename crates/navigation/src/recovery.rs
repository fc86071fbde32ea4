//! Obstacle recovery: material collection and path construction.
//!
//! Both steps run world actions one at a time. A failed action is logged and
//! counted, and the remaining steps still run.

use tracing::{debug, warn};

use blockpilot_core::world::{
    BlockQuery, Coordinate, EquipSlot, Item, Offset, Position, World,
};

/// Block types dug up as building material.
pub const COLLECTIBLE_BLOCKS: [&str; 4] = ["dirt", "stone", "sand", "gravel"];

/// Substrings marking an inventory item as placeable.
pub const PLACEABLE_MATERIALS: [&str; 2] = ["dirt", "stone"];

/// Results of one batch of world actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionTally {
    pub succeeded: u32,
    pub failed: u32,
    /// Candidates passed over without issuing an action.
    pub skipped: u32,
}

impl ActionTally {
    pub fn attempted(&self) -> u32 {
        self.succeeded + self.failed
    }

    fn record(&mut self, action: &'static str, at: Coordinate, result: Result<(), impl std::fmt::Display>) {
        match result {
            Ok(()) => self.succeeded += 1,
            Err(e) => {
                warn!(action, at = %at, error = %e, "World action failed, continuing");
                self.failed += 1;
            }
        }
    }
}

/// Dig up to `count` collectible blocks within `radius` of the agent.
///
/// Blocks the agent cannot currently dig are skipped.
pub async fn collect_materials(world: &dyn World, radius: u32, count: usize) -> ActionTally {
    let query = BlockQuery {
        names: COLLECTIBLE_BLOCKS.iter().map(|s| s.to_string()).collect(),
        max_distance: radius,
        count,
    };
    let mut tally = ActionTally::default();

    for at in world.find_blocks(&query).into_iter().take(count) {
        let Some(block) = world.block_at(at) else {
            tally.skipped += 1;
            continue;
        };
        if !query.matches(&block) || !world.can_dig_block(&block) {
            debug!(block = %block.name, at = %at, "Skipping undiggable material");
            tally.skipped += 1;
            continue;
        }
        let result = world.dig(&block).await;
        tally.record("dig", at, result);
    }

    debug!(
        dug = tally.succeeded,
        failed = tally.failed,
        skipped = tally.skipped,
        "Material collection finished"
    );
    tally
}

/// Where bridge blocks go, in placement order: the goal column at the
/// agent's height, then the agent's four horizontal neighbours.
pub fn placement_candidates(position: Position, goal: Coordinate) -> [Coordinate; 5] {
    let at = position.block();
    [
        Coordinate::new(goal.x, at.y, goal.z),
        at.offset(0, 0, 1),
        at.offset(1, 0, 0),
        at.offset(-1, 0, 0),
        at.offset(0, 0, -1),
    ]
}

/// The first held item usable as bridge material.
pub fn placement_material(items: &[Item]) -> Option<Item> {
    items
        .iter()
        .find(|item| PLACEABLE_MATERIALS.iter().any(|m| item.name.contains(m)))
        .cloned()
}

/// Place bridge blocks around the agent towards `goal`.
///
/// Without placeable material in the inventory nothing is attempted.
pub async fn build_path(world: &dyn World, goal: Coordinate) -> ActionTally {
    let mut tally = ActionTally::default();
    let Some(material) = placement_material(&world.inventory_items()) else {
        debug!(goal = %goal, "No placeable material held, skipping bridge");
        return tally;
    };

    let origin = world.position();
    if let Err(e) = world.equip(&material, EquipSlot::Hand).await {
        warn!(action = "equip", item = %material.name, error = %e, "World action failed, continuing");
    }

    for candidate in placement_candidates(origin, goal) {
        let Some(reference) = world.block_at(candidate) else {
            debug!(at = %candidate, "Placement reference not loaded");
            tally.skipped += 1;
            continue;
        };
        let result = world.place_block(&reference, Offset::UP).await;
        tally.record("place", candidate, result);
    }

    debug!(
        material = %material.name,
        placed = tally.succeeded,
        failed = tally.failed,
        "Bridge construction finished"
    );
    tally
}
