//! In-memory world model.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::debug;

use blockpilot_core::error::WorldError;
use blockpilot_core::event::{EventBus, Subscription};
use blockpilot_core::world::{
    Block, BlockQuery, Coordinate, Entity, EntityId, EntityKind, EquipSlot, GoalNear, Item,
    Movements, Offset, PathStatus, Position, World, WorldEvent,
};

/// Blocks that can never be dug.
const UNBREAKABLE: &[&str] = &["air", "cave_air", "void_air", "bedrock", "barrier", "water", "lava"];

/// How the simulated navigation engine answers a submitted goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalMode {
    /// Record the goal only; signals are emitted by the caller.
    Manual,
    /// Arrive in place when already within range, or immediately when the
    /// target is open air; otherwise report no path.
    Resolve,
}

/// Starting state of a simulated session.
#[derive(Debug, Clone)]
pub struct SimWorldConfig {
    pub username: String,
    pub spawn: Position,
    /// Maximum dig distance.
    pub reach: f64,
    pub goal_mode: GoalMode,
}

impl Default for SimWorldConfig {
    fn default() -> Self {
        Self {
            username: "blockpilot".into(),
            spawn: Position::new(0.5, 64.0, 0.5),
            reach: 4.5,
            goal_mode: GoalMode::Manual,
        }
    }
}

/// One call received by the simulated world.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldCall {
    SetMovements(Movements),
    SetGoal(Option<GoalNear>),
    Dig(Coordinate),
    Place { reference: Coordinate, face: Offset },
    Equip { item: String, slot: EquipSlot },
    Attack(EntityId),
    Chat(String),
    Quit(String),
}

impl WorldCall {
    /// Whether this call acts on the world (as opposed to configuring navigation).
    pub fn is_action(&self) -> bool {
        matches!(
            self,
            Self::Dig(_) | Self::Place { .. } | Self::Equip { .. } | Self::Attack(_)
        )
    }
}

struct SimState {
    position: Position,
    /// Non-air blocks; every other loaded coordinate is air.
    blocks: HashMap<Coordinate, String>,
    unloaded: HashSet<Coordinate>,
    inventory: Vec<Item>,
    held: Option<String>,
    entities: Vec<Entity>,
    goal: Option<GoalNear>,
    calls: Vec<WorldCall>,
    failing: HashSet<&'static str>,
    failing_placements: HashSet<Coordinate>,
}

/// A simulated world session.
pub struct SimWorld {
    username: String,
    entity_id: EntityId,
    reach: f64,
    goal_mode: GoalMode,
    state: Mutex<SimState>,
    bus: EventBus,
    changed: Notify,
}

impl SimWorld {
    pub fn new(config: SimWorldConfig) -> Self {
        Self {
            username: config.username,
            entity_id: EntityId(1),
            reach: config.reach,
            goal_mode: config.goal_mode,
            state: Mutex::new(SimState {
                position: config.spawn,
                blocks: HashMap::new(),
                unloaded: HashSet::new(),
                inventory: Vec::new(),
                held: None,
                entities: Vec::new(),
                goal: None,
                calls: Vec::new(),
                failing: HashSet::new(),
                failing_placements: HashSet::new(),
            }),
            bus: EventBus::default(),
            changed: Notify::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: WorldCall) {
        self.state().calls.push(call);
        self.changed.notify_waiters();
    }

    // ── Scripting ───────────────────────────────────────────────────────

    pub fn set_block(&self, at: Coordinate, name: &str) {
        let mut state = self.state();
        state.unloaded.remove(&at);
        if UNBREAKABLE[..3].contains(&name) {
            state.blocks.remove(&at);
        } else {
            state.blocks.insert(at, name.to_string());
        }
    }

    /// Make `at` report no block at all.
    pub fn unload(&self, at: Coordinate) {
        let mut state = self.state();
        state.blocks.remove(&at);
        state.unloaded.insert(at);
    }

    /// Add `count` of `name` to the inventory.
    pub fn give(&self, name: &str, count: u32) {
        let mut state = self.state();
        if let Some(stack) = state.inventory.iter_mut().find(|i| i.name == name) {
            stack.count += count;
            return;
        }
        let slot = 36 + state.inventory.len() as u16;
        state.inventory.push(Item {
            name: name.to_string(),
            count,
            slot,
        });
    }

    pub fn add_entity(&self, entity: Entity) {
        self.state().entities.push(entity);
    }

    /// Convenience: a player standing at `position`.
    pub fn add_player(&self, id: u32, username: &str, position: Position) -> Entity {
        let entity = Entity {
            id: EntityId(id),
            kind: EntityKind::Player,
            username: Some(username.to_string()),
            position,
        };
        self.add_entity(entity.clone());
        entity
    }

    pub fn teleport(&self, position: Position) {
        self.state().position = position;
    }

    /// Make every call of `action` ("dig", "place", "equip", "attack", "chat") fail.
    pub fn fail_action(&self, action: &'static str) {
        self.state().failing.insert(action);
    }

    /// Make placements against the block at `reference` fail.
    pub fn fail_placement_at(&self, reference: Coordinate) {
        self.state().failing_placements.insert(reference);
    }

    /// Publish a signal to every subscriber.
    pub fn emit(&self, event: WorldEvent) -> usize {
        self.bus.publish(event)
    }

    // ── Inspection ──────────────────────────────────────────────────────

    pub fn calls(&self) -> Vec<WorldCall> {
        self.state().calls.clone()
    }

    pub fn action_calls(&self) -> Vec<WorldCall> {
        self.calls().into_iter().filter(WorldCall::is_action).collect()
    }

    pub fn digs(&self) -> Vec<Coordinate> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                WorldCall::Dig(at) => Some(at),
                _ => None,
            })
            .collect()
    }

    /// Reference blocks of every placement attempt, in order.
    pub fn placements(&self) -> Vec<Coordinate> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                WorldCall::Place { reference, .. } => Some(reference),
                _ => None,
            })
            .collect()
    }

    pub fn goal_sets(&self) -> Vec<Option<GoalNear>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                WorldCall::SetGoal(goal) => Some(goal),
                _ => None,
            })
            .collect()
    }

    pub fn chats(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                WorldCall::Chat(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn current_goal(&self) -> Option<GoalNear> {
        self.state().goal
    }

    pub fn held_item(&self) -> Option<String> {
        self.state().held.clone()
    }

    pub fn block_name(&self, at: Coordinate) -> Option<String> {
        self.block_at(at).map(|b| b.name)
    }

    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }

    /// Wait until `condition` holds. Re-checked after every recorded call.
    pub async fn wait_until(&self, condition: impl Fn(&SimWorld) -> bool) {
        loop {
            let notified = self.changed.notified();
            if condition(self) {
                return;
            }
            notified.await;
        }
    }

    /// Wait until the navigation engine has received `count` goal submissions.
    pub async fn wait_for_goal_sets(&self, count: usize) {
        self.wait_until(|w| w.goal_sets().len() >= count).await;
    }

    fn check(&self, action: &'static str) -> Result<(), WorldError> {
        if self.state().failing.contains(action) {
            return Err(WorldError::action(action, "scripted failure"));
        }
        Ok(())
    }

    fn distance_to_block(position: Position, at: Coordinate) -> f64 {
        position.distance_to(Position::new(
            f64::from(at.x) + 0.5,
            f64::from(at.y) + 0.5,
            f64::from(at.z) + 0.5,
        ))
    }
}

#[async_trait]
impl World for SimWorld {
    fn username(&self) -> &str {
        &self.username
    }

    fn entity(&self) -> Entity {
        Entity {
            id: self.entity_id,
            kind: EntityKind::Player,
            username: Some(self.username.clone()),
            position: self.state().position,
        }
    }

    fn block_at(&self, at: Coordinate) -> Option<Block> {
        let state = self.state();
        if state.unloaded.contains(&at) {
            return None;
        }
        let name = state.blocks.get(&at).map(String::as_str).unwrap_or("air");
        Some(Block::new(name, at))
    }

    fn can_dig_block(&self, block: &Block) -> bool {
        if UNBREAKABLE.contains(&block.name.as_str()) {
            return false;
        }
        Self::distance_to_block(self.state().position, block.position) <= self.reach
    }

    fn find_blocks(&self, query: &BlockQuery) -> Vec<Coordinate> {
        let state = self.state();
        let origin = state.position;
        let mut found: Vec<(f64, Coordinate)> = state
            .blocks
            .iter()
            .filter(|(at, name)| query.matches(&Block::new(name.as_str(), **at)))
            .map(|(at, _)| (Self::distance_to_block(origin, *at), *at))
            .filter(|(distance, _)| *distance <= f64::from(query.max_distance))
            .collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        found.into_iter().take(query.count).map(|(_, at)| at).collect()
    }

    fn inventory_items(&self) -> Vec<Item> {
        self.state().inventory.clone()
    }

    fn nearest_entity(
        &self,
        predicate: &(dyn Fn(&Entity) -> bool + Send + Sync),
    ) -> Option<Entity> {
        let state = self.state();
        let origin = state.position;
        state
            .entities
            .iter()
            .filter(|e| predicate(*e))
            .min_by(|a, b| {
                a.position
                    .distance_to(origin)
                    .total_cmp(&b.position.distance_to(origin))
            })
            .cloned()
    }

    fn set_movements(&self, movements: Movements) {
        self.record(WorldCall::SetMovements(movements));
    }

    fn set_goal(&self, goal: Option<GoalNear>) {
        self.state().goal = goal;
        self.record(WorldCall::SetGoal(goal));

        let (GoalMode::Resolve, Some(goal)) = (self.goal_mode, goal) else {
            return;
        };
        let here = self.position();
        if goal.is_satisfied_by(here) {
            debug!(target = %goal.target, "Simulated goal already satisfied");
            self.emit(WorldEvent::GoalReached { position: here });
            return;
        }
        match self.block_at(goal.target) {
            Some(block) if block.is_air() => {
                let arrival = goal.target.standing_position();
                self.teleport(arrival);
                debug!(target = %goal.target, "Simulated goal reached");
                self.emit(WorldEvent::GoalReached { position: arrival });
            }
            _ => {
                debug!(target = %goal.target, "Simulated goal has no path");
                self.emit(WorldEvent::PathUpdate {
                    status: PathStatus::NoPath,
                });
            }
        }
    }

    fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    async fn dig(&self, block: &Block) -> Result<(), WorldError> {
        self.record(WorldCall::Dig(block.position));
        tokio::task::yield_now().await;
        self.check("dig")?;

        let Some(current) = self.block_at(block.position) else {
            return Err(WorldError::NoSuchBlock(block.position.to_string()));
        };
        if current.is_air() {
            return Err(WorldError::action("dig", "block already mined"));
        }
        if !self.can_dig_block(&current) {
            return Err(WorldError::OutOfReach(block.position.to_string()));
        }
        self.state().blocks.remove(&block.position);
        self.give(&current.name, 1);
        Ok(())
    }

    async fn place_block(&self, reference: &Block, face: Offset) -> Result<(), WorldError> {
        self.record(WorldCall::Place {
            reference: reference.position,
            face,
        });
        tokio::task::yield_now().await;
        self.check("place")?;

        let target = reference.position.across(face);
        let mut state = self.state();
        if state.failing_placements.contains(&reference.position) {
            return Err(WorldError::action("place", "placement blocked"));
        }
        if state.blocks.contains_key(&target) {
            return Err(WorldError::action("place", format!("{target} is occupied")));
        }
        let Some(held) = state.held.clone() else {
            return Err(WorldError::action("place", "nothing in hand"));
        };
        let Some(index) = state.inventory.iter().position(|i| i.name == held) else {
            return Err(WorldError::action("place", format!("out of {held}")));
        };
        state.inventory[index].count -= 1;
        if state.inventory[index].count == 0 {
            state.inventory.remove(index);
            state.held = None;
        }
        state.blocks.insert(target, held);
        Ok(())
    }

    async fn equip(&self, item: &Item, slot: EquipSlot) -> Result<(), WorldError> {
        self.record(WorldCall::Equip {
            item: item.name.clone(),
            slot,
        });
        tokio::task::yield_now().await;
        self.check("equip")?;

        let mut state = self.state();
        if !state.inventory.iter().any(|i| i.name == item.name) {
            return Err(WorldError::action("equip", format!("no {} in inventory", item.name)));
        }
        if slot == EquipSlot::Hand {
            state.held = Some(item.name.clone());
        }
        Ok(())
    }

    async fn attack(&self, target: &Entity) -> Result<(), WorldError> {
        self.record(WorldCall::Attack(target.id));
        tokio::task::yield_now().await;
        self.check("attack")?;

        if !self.state().entities.iter().any(|e| e.id == target.id) {
            return Err(WorldError::action("attack", format!("entity {} is gone", target.id)));
        }
        Ok(())
    }

    async fn chat(&self, message: &str) -> Result<(), WorldError> {
        self.record(WorldCall::Chat(message.to_string()));
        self.check("chat")
    }

    async fn quit(&self, reason: &str) {
        self.record(WorldCall::Quit(reason.to_string()));
        self.emit(WorldEvent::Disconnected {
            reason: reason.to_string(),
        });
    }
}
