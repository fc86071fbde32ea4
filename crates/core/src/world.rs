//! World trait: the abstraction over the remote game world.
//!
//! A `World` is one live session with the game server. It exposes block and
//! entity lookups, the agent's inventory, asynchronous action calls, and the
//! navigation engine's goal setter and signals. Pathfinding search, physics
//! and protocol handling all live behind this boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::WorldError;
use crate::event::Subscription;

/// An integer block coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coordinate {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The coordinate shifted by the given deltas.
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// The coordinate adjacent to this one across `face`.
    pub const fn across(self, face: Offset) -> Self {
        self.offset(face.dx, face.dy, face.dz)
    }

    /// Position of the block's bottom-centre, where an entity would stand.
    pub fn standing_position(self) -> Position {
        Position::new(
            f64::from(self.x) + 0.5,
            f64::from(self.y),
            f64::from(self.z) + 0.5,
        )
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}, {}", self.x, self.y, self.z)
    }
}

/// A continuous entity position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Round each axis to the nearest integer (halves away from zero).
    pub fn rounded(self) -> Coordinate {
        Coordinate::new(
            self.x.round() as i32,
            self.y.round() as i32,
            self.z.round() as i32,
        )
    }

    /// The block coordinate containing this position.
    pub fn block(self) -> Coordinate {
        Coordinate::new(
            self.x.floor() as i32,
            self.y.floor() as i32,
            self.z.floor() as i32,
        )
    }

    pub fn distance_to(self, other: Position) -> f64 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}, {:.1}, {:.1}", self.x, self.y, self.z)
    }
}

/// A relative block face offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
    pub dz: i32,
}

impl Offset {
    /// The face directly above a reference block.
    pub const UP: Offset = Offset { dx: 0, dy: 1, dz: 0 };
}

/// A block as reported by the world model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub position: Coordinate,
}

impl Block {
    pub fn new(name: impl Into<String>, position: Coordinate) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }

    pub fn is_air(&self) -> bool {
        matches!(self.name.as_str(), "air" | "cave_air" | "void_air")
    }
}

/// An inventory item stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub count: u32,
    pub slot: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Player,
    Mob,
    Object,
    Other,
}

/// An entity tracked by the world model (players, mobs, dropped items).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    Hand,
    OffHand,
}

/// Result of a navigation engine path re-evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStatus {
    Success,
    Partial,
    Timeout,
    NoPath,
}

/// Block search parameters for [`World::find_blocks`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockQuery {
    /// Exact block names that match.
    pub names: Vec<String>,
    /// Search radius around the agent, in blocks.
    pub max_distance: u32,
    /// Maximum number of matches returned.
    pub count: usize,
}

impl BlockQuery {
    pub fn matches(&self, block: &Block) -> bool {
        self.names.iter().any(|name| name == &block.name)
    }
}

/// A goal satisfied anywhere within `range` blocks of `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalNear {
    pub target: Coordinate,
    pub range: u32,
}

impl GoalNear {
    pub const fn new(target: Coordinate, range: u32) -> Self {
        Self { target, range }
    }

    /// Whether an agent standing at `position` has arrived.
    pub fn is_satisfied_by(&self, position: Position) -> bool {
        let at = position.block();
        let (dx, dy, dz) = (
            i128::from(at.x) - i128::from(self.target.x),
            i128::from(at.y) - i128::from(self.target.y),
            i128::from(at.z) - i128::from(self.target.z),
        );
        let range = i128::from(self.range);
        dx * dx + dy * dy + dz * dz <= range * range
    }
}

/// Movement capabilities handed to the navigation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movements {
    pub can_dig: bool,
    pub allow_sprinting: bool,
    pub allow_parkour: bool,
}

impl Default for Movements {
    fn default() -> Self {
        Self {
            can_dig: true,
            allow_sprinting: true,
            allow_parkour: true,
        }
    }
}

/// Signals published by a world session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorldEvent {
    /// The agent entered the world.
    Spawned,
    /// The navigation engine re-evaluated its path.
    PathUpdate { status: PathStatus },
    /// The agent's position satisfies the active goal.
    GoalReached { position: Position },
    /// An entity took damage.
    EntityHurt { entity: EntityId },
    /// An in-game chat line.
    Chat { username: String, message: String },
    /// The agent died.
    Death,
    /// The session ended.
    Disconnected { reason: String },
}

/// The core World trait.
///
/// Lookups are synchronous reads of the locally mirrored world state; actions
/// are asynchronous and return a result that callers must inspect.
#[async_trait]
pub trait World: Send + Sync {
    /// The agent's in-game username.
    fn username(&self) -> &str;

    /// The agent's own entity.
    fn entity(&self) -> Entity;

    /// The agent's current position.
    fn position(&self) -> Position {
        self.entity().position
    }

    /// The block at `at`, or `None` when that part of the world is not loaded.
    fn block_at(&self, at: Coordinate) -> Option<Block>;

    /// Whether the agent can dig `block` from where it stands.
    fn can_dig_block(&self, block: &Block) -> bool;

    /// Positions of blocks matching `query`, nearest first.
    fn find_blocks(&self, query: &BlockQuery) -> Vec<Coordinate>;

    /// Items currently held in the inventory.
    fn inventory_items(&self) -> Vec<Item>;

    /// The nearest entity satisfying `predicate`.
    fn nearest_entity(&self, predicate: &(dyn Fn(&Entity) -> bool + Send + Sync))
        -> Option<Entity>;

    /// Configure movement capabilities for subsequent goals.
    fn set_movements(&self, movements: Movements);

    /// Submit a goal to the navigation engine, or clear it with `None`.
    fn set_goal(&self, goal: Option<GoalNear>);

    /// Subscribe to this session's signals.
    fn subscribe(&self) -> Subscription;

    async fn dig(&self, block: &Block) -> Result<(), WorldError>;

    /// Place the held block against `reference` on the given face.
    async fn place_block(&self, reference: &Block, face: Offset) -> Result<(), WorldError>;

    async fn equip(&self, item: &Item, slot: EquipSlot) -> Result<(), WorldError>;

    async fn attack(&self, target: &Entity) -> Result<(), WorldError>;

    /// Send an in-game chat line.
    async fn chat(&self, message: &str) -> Result<(), WorldError>;

    /// End the session.
    async fn quit(&self, reason: &str);
}

/// Creates fresh world sessions. Each call is a full login, never a resume.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Human-readable server address, for logs.
    fn address(&self) -> String;

    async fn connect(&self) -> Result<Arc<dyn World>, WorldError>;
}
