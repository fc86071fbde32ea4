//! Event reactor: the combat reflex and in-game chat help.

use std::sync::Arc;
use tracing::{debug, info, warn};

use blockpilot_core::command::CommandRegistry;
use blockpilot_core::event::Subscription;
use blockpilot_core::world::{Entity, EntityId, EntityKind, EquipSlot, World, WorldEvent};

use crate::help::chat_help;
use crate::settings::BehaviorSettings;

/// How the agent answered being hurt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retaliation {
    /// Equipped `weapon`, then attacked.
    Armed { target: EntityId, weapon: String },
    /// Attacked without equipping anything.
    Unarmed { target: EntityId },
}

/// What the reactor did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    Ignored,
    /// The agent spawned into the world.
    Ready,
    /// Hurt, but no hostile player was within reach.
    NoTarget,
    Retaliated(Retaliation),
    /// Answered a help request in chat.
    Answered(String),
    /// A help answer was withheld because the bot is silent.
    Silenced(String),
}

pub struct Reactor {
    world: Arc<dyn World>,
    registry: Arc<CommandRegistry>,
    behavior: BehaviorSettings,
    prefix: String,
    combat_radius: f64,
}

impl Reactor {
    pub fn new(
        world: Arc<dyn World>,
        registry: Arc<CommandRegistry>,
        behavior: BehaviorSettings,
        prefix: impl Into<String>,
        combat_radius: f64,
    ) -> Self {
        Self {
            world,
            registry,
            behavior,
            prefix: prefix.into(),
            combat_radius,
        }
    }

    /// Handle events until the session ends.
    pub async fn run(self, mut signals: Subscription) {
        while let Some(event) = signals.next().await {
            if matches!(event, WorldEvent::Death | WorldEvent::Disconnected { .. }) {
                break;
            }
            let reaction = self.handle(&event).await;
            if reaction != Reaction::Ignored {
                debug!(?reaction, "Reacted to world event");
            }
        }
        debug!("Reactor stopped");
    }

    pub async fn handle(&self, event: &WorldEvent) -> Reaction {
        match event {
            WorldEvent::EntityHurt { entity } => {
                if !self.behavior.guarding || *entity != self.world.entity().id {
                    return Reaction::Ignored;
                }
                match self.retaliate().await {
                    Some(retaliation) => Reaction::Retaliated(retaliation),
                    None => Reaction::NoTarget,
                }
            }
            WorldEvent::Chat { username, message } => self.on_chat(username, message).await,
            WorldEvent::Spawned => {
                info!(username = %self.world.username(), "Bot ready");
                Reaction::Ready
            }
            _ => Reaction::Ignored,
        }
    }

    /// The nearest player, other than the agent and its master, closer than
    /// the combat radius.
    pub fn nearest_hostile(&self) -> Option<Entity> {
        let me = self.world.entity();
        let master = self.behavior.master.clone();
        let radius = self.combat_radius;
        self.world.nearest_entity(&move |e: &Entity| {
            e.kind == EntityKind::Player
                && e.id != me.id
                && (master.is_none() || e.username != master)
                && e.position.distance_to(me.position) < radius
        })
    }

    async fn retaliate(&self) -> Option<Retaliation> {
        let attacker = self.nearest_hostile()?;
        let sword = self
            .world
            .inventory_items()
            .into_iter()
            .find(|item| item.name.contains("sword"));

        let mut retaliation = Retaliation::Unarmed { target: attacker.id };
        if let Some(sword) = sword {
            match self.world.equip(&sword, EquipSlot::Hand).await {
                Ok(()) => {
                    retaliation = Retaliation::Armed {
                        target: attacker.id,
                        weapon: sword.name,
                    }
                }
                Err(e) => warn!(item = %sword.name, error = %e, "Could not equip weapon, fighting unarmed"),
            }
        }

        if let Err(e) = self.world.attack(&attacker).await {
            warn!(target = %attacker.id, error = %e, "Attack failed");
        }
        match &retaliation {
            Retaliation::Armed { weapon, .. } => {
                info!(username = %self.world.username(), target = %attacker.id, weapon = %weapon, "Attacking back with a weapon")
            }
            Retaliation::Unarmed { .. } => {
                info!(username = %self.world.username(), target = %attacker.id, "Attacking back with bare hands")
            }
        }
        Some(retaliation)
    }

    async fn on_chat(&self, username: &str, message: &str) -> Reaction {
        if self.behavior.logging {
            info!(username = %username, message = %message, "Chat");
        }
        if username == self.world.username() {
            return Reaction::Ignored;
        }
        let Some(text) = chat_help(&self.registry, &self.prefix, message) else {
            return Reaction::Ignored;
        };
        if self.behavior.silent {
            return Reaction::Silenced(text);
        }
        if let Err(e) = self.world.chat(&text).await {
            warn!(error = %e, "Chat reply failed");
        }
        Reaction::Answered(text)
    }
}
