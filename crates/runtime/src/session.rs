//! The live world session shared by the dispatcher, reactor and supervisor.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use blockpilot_core::command::CommandContext;
use blockpilot_core::world::World;
use blockpilot_navigation::{NavigationSettings, Navigator};

/// One connected world and the navigator driving it.
#[derive(Clone)]
pub struct Session {
    pub world: Arc<dyn World>,
    pub navigator: Navigator,
    pub connected_at: DateTime<Utc>,
}

impl Session {
    pub fn new(world: Arc<dyn World>, navigation: NavigationSettings) -> Self {
        Self {
            navigator: Navigator::new(world.clone(), navigation),
            world,
            connected_at: Utc::now(),
        }
    }

    /// Time since the session connected.
    pub fn uptime(&self) -> TimeDelta {
        Utc::now() - self.connected_at
    }

    pub fn context(&self, show_coordinates: bool) -> CommandContext {
        CommandContext {
            world: self.world.clone(),
            navigation: Arc::new(self.navigator.clone()),
            show_coordinates,
        }
    }
}

/// Holder of the current session, empty while disconnected.
#[derive(Clone, Default)]
pub struct SessionSlot {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, session: Session) {
        *self.inner.write().await = Some(session);
    }

    /// Empty the slot, returning the session that was in it.
    pub async fn clear(&self) -> Option<Session> {
        self.inner.write().await.take()
    }

    pub async fn current(&self) -> Option<Session> {
        self.inner.read().await.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.read().await.is_some()
    }
}
