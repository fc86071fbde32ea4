//! Session factory handing out simulated worlds.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info};

use blockpilot_core::error::WorldError;
use blockpilot_core::world::{SessionFactory, World, WorldEvent};

use crate::sim::{SimWorld, SimWorldConfig};

type Seed = Box<dyn Fn(&SimWorld) + Send + Sync>;

/// Time between a login and the world announcing the spawn.
pub const SPAWN_DELAY: Duration = Duration::from_millis(50);

/// Creates a fresh [`SimWorld`] per login.
pub struct SimSessionFactory {
    address: String,
    template: SimWorldConfig,
    seed: Option<Seed>,
    sessions: Mutex<Vec<Arc<SimWorld>>>,
    attempts: AtomicU32,
    failures_pending: AtomicU32,
    changed: Notify,
}

impl SimSessionFactory {
    pub fn new(address: impl Into<String>, template: SimWorldConfig) -> Self {
        Self {
            address: address.into(),
            template,
            seed: None,
            sessions: Mutex::new(Vec::new()),
            attempts: AtomicU32::new(0),
            failures_pending: AtomicU32::new(0),
            changed: Notify::new(),
        }
    }

    /// Run `seed` against every new world before it is handed out.
    pub fn with_seed(mut self, seed: impl Fn(&SimWorld) + Send + Sync + 'static) -> Self {
        self.seed = Some(Box::new(seed));
        self
    }

    /// Fail the next `count` logins.
    pub fn fail_next(&self, count: u32) {
        self.failures_pending.fetch_add(count, Ordering::SeqCst);
    }

    /// Logins attempted so far, failed ones included.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Every world handed out so far, oldest first.
    pub fn sessions(&self) -> Vec<Arc<SimWorld>> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wait until the `n`th session (one-based) exists and return it.
    pub async fn wait_for_session(&self, n: usize) -> Arc<SimWorld> {
        loop {
            let notified = self.changed.notified();
            if let Some(world) = self.sessions().get(n.saturating_sub(1)) {
                return world.clone();
            }
            notified.await;
        }
    }

    /// Wait until at least `n` logins were attempted.
    pub async fn wait_for_attempts(&self, n: u32) {
        loop {
            let notified = self.changed.notified();
            if self.attempts() >= n {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl SessionFactory for SimSessionFactory {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn connect(&self) -> Result<Arc<dyn World>, WorldError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let failing = self
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            self.changed.notify_waiters();
            return Err(WorldError::ConnectFailed {
                address: self.address.clone(),
                reason: "connection refused".into(),
            });
        }

        let world = Arc::new(SimWorld::new(self.template.clone()));
        if let Some(seed) = &self.seed {
            seed(&world);
        }
        info!(address = %self.address, attempt, username = %world.username(), "Simulated session created");
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(world.clone());
        self.changed.notify_waiters();

        let spawning = Arc::downgrade(&world);
        tokio::spawn(async move {
            tokio::time::sleep(SPAWN_DELAY).await;
            if let Some(world) = spawning.upgrade() {
                debug!(username = %world.username(), "Simulated spawn");
                world.emit(WorldEvent::Spawned);
            }
        });
        Ok(world)
    }
}
