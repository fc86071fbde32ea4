//! Connection supervisor.
//!
//! Owns the login loop: connect, serve the session until the agent dies or
//! the connection drops, wait the reconnect delay, log in again. There is no
//! attempt ceiling; only a shutdown request ends the loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::watch;
use tracing::{info, warn};

use blockpilot_core::command::CommandRegistry;
use blockpilot_core::navigation::Navigation;
use blockpilot_core::world::{SessionFactory, World, WorldEvent};

use crate::reactor::Reactor;
use crate::session::{Session, SessionSlot};
use crate::settings::RuntimeSettings;
use crate::shutdown_requested;

/// Where the supervisor is in the connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Disconnected,
    Connecting,
    Connected,
    /// The agent died; the session is being torn down.
    Dead,
}

impl std::fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Dead => "dead",
        };
        f.write_str(name)
    }
}

/// How one session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Died,
    Dropped,
    Shutdown,
}

pub struct Supervisor {
    factory: Arc<dyn SessionFactory>,
    registry: Arc<CommandRegistry>,
    slot: SessionSlot,
    settings: RuntimeSettings,
    state: watch::Sender<SupervisorState>,
    attempts: AtomicU32,
}

impl Supervisor {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        registry: Arc<CommandRegistry>,
        slot: SessionSlot,
        settings: RuntimeSettings,
    ) -> Self {
        let (state, _) = watch::channel(SupervisorState::Disconnected);
        Self {
            factory,
            registry,
            slot,
            settings,
            state,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    /// Follow state changes.
    pub fn watch_state(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    /// Session creations attempted so far, failed ones included.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn slot(&self) -> &SessionSlot {
        &self.slot
    }

    fn transition(&self, next: SupervisorState) {
        self.state.send_replace(next);
    }

    /// Keep a session alive until `shutdown` turns true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let address = self.factory.address();
        let delay = self.settings.reconnect_delay;

        loop {
            self.transition(SupervisorState::Connecting);
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            info!(address = %address, attempt, "Connecting to game server");

            let connected = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                result = self.factory.connect() => result,
            };
            match connected {
                Ok(world) => {
                    if self.serve(world, &mut shutdown).await == SessionEnd::Shutdown {
                        break;
                    }
                }
                Err(e) => {
                    self.transition(SupervisorState::Disconnected);
                    warn!(address = %address, attempt, error = %e, "Session creation failed");
                }
            }

            info!(delay_secs = delay.as_secs(), "Reconnecting after delay");
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.transition(SupervisorState::Disconnected);
        info!(address = %address, "Supervisor stopped");
    }

    /// Run one session to its end, then tear it down.
    async fn serve(&self, world: Arc<dyn World>, shutdown: &mut watch::Receiver<bool>) -> SessionEnd {
        let mut signals = world.subscribe();
        let session = Session::new(world.clone(), self.settings.navigation);
        let reactor = Reactor::new(
            world.clone(),
            self.registry.clone(),
            self.settings.behavior.clone(),
            self.settings.prefix.clone(),
            self.settings.combat_radius,
        );
        let reactor_task = tokio::spawn(reactor.run(world.subscribe()));

        self.slot.set(session.clone()).await;
        self.transition(SupervisorState::Connected);
        info!(username = %world.username(), "Connected");

        let end = loop {
            let event = tokio::select! {
                biased;
                _ = shutdown_requested(shutdown) => {
                    world.quit("shutting down").await;
                    break SessionEnd::Shutdown;
                }
                event = signals.next() => event,
            };
            match event {
                Some(WorldEvent::Death) => {
                    self.transition(SupervisorState::Dead);
                    warn!(
                        username = %world.username(),
                        delay_secs = self.settings.reconnect_delay.as_secs(),
                        "Bot died, recreating session"
                    );
                    world.quit("died").await;
                    break SessionEnd::Died;
                }
                Some(WorldEvent::Disconnected { reason }) => {
                    self.transition(SupervisorState::Disconnected);
                    warn!(
                        reason = %reason,
                        delay_secs = self.settings.reconnect_delay.as_secs(),
                        "Disconnected from game server"
                    );
                    break SessionEnd::Dropped;
                }
                Some(_) => {}
                None => {
                    self.transition(SupervisorState::Disconnected);
                    warn!("Session signal stream closed");
                    break SessionEnd::Dropped;
                }
            }
        };

        self.slot.clear().await;
        info!(
            username = %world.username(),
            uptime_secs = session.uptime().num_seconds(),
            end = ?end,
            "Session ended"
        );
        if let Some(goal) = session.navigator.cancel() {
            info!(target = %goal.target, "Abandoned goal with the session");
        }
        reactor_task.abort();
        end
    }
}
