//! End-to-end integration tests for the blockpilot agent.
//!
//! These tests wire the supervisor, dispatcher and a Discord channel to a
//! simulated game server and drive the whole pipeline from a chat-platform
//! interaction (or an in-game signal) to the resulting world calls and
//! replies.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use blockpilot_channels::{ChannelRegistry, DiscordChannel, DiscordConfig, OutboundMessage};
use blockpilot_config::AppConfig;
use blockpilot_core::channel::{ChannelId, Interaction, ReplyKind};
use blockpilot_core::world::{Coordinate, EntityId, Position, WorldEvent};
use blockpilot_runtime::{Dispatcher, RuntimeSettings, SessionSlot, Supervisor, SupervisorState};
use blockpilot_world::{GoalMode, SimSessionFactory, SimWorld, SimWorldConfig, WorldCall};

// ── Harness ──────────────────────────────────────────────────────────────

struct Agent {
    factory: Arc<SimSessionFactory>,
    supervisor: Arc<Supervisor>,
    discord: Arc<DiscordChannel>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

struct Setup {
    factory: SimSessionFactory,
    settings: RuntimeSettings,
    allowed_users: Vec<String>,
}

impl Setup {
    fn new(mode: GoalMode) -> Self {
        Self {
            factory: SimSessionFactory::new(
                "mc.example.net:25565",
                SimWorldConfig {
                    goal_mode: mode,
                    ..SimWorldConfig::default()
                },
            ),
            settings: RuntimeSettings::default(),
            allowed_users: vec!["*".into()],
        }
    }

    fn boot(self) -> Agent {
        let factory = Arc::new(self.factory);
        let registry = Arc::new(blockpilot_commands::default_registry());
        let slot = SessionSlot::new();

        let supervisor = Arc::new(Supervisor::new(
            factory.clone(),
            registry.clone(),
            slot.clone(),
            self.settings.clone(),
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            registry,
            slot,
            self.settings.behavior.show_coordinates,
        ));

        let discord = Arc::new(DiscordChannel::new(DiscordConfig {
            bot_token: "test-token".into(),
            allowed_users: self.allowed_users,
            guild_filter: vec![],
        }));
        discord.register_commands(dispatcher.slash_commands());
        let mut channels = ChannelRegistry::new();
        channels.register(discord.clone());

        let (shutdown, rx) = watch::channel(false);
        let runner = supervisor.clone();
        let supervisor_rx = rx.clone();
        let tasks = vec![
            tokio::spawn(async move { runner.run(supervisor_rx).await }),
            tokio::spawn(async move {
                dispatcher.serve(&channels, rx).await.unwrap();
            }),
        ];

        Agent {
            factory,
            supervisor,
            discord,
            shutdown,
            tasks,
        }
    }
}

impl Agent {
    /// Wait for the supervisor to report `target`.
    async fn reach(&self, target: SupervisorState) {
        self.supervisor
            .watch_state()
            .wait_for(|s| *s == target)
            .await
            .unwrap();
    }

    /// The `n`th session (one-based), once it is live.
    async fn session(&self, n: usize) -> Arc<SimWorld> {
        let world = self.factory.wait_for_session(n).await;
        self.reach(SupervisorState::Connected).await;
        world
    }

    /// Send an interaction once the Discord channel is listening.
    async fn send(&self, interaction: &Interaction) {
        while self.discord.inject_interaction(interaction.clone()).await.is_err() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn responses(&self, interaction: &Interaction, count: usize) -> Vec<OutboundMessage> {
        self.discord.wait_for_responses(&interaction.id, count).await
    }

    async fn stop(self) {
        self.shutdown.send_replace(true);
        for task in self.tasks {
            task.await.unwrap();
        }
    }
}

fn slash(user: &str, command: &str) -> Interaction {
    Interaction::new(ChannelId("discord".into()), user, command)
}

fn pathfinder(user: &str, x: i32, y: i32, z: i32) -> Interaction {
    slash(user, "pathfinder")
        .with_option("x", x.to_string())
        .with_option("y", y.to_string())
        .with_option("z", z.to_string())
}

fn chat(username: &str, message: &str) -> WorldEvent {
    WorldEvent::Chat {
        username: username.into(),
        message: message.into(),
    }
}

// ── Navigation through the chat surface ──────────────────────────────────

#[tokio::test(start_paused = true)]
async fn pathfinder_round_trip_over_discord() {
    let agent = Setup::new(GoalMode::Resolve).boot();
    let world = agent.session(1).await;

    let request = pathfinder("user1", 3, 64, 3);
    agent.send(&request).await;
    let sent = agent.responses(&request, 2).await;

    assert_eq!(sent[0].kind, ReplyKind::Initial);
    let initiated = sent[0].body.as_embed().unwrap();
    assert_eq!(initiated.title, "Pathfinding initiated");
    assert_eq!(initiated.field_value("Current goal"), Some("3, 64, 3"));

    assert_eq!(sent[1].kind, ReplyKind::FollowUp);
    let completed = sent[1].body.as_embed().unwrap();
    assert_eq!(completed.title, "Pathfinding completed");
    assert_eq!(completed.field_value("Current position"), Some("4, 64, 4"));

    assert_eq!(world.goal_sets().len(), 1);
    agent.stop().await;
}

#[tokio::test(start_paused = true)]
async fn blocked_goal_ends_unreachable_after_six_recoveries() {
    let mut setup = Setup::new(GoalMode::Resolve);
    setup.factory = setup.factory.with_seed(|world| {
        world.set_block(Coordinate::new(2, 64, 0), "bedrock");
        world.give("dirt", 16);
    });
    let agent = setup.boot();
    let world = agent.session(1).await;

    let request = pathfinder("user1", 2, 64, 0);
    agent.send(&request).await;
    let sent = agent.responses(&request, 8).await;

    let obstacles = sent[1..7]
        .iter()
        .filter(|m| {
            m.body
                .as_embed()
                .is_some_and(|e| e.title == "Pathfinding interrupted by obstacle")
        })
        .count();
    assert_eq!(obstacles, 6);
    assert_eq!(
        sent[7].body.as_text(),
        Some("Failed after 6 attempts. Goal unreachable.")
    );

    // One initial submission plus one per recovery, then nothing more.
    assert_eq!(world.goal_sets().len(), 7);
    assert!(!world.placements().is_empty());
    agent.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_the_running_goal() {
    let agent = Setup::new(GoalMode::Manual).boot();
    let world = agent.session(1).await;

    let request = pathfinder("user1", 9, 70, 9);
    agent.send(&request).await;
    world.wait_for_goal_sets(1).await;

    let stop = slash("user1", "stop");
    agent.send(&stop).await;
    assert_eq!(
        agent.responses(&stop, 1).await[0].body.as_text(),
        Some("Stopped pathfinding to 9, 70, 9.")
    );

    let sent = agent.responses(&request, 2).await;
    assert_eq!(sent[1].body.as_text(), Some("Pathfinding to 9, 70, 9 was cancelled."));
    assert_eq!(world.current_goal(), None);
    agent.stop().await;
}

#[tokio::test(start_paused = true)]
async fn new_goal_replaces_the_old_one() {
    let agent = Setup::new(GoalMode::Manual).boot();
    let world = agent.session(1).await;

    let first = pathfinder("user1", 10, 64, 10);
    agent.send(&first).await;
    world.wait_for_goal_sets(1).await;

    let second = pathfinder("user2", -4, 64, 3);
    agent.send(&second).await;
    agent.responses(&second, 1).await;
    world.wait_for_goal_sets(2).await;

    let sent = agent.responses(&first, 2).await;
    assert_eq!(sent[1].body.as_text(), Some("Pathfinding to 10, 64, 10 was cancelled."));

    let arrival = Position::new(-3.6, 64.0, 3.4);
    world.teleport(arrival);
    world.emit(WorldEvent::GoalReached { position: arrival });
    let sent = agent.responses(&second, 2).await;
    let completed = sent[1].body.as_embed().unwrap();
    assert_eq!(completed.field_value("Current position"), Some("-4, 64, 3"));
    assert_eq!(agent.discord.sent_for(&first.id).len(), 2);
    agent.stop().await;
}

// ── Dispatcher policies ──────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn help_lists_commands_and_describes_one() {
    let agent = Setup::new(GoalMode::Manual).boot();
    agent.session(1).await;

    let list = slash("user1", "help");
    agent.send(&list).await;
    assert_eq!(
        agent.responses(&list, 1).await[0].body.as_text(),
        Some("Commands: pathfinder, position, stop")
    );

    let describe = slash("user1", "help").with_option("command", "pathfinder");
    agent.send(&describe).await;
    let text = agent.responses(&describe, 1).await[0].body.to_string();
    assert!(text.starts_with("Usage: /pathfinder x:<x> y:<y> z:<z> | Description: "));

    let unknown = slash("user1", "help").with_option("command", "teleport");
    agent.send(&unknown).await;
    assert_eq!(
        agent.responses(&unknown, 1).await[0].body.as_text(),
        Some("Command 'teleport' not found.")
    );

    let announced: Vec<String> = agent
        .discord
        .registered_commands()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(announced, vec!["pathfinder", "position", "stop", "help"]);
    agent.stop().await;
}

#[tokio::test(start_paused = true)]
async fn unknown_commands_get_no_reply() {
    let agent = Setup::new(GoalMode::Manual).boot();
    agent.session(1).await;

    let unknown = slash("user1", "dance");
    agent.send(&unknown).await;
    let help = slash("user1", "help");
    agent.send(&help).await;
    agent.responses(&help, 1).await;

    assert!(agent.discord.sent_for(&unknown.id).is_empty());
    agent.stop().await;
}

#[tokio::test(start_paused = true)]
async fn cooldown_is_tracked_per_user() {
    let agent = Setup::new(GoalMode::Manual).boot();
    agent.session(1).await;

    let first = pathfinder("user1", 1, 64, 1);
    agent.send(&first).await;
    agent.responses(&first, 1).await;

    let again = pathfinder("user1", 2, 64, 2);
    agent.send(&again).await;
    assert_eq!(
        agent.responses(&again, 1).await[0].body.as_text(),
        Some("Please wait 15 more second(s) before reusing the `pathfinder` command.")
    );

    let other_user = pathfinder("user2", 2, 64, 2);
    agent.send(&other_user).await;
    let sent = agent.responses(&other_user, 1).await;
    assert_eq!(sent[0].body.as_embed().unwrap().title, "Pathfinding initiated");

    tokio::time::sleep(Duration::from_secs(15)).await;
    let later = pathfinder("user1", 3, 64, 3);
    agent.send(&later).await;
    let sent = agent.responses(&later, 1).await;
    assert_eq!(sent[0].body.as_embed().unwrap().title, "Pathfinding initiated");
    agent.stop().await;
}

#[tokio::test(start_paused = true)]
async fn users_outside_the_allowlist_are_ignored() {
    let mut setup = Setup::new(GoalMode::Manual);
    setup.allowed_users = vec!["owner".into()];
    let agent = setup.boot();
    let world = agent.session(1).await;

    let denied = pathfinder("stranger", 5, 64, 5);
    agent.send(&denied).await;
    let allowed = slash("owner", "help");
    agent.send(&allowed).await;
    agent.responses(&allowed, 1).await;

    assert!(agent.discord.sent_for(&denied.id).is_empty());
    assert!(world.goal_sets().is_empty());
    agent.stop().await;
}

#[tokio::test(start_paused = true)]
async fn commands_need_a_live_session() {
    let setup = Setup::new(GoalMode::Manual);
    setup.factory.fail_next(100);
    let agent = setup.boot();
    agent.factory.wait_for_attempts(1).await;

    let request = slash("user1", "position");
    agent.send(&request).await;
    assert_eq!(
        agent.responses(&request, 1).await[0].body.as_text(),
        Some("The bot is not connected to the game server.")
    );

    // Help is answered without a session.
    let help = slash("user1", "help");
    agent.send(&help).await;
    assert_eq!(
        agent.responses(&help, 1).await[0].body.as_text(),
        Some("Commands: pathfinder, position, stop")
    );
    agent.stop().await;
}

#[tokio::test(start_paused = true)]
async fn position_respects_coordinate_display() {
    let mut config = AppConfig::default();
    config.behavior.show_coordinates = false;
    let mut setup = Setup::new(GoalMode::Manual);
    setup.settings = RuntimeSettings::from_config(&config);
    let agent = setup.boot();
    agent.session(1).await;

    let request = slash("user1", "position");
    agent.send(&request).await;
    assert_eq!(
        agent.responses(&request, 1).await[0].body.as_text(),
        Some("Coordinate display is disabled.")
    );
    agent.stop().await;
}

// ── Event reactor in a live session ──────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn combat_reflex_fights_back_with_a_sword() {
    let mut setup = Setup::new(GoalMode::Manual);
    setup.factory = setup.factory.with_seed(|world| {
        world.give("diamond_sword", 1);
        world.add_player(7, "griefer", Position::new(3.5, 64.0, 4.5));
        world.add_player(8, "bystander", Position::new(20.5, 64.0, 0.5));
    });
    let agent = setup.boot();
    let world = agent.session(1).await;

    world.emit(WorldEvent::EntityHurt { entity: EntityId(1) });
    world
        .wait_until(|w| w.action_calls().contains(&WorldCall::Attack(EntityId(7))))
        .await;

    assert_eq!(world.held_item().as_deref(), Some("diamond_sword"));
    assert!(!world.action_calls().contains(&WorldCall::Attack(EntityId(8))));
    agent.stop().await;
}

#[tokio::test(start_paused = true)]
async fn in_game_help_is_answered_by_the_new_session() {
    let agent = Setup::new(GoalMode::Manual).boot();
    let first = agent.session(1).await;

    first.emit(WorldEvent::Disconnected { reason: "kicked".into() });
    agent.reach(SupervisorState::Disconnected).await;
    let second = agent.session(2).await;

    second.emit(chat("alex", "!help stop"));
    second.wait_until(|w| !w.chats().is_empty()).await;
    assert_eq!(
        second.chats(),
        vec!["Usage: /stop | Description: Stops the bot's current movement goal.".to_string()]
    );
    assert!(first.chats().is_empty());
    agent.stop().await;
}

// ── Connection supervision ───────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn repeated_deaths_each_reconnect_once_after_five_seconds() {
    let agent = Setup::new(GoalMode::Manual).boot();

    const DEATHS: usize = 3;
    for n in 1..=DEATHS {
        let world = agent.session(n).await;
        let died_at = Instant::now();
        world.emit(WorldEvent::Death);
        agent.reach(SupervisorState::Dead).await;

        agent.factory.wait_for_session(n + 1).await;
        assert!(died_at.elapsed() >= Duration::from_secs(5));
        assert!(world.calls().contains(&WorldCall::Quit("died".into())));
    }

    agent.session(DEATHS + 1).await;
    assert_eq!(agent.factory.attempts(), DEATHS as u32 + 1);
    agent.stop().await;
}

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_pathfinding_and_commands_resume_after_reconnect() {
    let agent = Setup::new(GoalMode::Manual).boot();
    let first = agent.session(1).await;

    let request = pathfinder("user1", 30, 64, 30);
    agent.send(&request).await;
    first.wait_for_goal_sets(1).await;

    first.emit(WorldEvent::Disconnected { reason: "timed out".into() });
    let sent = agent.responses(&request, 2).await;
    assert_eq!(sent[1].body.as_text(), Some("Pathfinding to 30, 64, 30 was cancelled."));

    let second = agent.session(2).await;
    second.teleport(Position::new(12.2, 70.0, -8.7));
    let position = slash("user1", "position");
    agent.send(&position).await;
    let sent = agent.responses(&position, 1).await;
    assert_eq!(
        sent[0].body.as_embed().unwrap().field_value("Position"),
        Some("12, 70, -9")
    );
    agent.stop().await;
}
