//! Shared fixtures for command tests.

use std::sync::Arc;

use blockpilot_channels::{DiscordChannel, DiscordConfig, OutboundMessage};
use blockpilot_core::channel::{ChannelId, Interaction, InteractionResponder, Responder};
use blockpilot_core::command::CommandContext;
use blockpilot_navigation::{NavigationSettings, Navigator};
use blockpilot_world::{GoalMode, SimWorld, SimWorldConfig};

pub struct Fixture {
    pub world: Arc<SimWorld>,
    pub navigator: Navigator,
    pub channel: Arc<DiscordChannel>,
    pub ctx: CommandContext,
}

impl Fixture {
    pub fn new(mode: GoalMode) -> Self {
        let world = Arc::new(SimWorld::new(SimWorldConfig {
            goal_mode: mode,
            ..SimWorldConfig::default()
        }));
        let navigator = Navigator::new(world.clone(), NavigationSettings::default());
        let channel = Arc::new(DiscordChannel::new(DiscordConfig {
            bot_token: "token".into(),
            allowed_users: vec!["*".into()],
            guild_filter: vec![],
        }));
        let ctx = CommandContext {
            world: world.clone(),
            navigation: Arc::new(navigator.clone()),
            show_coordinates: true,
        };
        Self {
            world,
            navigator,
            channel,
            ctx,
        }
    }

    pub fn interaction(&self, command: &str) -> Interaction {
        Interaction::new(ChannelId("discord".into()), "user1", command)
    }

    pub fn responder(&self, interaction: &Interaction) -> Arc<dyn Responder> {
        Arc::new(InteractionResponder::new(self.channel.clone(), interaction.clone()))
    }

    pub async fn responses(&self, interaction: &Interaction, count: usize) -> Vec<OutboundMessage> {
        self.channel.wait_for_responses(&interaction.id, count).await
    }
}
