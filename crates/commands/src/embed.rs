//! Embeds branded with the bot's identity.

use chrono::Utc;

use blockpilot_core::channel::Embed;
use blockpilot_core::world::World;

/// An embed footed with the bot's username and stamped with the current time.
pub fn branded(world: &dyn World, title: &str) -> Embed {
    Embed::new(title)
        .footer(world.username())
        .timestamp(Utc::now())
}
