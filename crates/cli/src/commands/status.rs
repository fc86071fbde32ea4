//! `blockpilot status`: show the resolved configuration.

use blockpilot_config::AppConfig;

fn toggle(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("blockpilot status");
    println!("=================");
    println!("  Config dir:    {}", AppConfig::config_dir().display());
    println!("  Server:        {}", config.server.address());
    println!("  Version:       {}", config.server.version);
    println!("  Username:      {} ({})", config.server.username, config.server.auth);
    println!("  Prefix:        {}", config.prefix);
    println!("  Silent:        {}", toggle(config.behavior.silent));
    println!("  Guarding:      {}", toggle(config.behavior.guarding));
    println!("  Coordinates:   {}", toggle(config.behavior.show_coordinates));
    println!("  Chat logging:  {}", toggle(config.behavior.logging));
    println!(
        "  Master:        {}",
        config.behavior.master.as_deref().unwrap_or("(none)")
    );
    println!("  Retry ceiling: {}", config.navigation.retry_ceiling);
    println!("  Reconnect:     {}s", config.supervisor.reconnect_delay_secs);
    println!("  Discord:       {}", toggle(config.discord.enabled));

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file; run `blockpilot onboard` first");
    }

    Ok(())
}
