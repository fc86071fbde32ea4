//! Runtime view of the loaded configuration.

use std::time::Duration;

use blockpilot_config::AppConfig;
use blockpilot_navigation::NavigationSettings;

/// Behaviour toggles consumed by the reactor and commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BehaviorSettings {
    pub silent: bool,
    pub guarding: bool,
    pub show_coordinates: bool,
    pub logging: bool,
    pub master: Option<String>,
}

impl Default for BehaviorSettings {
    fn default() -> Self {
        Self {
            silent: false,
            guarding: true,
            show_coordinates: true,
            logging: false,
            master: None,
        }
    }
}

/// Everything the runtime needs, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSettings {
    /// In-game chat command prefix.
    pub prefix: String,
    pub behavior: BehaviorSettings,
    pub navigation: NavigationSettings,
    /// Attackers beyond this distance are ignored.
    pub combat_radius: f64,
    pub reconnect_delay: Duration,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            prefix: "!".into(),
            behavior: BehaviorSettings::default(),
            navigation: NavigationSettings::default(),
            combat_radius: 6.0,
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

impl RuntimeSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let behavior = &config.behavior;
        Self {
            prefix: config.prefix.clone(),
            behavior: BehaviorSettings {
                silent: behavior.silent,
                guarding: behavior.guarding,
                show_coordinates: behavior.show_coordinates,
                logging: behavior.logging,
                master: behavior.master.clone(),
            },
            navigation: NavigationSettings {
                retry_ceiling: config.navigation.retry_ceiling,
                tolerance: config.navigation.goal_tolerance,
                scan_radius: config.navigation.scan_radius,
                scan_count: config.navigation.scan_count,
            },
            combat_radius: config.combat.radius,
            reconnect_delay: Duration::from_secs(config.supervisor.reconnect_delay_secs),
        }
    }
}
