//! Configuration types.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Path to the local database file.
    pub db_path: String,
    /// Path to the promo content document.
    pub promo_path: String,
    /// Base URL of the management process, if one is running.
    /// Domain events are forwarded there as JSON notifications.
    pub management_url: Option<String>,
    /// Maximum entries kept in a contact's message-history excerpt.
    pub history_limit: usize,
    /// Dispatcher settings.
    pub dispatcher: DispatcherConfig,
}

/// Campaign dispatcher settings.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Interval between dispatch cycles.
    pub cycle_interval: Duration,
    /// Delay between two sends within one campaign, to respect the
    /// channel's single-session throughput.
    pub send_delay: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            cycle_interval: Duration::from_secs(10),
            send_delay: Duration::from_millis(800),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            db_path: "./data/storebot.db".to_string(),
            promo_path: "./data/promo.json".to_string(),
            management_url: None,
            history_limit: 20,
            dispatcher: DispatcherConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Build a config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cycle_interval = env_u64("STOREBOT_CYCLE_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.dispatcher.cycle_interval);
        let send_delay = env_u64("STOREBOT_SEND_DELAY_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.dispatcher.send_delay);

        Self {
            db_path: std::env::var("STOREBOT_DB_PATH").unwrap_or(defaults.db_path),
            promo_path: std::env::var("STOREBOT_PROMO_PATH").unwrap_or(defaults.promo_path),
            management_url: std::env::var("STOREBOT_MANAGEMENT_URL").ok(),
            history_limit: env_u64("STOREBOT_HISTORY_LIMIT")
                .map(|n| n as usize)
                .unwrap_or(defaults.history_limit),
            dispatcher: DispatcherConfig {
                cycle_interval,
                send_delay,
            },
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
