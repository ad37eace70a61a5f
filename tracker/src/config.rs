//! Session configuration

use std::time::Duration;

/// Token sent on every connect, including invisible reconnects.
pub const DEFAULT_CLIENT_TOKEN: &str = "auproximity";
pub const DEFAULT_PORT: u16 = 22023;
pub const DEFAULT_SPAWN_TIMEOUT: Duration = Duration::from_secs(10);
/// Delay before meeting and exile effects are applied, letting in-flight movement settle.
pub const DEFAULT_ACTION_DELAY: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub host: String,
    pub port: u16,
    pub token: String,
    /// Join code of the game to track.
    pub code: String,
    /// How long to wait for every expected player to spawn after the visible join.
    pub spawn_timeout: Duration,
    pub action_delay: Duration,
}

impl EngineConfig {
    pub fn new(host: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            code: code.into(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    pub fn with_spawn_timeout(mut self, timeout: Duration) -> Self {
        self.spawn_timeout = timeout;
        self
    }

    pub fn with_action_delay(mut self, delay: Duration) -> Self {
        self.action_delay = delay;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            token: DEFAULT_CLIENT_TOKEN.to_string(),
            code: String::new(),
            spawn_timeout: DEFAULT_SPAWN_TIMEOUT,
            action_delay: DEFAULT_ACTION_DELAY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::new("203.0.113.5", "ABCDEF");
        assert_eq!(config.host, "203.0.113.5");
        assert_eq!(config.code, "ABCDEF");
        assert_eq!(config.port, 22023);
        assert_eq!(config.token, "auproximity");
        assert_eq!(config.spawn_timeout, Duration::from_secs(10));
        assert_eq!(config.action_delay, Duration::from_millis(2500));
    }

    #[test]
    fn test_config_builders() {
        let config = EngineConfig::new("localhost", "QWERTY")
            .with_port(22123)
            .with_token("custom")
            .with_spawn_timeout(Duration::from_secs(3))
            .with_action_delay(Duration::ZERO);

        assert_eq!(config.port, 22123);
        assert_eq!(config.token, "custom");
        assert_eq!(config.spawn_timeout, Duration::from_secs(3));
        assert_eq!(config.action_delay, Duration::ZERO);
    }
}
