use std::env;
use std::time::Duration;

use tracing::warn;
use uuid::Uuid;

use crate::chat::reconnect::ReconnectPolicy;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub support: SupportConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct SupportConfig {
    /// Typing-presence quiet period in milliseconds.
    pub typing_quiet_ms: u64,
    pub reconnect: ReconnectConfig,
    /// Optional JSON priority-rule catalogue; falls back to the built-in
    /// rules when absent or unparsable.
    pub priority_rules: Option<serde_json::Value>,
    /// Agent roster eligible for rule-driven auto-assignment. Empty
    /// roster means auto-assign rules leave tickets unassigned.
    pub agents: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    pub base_ms: u64,
    pub cap_ms: u64,
    pub max_attempts: u32,
}

impl ReconnectConfig {
    pub fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            base: Duration::from_millis(self.base_ms),
            cap: Duration::from_millis(self.cap_ms),
            max_attempts: self.max_attempts,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            support: SupportConfig {
                typing_quiet_ms: 1500,
                reconnect: ReconnectConfig {
                    base_ms: 500,
                    cap_ms: 30_000,
                    max_attempts: 6,
                },
                priority_rules: None,
                agents: Vec::new(),
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let agents = env::var("DESK_AGENTS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .filter_map(|s| match s.parse::<Uuid>() {
                        Ok(id) => Some(id),
                        Err(e) => {
                            warn!("skipping invalid agent id {s:?} in DESK_AGENTS: {e}");
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let priority_rules = env::var("DESK_PRIORITY_RULES").ok().and_then(|raw| {
            match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("DESK_PRIORITY_RULES is not valid JSON, using built-in rules: {e}");
                    None
                }
            }
        });

        Self {
            server: ServerConfig {
                host: env_or("DESK_HOST", defaults.server.host),
                port: env_parsed("DESK_PORT", defaults.server.port),
            },
            support: SupportConfig {
                typing_quiet_ms: env_parsed(
                    "DESK_TYPING_QUIET_MS",
                    defaults.support.typing_quiet_ms,
                ),
                reconnect: ReconnectConfig {
                    base_ms: env_parsed(
                        "DESK_RECONNECT_BASE_MS",
                        defaults.support.reconnect.base_ms,
                    ),
                    cap_ms: env_parsed(
                        "DESK_RECONNECT_CAP_MS",
                        defaults.support.reconnect.cap_ms,
                    ),
                    max_attempts: env_parsed(
                        "DESK_RECONNECT_MAX_ATTEMPTS",
                        defaults.support.reconnect.max_attempts,
                    ),
                },
                priority_rules,
                agents,
            },
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behavior() {
        let config = AppConfig::default();
        assert_eq!(config.support.typing_quiet_ms, 1500);
        assert!(config.support.agents.is_empty());
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn reconnect_config_builds_a_policy() {
        let config = AppConfig::default();
        let policy = config.support.reconnect.policy();
        assert_eq!(policy.base, Duration::from_millis(500));
        assert_eq!(policy.cap, Duration::from_secs(30));
        assert_eq!(policy.max_attempts, 6);
    }
}
