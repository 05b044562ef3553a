use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::net::SocketAddr;
use std::time::Duration;

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct AiSettings {
    pub base_url: String,
    /// Complete `Authorization` header value, if any.
    pub authorization: Option<String>,
}

impl AiSettings {
    pub fn from_env() -> Option<Self> {
        let base_url = env_non_empty("AI_API_BASE_URL")?;
        let authorization = env_non_empty("AI_API_BEARER")
            .map(|token| format!("Bearer {}", token))
            .or_else(|| {
                let cid = env_non_empty("AI_API_CLIENT_ID")?;
                let sec = env_non_empty("AI_API_CLIENT_SECRET")?;
                Some(format!("Basic {}", STANDARD.encode(format!("{}:{}", cid, sec))))
            });
        Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization,
        })
    }
}

/// Bounds on the in-memory quiz sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Sessions untouched for longer than this are dropped.
    pub idle: Duration,
    /// When full, the least recently touched session makes room.
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            idle: Duration::from_secs(3600),
            max_sessions: 10_000,
        }
    }
}

impl SessionLimits {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            idle: env_non_empty("SESSION_IDLE_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle),
            max_sessions: env_non_empty("MAX_SESSIONS")
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_sessions),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub local_state_path: Option<String>,
    pub ai: Option<AiSettings>,
    pub sessions: SessionLimits,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            local_state_path: None,
            ai: None,
            sessions: SessionLimits::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_non_empty("BACKEND_HOST").unwrap_or(defaults.host),
            port: env_non_empty("BACKEND_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            local_state_path: env_non_empty("LOCAL_STATE_PATH"),
            ai: AiSettings::from_env(),
            sessions: SessionLimits::from_env(),
        }
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_addr_parses() {
        let addr = AppConfig::default().addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn bad_host_is_an_error() {
        let config = AppConfig {
            host: "not a host".into(),
            ..AppConfig::default()
        };
        assert!(config.addr().is_err());
    }
}
