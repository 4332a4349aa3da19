use std::net::SocketAddr;

use crate::SearchRadius;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub ebird_api_key: Option<String>,
    pub ebird_base_url: String,
    pub geocoder_base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub default_radius: SearchRadius,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field(
                "ebird_api_key",
                &self.ebird_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("ebird_base_url", &self.ebird_base_url)
            .field("geocoder_base_url", &self.geocoder_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("default_radius", &self.default_radius)
            .finish()
    }
}
