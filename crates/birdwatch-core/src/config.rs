use crate::app_config::{AppConfig, Environment};
use crate::{ConfigError, SearchRadius};

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can feed a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let env = parse_environment(&or_default("BIRDWATCH_ENV", "development"))?;

    let bind_addr = or_default("BIRDWATCH_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("BIRDWATCH_BIND_ADDR", e.to_string()))?;

    let log_level = or_default("BIRDWATCH_LOG_LEVEL", "info");

    let ebird_api_key = lookup("EBIRD_API_KEY")
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty());

    let ebird_base_url = or_default("BIRDWATCH_EBIRD_BASE_URL", "https://api.ebird.org/v2/");
    let geocoder_base_url = or_default(
        "BIRDWATCH_GEOCODER_BASE_URL",
        "https://nominatim.openstreetmap.org/",
    );

    let request_timeout_secs = or_default("BIRDWATCH_REQUEST_TIMEOUT_SECS", "30")
        .parse::<u64>()
        .map_err(|e| invalid("BIRDWATCH_REQUEST_TIMEOUT_SECS", e.to_string()))?;
    if request_timeout_secs == 0 {
        return Err(invalid(
            "BIRDWATCH_REQUEST_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }

    let user_agent = or_default(
        "BIRDWATCH_USER_AGENT",
        "birdwatch/0.1 (observation-dashboard)",
    );

    let default_radius = or_default("BIRDWATCH_DEFAULT_RADIUS_KM", "25")
        .parse::<i64>()
        .map_err(|e| e.to_string())
        .and_then(|km| SearchRadius::new(km).map_err(|e| e.to_string()))
        .map_err(|reason| invalid("BIRDWATCH_DEFAULT_RADIUS_KM", reason))?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        ebird_api_key,
        ebird_base_url,
        geocoder_base_url,
        request_timeout_secs,
        user_agent,
        default_radius,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BIRDWATCH_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
