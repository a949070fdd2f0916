use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
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
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let env = parse_environment(&or_default("PRICECAP_ENV", "development"));

    let bind_addr = parse("PRICECAP_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("PRICECAP_LOG_LEVEL", "info");
    let catalog_path = PathBuf::from(or_default(
        "PRICECAP_CATALOG_PATH",
        "./config/catalog.yaml",
    ));
    let archive_path = optional("PRICECAP_ARCHIVE_PATH").map(PathBuf::from);

    let recognizer_url = optional("PRICECAP_RECOGNIZER_URL");
    let recognizer_user_agent = or_default(
        "PRICECAP_RECOGNIZER_USER_AGENT",
        "pricecap/0.1 (field-capture)",
    );
    let recognition_timeout_secs = parse_u64("PRICECAP_RECOGNITION_TIMEOUT_SECS", "10")?;
    if recognition_timeout_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "PRICECAP_RECOGNITION_TIMEOUT_SECS".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    let stub_delay_ms = parse_u64("PRICECAP_STUB_DELAY_MS", "1500")?;
    let rate_limit_per_minute = parse_usize("PRICECAP_RATE_LIMIT_PER_MINUTE", "120")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        catalog_path,
        archive_path,
        recognizer_url,
        recognizer_user_agent,
        recognition_timeout_secs,
        stub_delay_ms,
        rate_limit_per_minute,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
