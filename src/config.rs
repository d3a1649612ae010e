//! Configuration loader — merges env vars, .env file, and config.toml.

use std::path::Path;

use common::{BotConfig, Error};

/// Load bot configuration from defaults, optional config file, and
/// environment overrides.
pub fn load_config() -> Result<BotConfig, Error> {
    // 1. Load .env file if present.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = BotConfig::default();

    // 3. Try loading config.toml if it exists.
    let config_path = Path::new("config.toml");
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read config.toml: {}", e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config.toml: {}", e)))?;
    }

    // 4. Override with environment variables (highest priority).
    if let Ok(paper) = std::env::var("PAPER_MODE") {
        config.paper_mode = paper != "0" && paper.to_lowercase() != "false";
    }
    if let Ok(pending) = std::env::var("USE_PENDING_REWARDS") {
        config.strategy.use_pending_rewards =
            pending != "0" && pending.to_lowercase() != "false";
    }

    // 5. Validate.
    if config.gas.default_gas == 0 {
        return Err(Error::Config("default_gas must be positive".into()));
    }
    if config.timing.confirm_timeout_secs == 0 {
        return Err(Error::Config("confirm_timeout_secs must be positive".into()));
    }
    if config.timing.bond_poll_interval_secs == 0 || config.timing.rebase_poll_interval_secs == 0
    {
        return Err(Error::Config("poll intervals must be positive".into()));
    }
    if config.strategy.min_bond_discount_percent < 0.0 {
        return Err(Error::Config(
            "min_bond_discount_percent must not be negative".into(),
        ));
    }

    Ok(config)
}
