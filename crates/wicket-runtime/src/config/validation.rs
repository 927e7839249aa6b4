//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{
    BotConfig, InteractionsConfig, LogOutput, LoggingConfig, PermissionsConfig, WicketConfig,
};

/// Platform cap on replies per interaction.
const MAX_REPLY_LIMIT: u32 = 5;

/// The platform drops interactions not acknowledged within three seconds.
const MAX_INITIAL_TIMEOUT_MS: u64 = 3000;

/// Validates the entire configuration.
pub fn validate_config(config: &WicketConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_permissions_config(&config.permissions)?;
    validate_interactions_config(&config.interactions)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    if bot.application_id == 0 {
        return Err(ConfigError::missing_field("bot.application_id"));
    }
    if bot.operators.contains(&0) {
        return Err(ConfigError::validation("Operator ids must be non-zero"));
    }
    Ok(())
}

fn validate_permissions_config(permissions: &PermissionsConfig) -> ConfigResult<()> {
    if permissions.cache_ttl_secs == 0 {
        return Err(ConfigError::validation(
            "Permission cache TTL must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_interactions_config(interactions: &InteractionsConfig) -> ConfigResult<()> {
    if interactions.default_timeout_ms == 0 {
        return Err(ConfigError::validation(
            "Default handler timeout must be greater than 0",
        ));
    }
    if interactions.default_timeout_ms >= MAX_INITIAL_TIMEOUT_MS {
        return Err(ConfigError::validation(format!(
            "Default handler timeout must be below {MAX_INITIAL_TIMEOUT_MS} ms"
        )));
    }
    if interactions.reply_limit == 0 || interactions.reply_limit > MAX_REPLY_LIMIT {
        return Err(ConfigError::validation(format!(
            "Reply limit must be between 1 and {MAX_REPLY_LIMIT}"
        )));
    }
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> WicketConfig {
        let mut config = WicketConfig::default();
        config.bot.application_id = 508391840525975553;
        config
    }

    #[test]
    fn test_validate_defaults_with_identity() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_validate_missing_application_id() {
        let result = validate_config(&WicketConfig::default());
        assert!(matches!(result, Err(ConfigError::MissingField { field }) if field == "bot.application_id"));
    }

    #[test]
    fn test_validate_reply_limit_bounds() {
        let mut config = valid();
        config.interactions.reply_limit = 6;
        assert!(validate_config(&config).is_err());

        config.interactions.reply_limit = 0;
        assert!(validate_config(&config).is_err());

        config.interactions.reply_limit = 1;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_timeout_within_platform_window() {
        let mut config = valid();
        config.interactions.default_timeout_ms = 3000;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_file_output_needs_path() {
        let mut config = valid();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));

        config.logging.file_path = Some("logs/wicket.log".into());
        assert!(validate_config(&config).is_ok());
    }
}
