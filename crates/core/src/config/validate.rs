use super::{types::Config, ConfigError};

/// Semantic validation beyond what deserialization enforces
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.transcoder.fallback_duration_secs <= 0.0 {
        return Err(ConfigError::Invalid(
            "transcoder.fallback_duration_secs must be positive".to_string(),
        ));
    }

    if config.transcoder.ffmpeg_path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid(
            "transcoder.ffmpeg_path must not be empty".to_string(),
        ));
    }

    if config.transcoder.ffprobe_path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid(
            "transcoder.ffprobe_path must not be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_rejects_nonpositive_fallback_duration() {
        let mut config = Config::default();
        config.transcoder.fallback_duration_secs = 0.0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_empty_tool_path() {
        let mut config = Config::default();
        config.transcoder.ffmpeg_path = Default::default();
        assert!(validate_config(&config).is_err());
    }
}
