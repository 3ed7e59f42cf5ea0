//! Loading the session configuration from TOML
//!
//! Every key is optional and falls back to the built-in defaults:
//!
//! ```toml
//! file_name = "logs/run.txt"
//! spacing = 3.0
//! time_unit = "minutes"
//! save_interval_secs = 300
//!
//! [baseline]
//! source = "stable"
//! hold_secs = 60
//!
//! [[channels]]
//! address = "80:ea:ca:10:02:dd"
//! label = "front left"
//! color = [60, 164, 187]
//! ```

use std::path::Path;

use anyhow::{Context, Result, anyhow};

use tpms_core::config::SessionConfig;

/// Load and validate a configuration file, or the defaults without one.
pub fn load(path: Option<&Path>) -> Result<SessionConfig> {
    let config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            parse(&content)?
        }
        None => SessionConfig::default(),
    };
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {e}"))?;
    Ok(config)
}

pub fn parse(content: &str) -> Result<SessionConfig> {
    toml::from_str(content).context("Failed to parse TOML configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tpms_core::config::{BaselineSource, TimeUnit};

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.file_name, "test.txt");
        assert_eq!(config.spacing, 3.0);
        assert_eq!(config.time_unit, TimeUnit::Minutes);
        assert_eq!(config.channels.len(), 4);
    }

    #[test]
    fn test_stable_baseline_table() {
        let config = parse(
            r#"
            [baseline]
            source = "stable"
            hold_secs = 90
            "#,
        )
        .unwrap();
        assert_eq!(config.baseline, BaselineSource::Stable { hold_secs: 90 });
        assert_eq!(parse("").unwrap().baseline, BaselineSource::Manual);
    }

    #[test]
    fn test_channels_and_calibration_override() {
        let config = parse(
            r#"
            file_name = "logs/run.txt"
            spacing = 30.0
            time_unit = "seconds"

            [calibration.pressure]
            slope = 0.5
            intercept = 1.0

            [[channels]]
            address = "aa:bb:cc:dd:ee:ff"
            label = "spare"
            color = [1, 2, 3]
            "#,
        )
        .unwrap();

        assert_eq!(config.file_name, "logs/run.txt");
        assert_eq!(config.time_unit, TimeUnit::Seconds);
        assert_eq!(config.calibration.to_pressure(4), 3.0);
        assert_eq!(config.channels.len(), 1);
        assert_eq!(config.channels[0].label.as_str(), "spare");
        assert!(config.channels[0].matches("AA:BB:CC:DD:EE:FF"));
    }

    #[test]
    fn test_load_rejects_invalid_spacing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "spacing = -1.0").unwrap();
        let err = load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"), "{err}");
    }

    #[test]
    fn test_load_without_file() {
        assert!(load(None).is_ok());
    }
}
