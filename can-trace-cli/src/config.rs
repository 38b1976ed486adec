//! Configuration loading and parsing

use anyhow::{Context, Result};
use can_trace_engine::TraceConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub trace: TraceConfig,
    #[serde(default)]
    pub filtering: FilteringConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    pub log: Option<PathBuf>,
    pub dbc: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilteringConfig {
    pub channels: Option<Vec<u8>>,
    pub message_ids: Option<Vec<u32>>,
}

impl AppConfig {
    /// Engine configuration with the `[filtering]` section applied
    pub fn trace_config(&self) -> TraceConfig {
        let mut config = self.trace.clone();
        if let Some(channels) = &self.filtering.channels {
            config = config.with_channel_filter(channels.clone());
        }
        if let Some(ids) = &self.filtering.message_ids {
            config = config.with_message_filter(ids.clone());
        }
        config
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [input]
            log = "trace.log"
            dbc = "powertrain.dbc"

            [trace]
            playback_interval_ms = 20
            decode_cache_limit = 5000

            [filtering]
            channels = [1]
            message_ids = [291, 512]
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.input.log, Some(PathBuf::from("trace.log")));
        assert_eq!(config.trace.playback_interval_ms, 20);
        assert!(config.trace.normalize_timestamps);

        let trace = config.trace_config();
        assert_eq!(trace.decode_cache_limit, Some(5000));
        assert!(trace.should_process_frame(1, 291));
        assert!(!trace.should_process_frame(2, 291));
        assert!(!trace.should_process_frame(1, 0x7FF));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.input.log.is_none());
        assert_eq!(config.trace_config().playback_interval_ms, 50);
    }

    #[test]
    fn test_load_config_errors_carry_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[trace]\nplayback_interval_ms = \"fast\"\n").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));

        assert!(load_config(Path::new("/nonexistent/config.toml")).is_err());
    }
}
