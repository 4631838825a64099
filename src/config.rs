use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::tftp::client::config::{ClientConfig, DEFAULT_PORT, TftpcConfigFile};

pub const CONFIG_FILE: &str = ".tftpc.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tftpc: Option<TftpcConfigFile>,
}

impl AppConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn generate_config_file(path: impl AsRef<Path>, force: bool) -> anyhow::Result<()> {
        let path = path.as_ref();

        if path.exists() && !force {
            anyhow::bail!(
                "Configuration file {} already exists. Use --force to overwrite.",
                path.display()
            );
        }

        fs::write(path, Self::generate_full_config()?)?;

        info!("Configuration file generated: {}", path.display());
        info!("Please edit this file to customize configuration");
        Ok(())
    }

    pub fn generate_full_config() -> anyhow::Result<String> {
        let config = AppConfig {
            tftpc: Some(TftpcConfigFile {
                get: Some(ClientConfig::new("127.0.0.1".to_string(), DEFAULT_PORT)),
                put: Some(ClientConfig::new("127.0.0.1".to_string(), DEFAULT_PORT)),
            }),
        };
        let toml_content = toml::to_string_pretty(&config)?;
        Ok(format!(
            "# tftpc configuration file\n# All fields are optional, values here take precedence over command line defaults\n\n{}",
            toml_content
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_generated_config_loads_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);

        AppConfig::generate_config_file(&path, false).unwrap();
        let config = AppConfig::load_from_file(&path).unwrap();

        let get = config.tftpc.and_then(|c| c.get).unwrap();
        assert_eq!(get.server.as_deref(), Some("127.0.0.1"));
        assert_eq!(get.port, Some(DEFAULT_PORT));
        assert_eq!(get.timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_refuses_overwrite_without_force() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "# mine\n").unwrap();

        assert!(AppConfig::generate_config_file(&path, false).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "# mine\n");

        AppConfig::generate_config_file(&path, true).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("127.0.0.1"));
    }

    #[test]
    fn test_partial_config() {
        let config: AppConfig = toml::from_str(
            r#"
            [tftpc.put]
            retries = 5
            "#,
        )
        .unwrap();
        let tftpc = config.tftpc.unwrap();
        assert!(tftpc.get.is_none());
        assert_eq!(tftpc.put.unwrap().retries, Some(5));
    }
}
