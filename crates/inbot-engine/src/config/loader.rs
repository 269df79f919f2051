use super::ConfigError;
use super::selectors::SelectorPack;
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the selector pack from the first location that exists:
    /// 1. `explicit` (from `INBOT_SELECTORS`)
    /// 2. ./inbot.yaml
    /// 3. ~/.inbot/selectors.yaml
    /// 4. Built-in defaults
    pub async fn load_default(explicit: Option<&Path>) -> Result<SelectorPack, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path).await;
        }

        let local_config = PathBuf::from("./inbot.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".inbot").join("selectors.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(SelectorPack::default())
    }

    pub async fn load_from(path: &Path) -> Result<SelectorPack, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let pack: SelectorPack = serde_yaml::from_str(&content)?;
        tracing::info!("Loaded selector pack from {}", path.display());
        Ok(pack)
    }
}
