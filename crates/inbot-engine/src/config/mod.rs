pub mod env;
pub mod loader;
pub mod selectors;

pub use env::AppConfig;
pub use loader::ConfigLoader;
pub use selectors::SelectorPack;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}
