use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::buffer::manager::Error;

// プール生成時に決まる設定
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    // フレーム数
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    #[serde(default = "default_heap_file")]
    pub heap_file: PathBuf,
}

fn default_pool_size() -> usize {
    64
}

fn default_heap_file() -> PathBuf {
    PathBuf::from("bufpool.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            heap_file: default_heap_file(),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).context("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.pool_size == 0 {
            return Err(Error::Config("pool_size must be > 0".to_string()));
        }
        Ok(())
    }
}
