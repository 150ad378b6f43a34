use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use arbor_graph::TreeOptions;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Configuration for a [`Storage`](crate::Storage) facade.
///
/// Every field has a default, so a TOML file only needs the keys it
/// changes:
///
/// ```toml
/// cache_size = 5000
/// data_dir = "/var/lib/arbor"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum number of cached entries per named tree or map.
    pub cache_size: usize,
    /// Whether trees accept a mapping at the empty path.
    pub allow_root_value: bool,
    /// Whether `close` persists open trees and maps first.
    pub persist_on_close: bool,
    /// Root directory for file-backed storage.
    pub data_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_size: 1000,
            allow_root_value: false,
            persist_on_close: true,
            data_dir: None,
        }
    }
}

impl StoreConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> StoreResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| StoreError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.cache_size == 0 {
            return Err(StoreError::InvalidConfig(
                "cache_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// A configuration rooted at `dir`, other fields defaulted.
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(dir.into()),
            ..Default::default()
        }
    }

    pub(crate) fn cache_capacity(&self) -> StoreResult<NonZeroUsize> {
        NonZeroUsize::new(self.cache_size)
            .ok_or_else(|| StoreError::InvalidConfig("cache_size must be at least 1".into()))
    }

    pub(crate) fn tree_options<V>(&self) -> TreeOptions<V> {
        TreeOptions::default().allow_root_value(self.allow_root_value)
    }
}
