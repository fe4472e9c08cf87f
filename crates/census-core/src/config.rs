//! Unit configuration
//!
//! Loaded from a JSON file or built in code. Every field has a default, so a
//! config file only needs the values it changes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use census_logic::constants::{DEFAULT_LAYOUT, SEED_BED_COUNT};
use census_logic::grid::GridSize;

/// Configuration for one unit board
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitConfig {
    /// Display name of the unit, e.g. "4 West"
    pub unit_name: String,
    pub grid: GridSize,
    /// Beds generated for a fresh layout
    pub bed_count: usize,
    /// Layout opened at startup
    pub default_layout: String,
    /// RNG seed for seed data; `None` draws from entropy
    pub seed: Option<u64>,
    /// Save after every settled change
    pub autosave: bool,
    /// Directory used by file-backed storage
    pub storage_dir: PathBuf,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            unit_name: "4 West".to_string(),
            grid: GridSize::default(),
            bed_count: SEED_BED_COUNT,
            default_layout: DEFAULT_LAYOUT.to_string(),
            seed: None,
            autosave: true,
            storage_dir: PathBuf::from("census-data"),
        }
    }
}

/// Configuration problems
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("grid must have at least one row and one column")]
    EmptyGrid,
    #[error("{beds} beds do not fit on a board of {cells} cells")]
    TooManyBeds { beds: usize, cells: usize },
    #[error("default layout name is empty")]
    EmptyLayoutName,
    #[error("default layout name `{0}` contains `/`")]
    InvalidLayoutName(String),
}

impl UnitConfig {
    /// Read a config from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Check the configuration, returning all problems found
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.grid.rows == 0 || self.grid.columns == 0 {
            errors.push(ConfigError::EmptyGrid);
        } else if self.bed_count > self.grid.cell_count() {
            errors.push(ConfigError::TooManyBeds {
                beds: self.bed_count,
                cells: self.grid.cell_count(),
            });
        }

        let layout = self.default_layout.trim();
        if layout.is_empty() {
            errors.push(ConfigError::EmptyLayoutName);
        } else if layout.contains('/') {
            errors.push(ConfigError::InvalidLayoutName(layout.to_string()));
        }

        errors
    }
}
