use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Report settings for the `pnbound` binary, read from a TOML file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PnConfig {
    /// Print every recorded reachability edge after the analysis.
    #[serde(default)]
    pub show_graph: bool,
    /// Where to write the reachability graph in DOT, if anywhere.
    #[serde(default)]
    pub dot_output: Option<PathBuf>,
    /// Print only the witness line for unbounded nets.
    #[serde(default)]
    pub witness_only: bool,
    #[serde(default = "default_max_listed_edges")]
    pub max_listed_edges: usize,
}

impl Default for PnConfig {
    fn default() -> Self {
        Self {
            show_graph: false,
            dot_output: None,
            witness_only: false,
            max_listed_edges: default_max_listed_edges(),
        }
    }
}

impl PnConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: PnConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }
}

fn default_max_listed_edges() -> usize {
    200
}
