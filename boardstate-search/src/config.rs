//! Search configuration, loadable from TOML.
//!
//! ```toml
//! time_limit_ms = 500
//! seed = 7
//!
//! [alphabeta]
//! max_depth = 9
//!
//! [uct]
//! exploration = 0.5
//! max_playouts = 20000
//! ```
//!
//! Missing keys take their defaults.

use std::path::Path;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    AlphaBeta,
    Uct,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum GameKind {
    TicTacToe,
    Gobblers,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaBetaConfig {
    /// Deepest iteration of iterative deepening.
    pub max_depth: u32,
    /// Transposition table entries before it is cleared.
    pub table_capacity: usize,
}

impl Default for AlphaBetaConfig {
    fn default() -> Self {
        Self {
            max_depth: 9,
            table_capacity: 1 << 20,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UctConfig {
    /// UCB1 exploration constant.
    pub exploration: f64,
    pub max_playouts: u64,
    /// Tree size limit; selection continues but expansion stops.
    pub max_nodes: usize,
    /// Playouts are scored as draws after this many moves.
    pub playout_depth: usize,
}

impl Default for UctConfig {
    fn default() -> Self {
        Self {
            exploration: 0.5,
            max_playouts: 20_000,
            max_nodes: 200_000,
            playout_depth: 200,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Per-move time budget; zero means no limit.
    pub time_limit_ms: u64,
    /// Seed for playout randomness; unseeded runs draw from the OS.
    pub seed: Option<u64>,
    /// Seconds between progress lines; zero disables them.
    pub log_interval_secs: u64,
    pub alphabeta: AlphaBetaConfig,
    pub uct: UctConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 1_000,
            seed: None,
            log_interval_secs: 5,
            alphabeta: AlphaBetaConfig::default(),
            uct: UctConfig::default(),
        }
    }
}

impl SearchConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, SearchError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, SearchError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn time_limit(&self) -> Option<Duration> {
        (self.time_limit_ms > 0).then(|| Duration::from_millis(self.time_limit_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let config = SearchConfig::from_toml_str("").unwrap();
        assert_eq!(config, SearchConfig::default());
        assert_eq!(config.time_limit(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_partial_toml() {
        let config = SearchConfig::from_toml_str(
            r#"
            time_limit_ms = 0
            seed = 42

            [uct]
            exploration = 1.4
            "#,
        )
        .unwrap();
        assert_eq!(config.time_limit(), None);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.uct.exploration, 1.4);
        assert_eq!(config.uct.max_playouts, UctConfig::default().max_playouts);
        assert_eq!(config.alphabeta, AlphaBetaConfig::default());
    }

    #[test]
    fn test_bad_toml() {
        let err = SearchConfig::from_toml_str("time_limit_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, SearchError::Config(_)));
    }

    #[test]
    fn test_engine_kind_names() {
        assert_eq!(
            EngineKind::from_str("alpha-beta", false),
            Ok(EngineKind::AlphaBeta)
        );
        assert_eq!(GameKind::from_str("tic-tac-toe", false), Ok(GameKind::TicTacToe));
    }
}
