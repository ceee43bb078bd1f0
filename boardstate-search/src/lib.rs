//! Search engines over cloned boardstate machines.
//!
//! Every search runs on its own [`SearchBoard`], a deep clone of the live
//! machine with a retained journal: engines make and unmake moves on it and
//! must leave it unwound. [`spawn_search`] runs an [`Engine`] on a worker
//! thread.

pub mod adapter;
pub mod alphabeta;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod stats;
pub mod uct;
pub mod worker;

pub use adapter::SearchBoard;
pub use alphabeta::AlphaBeta;
pub use config::{AlphaBetaConfig, EngineKind, GameKind, SearchConfig, UctConfig};
pub use engine::{Budget, Engine, SearchReport};
pub use error::SearchError;
pub use evaluate::{terminal_score, Evaluator, TerminalEvaluator, WIN};
pub use stats::SearchStats;
pub use uct::Uct;
pub use worker::{spawn_search, SearchHandle};

use boardstate_core::Game;

/// Build the configured engine for game `G`.
pub fn build_engine<G: Game>(kind: EngineKind, config: &SearchConfig) -> Box<dyn Engine<G>> {
    match kind {
        EngineKind::AlphaBeta => Box::new(
            AlphaBeta::<G, _>::new(config.alphabeta.clone(), TerminalEvaluator)
                .with_log_interval(config.log_interval_secs),
        ),
        EngineKind::Uct => Box::new(
            Uct::<G>::new(config.uct.clone(), config.seed).with_log_interval(config.log_interval_secs),
        ),
    }
}
