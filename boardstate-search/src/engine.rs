//! What every search engine shares: the trait, its budget and its report.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use boardstate_core::{Game, MoveRecord};

use crate::adapter::SearchBoard;
use crate::error::SearchError;

/// When a search has to stop.
#[derive(Clone, Debug)]
pub struct Budget {
    running: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Budget {
    pub fn new(running: Arc<AtomicBool>, time_limit: Option<Duration>) -> Self {
        Self {
            running,
            deadline: time_limit.map(|limit| Instant::now() + limit),
        }
    }

    /// No deadline, own flag.
    pub fn unlimited() -> Self {
        Self::new(Arc::new(AtomicBool::new(true)), None)
    }

    /// Shared flag; clearing it stops the search.
    pub fn running(&self) -> &Arc<AtomicBool> {
        &self.running
    }

    pub fn cancel(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        !self.running.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn expired(&self) -> bool {
        self.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Result of one search.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchReport {
    pub best_move: MoveRecord,
    /// False when nothing was evaluated and `best_move` is the fallback.
    pub evaluated: bool,
    /// Alpha-beta score, from the searching player's view.
    pub score: Option<i32>,
    /// Completed iteration depth (alpha-beta) or tree depth (UCT).
    pub depth: u32,
    /// Positions visited (alpha-beta) or playouts run (UCT).
    pub nodes: u64,
    pub elapsed: Duration,
}

impl SearchReport {
    pub fn fallback<G: Game>(board: &SearchBoard<G>, elapsed: Duration) -> Self {
        Self {
            best_move: board.fallback_move(),
            evaluated: false,
            score: None,
            depth: 0,
            nodes: 0,
            elapsed,
        }
    }
}

/// A move chooser over a search board.
///
/// Engines must leave `board` as they found it, on success and on
/// cancellation.
pub trait Engine<G: Game>: Send {
    fn name(&self) -> &'static str;

    fn search(&mut self, board: &mut SearchBoard<G>, budget: &Budget)
        -> Result<SearchReport, SearchError>;
}

impl<G: Game> Engine<G> for Box<dyn Engine<G>> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn search(
        &mut self,
        board: &mut SearchBoard<G>,
        budget: &Budget,
    ) -> Result<SearchReport, SearchError> {
        (**self).search(board, budget)
    }
}
