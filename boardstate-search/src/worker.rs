//! Searches on a dedicated thread.
//!
//! The live machine is cloned on the caller's thread; only the clone moves
//! into the worker, so the caller's machine is never shared.

use std::any::Any;
use std::thread::{self, JoinHandle};

use boardstate_core::{Game, StateMachine};
use tracing::{debug, error};

use crate::adapter::SearchBoard;
use crate::engine::{Budget, Engine, SearchReport};
use crate::error::SearchError;

/// A running search.
pub struct SearchHandle {
    budget: Budget,
    thread: JoinHandle<Result<SearchReport, SearchError>>,
}

impl SearchHandle {
    /// Ask the worker to stop at its next node boundary.
    pub fn cancel(&self) {
        self.budget.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the result. A panic in the worker comes back as
    /// [`SearchError::WorkerPanicked`].
    pub fn join(self) -> Result<SearchReport, SearchError> {
        match self.thread.join() {
            Ok(Ok(report)) => {
                debug!(best = %report.best_move, nodes = report.nodes, "search joined");
                Ok(report)
            }
            Ok(Err(err)) => {
                error!(%err, "search failed");
                Err(err)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(%message, "search worker panicked");
                Err(SearchError::WorkerPanicked(message))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Clone `live` and search the clone on a new thread.
pub fn spawn_search<G, E>(
    live: &StateMachine<G>,
    mut engine: E,
    budget: Budget,
) -> Result<SearchHandle, SearchError>
where
    G: Game,
    E: Engine<G> + 'static,
{
    let mut board = SearchBoard::from_live(live)?;
    let worker_budget = budget.clone();
    let thread = thread::Builder::new()
        .name(format!("search-{}", engine.name()))
        .spawn(move || {
            let report = engine.search(&mut board, &worker_budget)?;
            board.verify_unwound()?;
            Ok(report)
        })?;
    Ok(SearchHandle { budget, thread })
}
