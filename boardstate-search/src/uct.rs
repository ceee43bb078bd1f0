//! Monte-Carlo tree search with UCB1 selection.
//!
//! ```text
//! select    walk fully expanded nodes by UCB1, making each move
//! expand    make one untried move, add its node
//! playout   random_move until the game ends or playout_depth moves
//! backprop  add the reward for each node's mover up to the root
//! unwind    unmake everything back to the root
//! ```
//!
//! Nodes live in one arena indexed by `usize`; a node's reward is counted
//! for the player who made the move leading to it.

use std::marker::PhantomData;
use std::time::Instant;

use boardstate_core::{Game, MoveRecord, Outcome, Player};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument};

use crate::adapter::SearchBoard;
use crate::config::UctConfig;
use crate::engine::{Budget, Engine, SearchReport};
use crate::error::SearchError;
use crate::stats::SearchStats;

#[derive(Clone, Debug)]
struct Node {
    mv: Option<MoveRecord>,
    parent: Option<usize>,
    children: Vec<usize>,
    untried: Vec<MoveRecord>,
    mover: Option<Player>,
    visits: u32,
    reward: f64,
    terminal: bool,
}

impl Node {
    fn root(untried: Vec<MoveRecord>) -> Self {
        Self {
            mv: None,
            parent: None,
            children: Vec::new(),
            untried,
            mover: None,
            visits: 0,
            reward: 0.0,
            terminal: false,
        }
    }
}

/// Reward of a finished (or truncated) playout for `mover`.
fn reward(outcome: Option<Outcome>, mover: Option<Player>) -> f64 {
    match (outcome, mover) {
        (Some(Outcome::Winner(winner)), Some(mover)) if winner == mover => 1.0,
        (Some(Outcome::Winner(_)), Some(_)) => 0.0,
        _ => 0.5,
    }
}

pub struct Uct<G: Game> {
    config: UctConfig,
    log_interval_secs: u64,
    rng: StdRng,
    nodes: Vec<Node>,
    pub stats: SearchStats,
    _game: PhantomData<fn() -> G>,
}

impl<G: Game> Uct<G> {
    pub fn new(config: UctConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config,
            log_interval_secs: 0,
            rng,
            nodes: Vec::new(),
            stats: SearchStats::new(),
            _game: PhantomData,
        }
    }

    pub fn with_log_interval(mut self, secs: u64) -> Self {
        self.log_interval_secs = secs;
        self
    }

    /// Nodes in the tree of the last search.
    pub fn tree_size(&self) -> usize {
        self.nodes.len()
    }

    fn ucb(&self, child: usize, ln_parent: f64) -> f64 {
        let node = &self.nodes[child];
        if node.visits == 0 {
            return f64::INFINITY;
        }
        let n = node.visits as f64;
        node.reward / n + self.config.exploration * (ln_parent / n).sqrt()
    }

    fn select_child(&self, parent: usize) -> Option<usize> {
        let node = &self.nodes[parent];
        let ln_parent = (node.visits.max(1) as f64).ln();
        node.children
            .iter()
            .copied()
            .max_by(|&a, &b| self.ucb(a, ln_parent).total_cmp(&self.ucb(b, ln_parent)))
    }

    /// One select/expand/playout/backprop cycle. Leaves the board at `base`.
    fn playout(&mut self, board: &mut SearchBoard<G>, base: usize) -> Result<(), SearchError> {
        let mut node = 0;
        loop {
            let current = &self.nodes[node];
            if current.terminal || !current.untried.is_empty() {
                break;
            }
            let Some(child) = self.select_child(node) else {
                break;
            };
            if let Some(mv) = self.nodes[child].mv.clone() {
                board.make_move(&mv)?;
            }
            node = child;
        }

        if !self.nodes[node].untried.is_empty() && self.nodes.len() < self.config.max_nodes {
            let untried = &mut self.nodes[node].untried;
            let mv = untried.swap_remove(self.rng.random_range(0..untried.len()));
            let mover = board.player();
            board.make_move(&mv)?;
            let terminal = board.is_terminal();
            let child = self.nodes.len();
            self.nodes.push(Node {
                mv: Some(mv),
                parent: Some(node),
                children: Vec::new(),
                untried: if terminal { Vec::new() } else { board.list_moves() },
                mover: Some(mover),
                visits: 0,
                reward: 0.0,
                terminal,
            });
            self.nodes[node].children.push(child);
            node = child;
        }
        self.stats.reach(board.ply() - base);

        let mut steps = 0;
        while !board.is_terminal() && steps < self.config.playout_depth {
            let Some(mv) = board.random_move(&mut self.rng) else {
                break;
            };
            board.make_move(&mv)?;
            steps += 1;
        }
        let outcome = if board.is_terminal() {
            self.stats.terminal_positions += 1;
            board.outcome()
        } else {
            None
        };
        board.unwind_to(base)?;
        self.stats.nodes += 1;

        let mut cursor = Some(node);
        while let Some(i) = cursor {
            let n = &mut self.nodes[i];
            n.visits += 1;
            n.reward += reward(outcome, n.mover);
            cursor = n.parent;
        }
        Ok(())
    }

    fn best_child(&self) -> Option<&Node> {
        let root = self.nodes.first()?;
        let mut best: Option<&Node> = None;
        for &child in &root.children {
            let node = &self.nodes[child];
            if best.map_or(true, |b| node.visits > b.visits) {
                best = Some(node);
            }
        }
        best
    }
}

impl<G: Game> Engine<G> for Uct<G> {
    fn name(&self) -> &'static str {
        "uct"
    }

    #[instrument(level = "debug", skip_all, fields(playouts = self.config.max_playouts))]
    fn search(
        &mut self,
        board: &mut SearchBoard<G>,
        budget: &Budget,
    ) -> Result<SearchReport, SearchError> {
        let started = Instant::now();
        self.stats = SearchStats::new();
        self.nodes.clear();
        if board.is_terminal() {
            return Ok(SearchReport::fallback(board, started.elapsed()));
        }
        let root_moves = board.list_moves();
        match root_moves.as_slice() {
            [] => return Ok(SearchReport::fallback(board, started.elapsed())),
            [only] => {
                return Ok(SearchReport {
                    best_move: only.clone(),
                    evaluated: true,
                    score: None,
                    depth: 0,
                    nodes: 0,
                    elapsed: started.elapsed(),
                })
            }
            _ => {}
        }
        self.nodes.push(Node::root(root_moves));

        let base = board.ply();
        while self.stats.nodes < self.config.max_playouts && !budget.expired() {
            if let Err(err) = self.playout(board, base) {
                board.unwind_to(base)?;
                return Err(err);
            }
            if self.stats.should_log(self.log_interval_secs) {
                self.stats.log_progress("uct", self.nodes.len());
            }
        }
        self.stats.log_summary("uct");

        let elapsed = started.elapsed();
        let Some(best) = self.best_child() else {
            return Ok(SearchReport::fallback(board, elapsed));
        };
        let Some(best_move) = best.mv.clone() else {
            return Ok(SearchReport::fallback(board, elapsed));
        };
        debug!(
            %best_move,
            visits = best.visits,
            win_rate = best.reward / best.visits.max(1) as f64,
            tree = self.nodes.len(),
            "best root child"
        );
        Ok(SearchReport {
            best_move,
            evaluated: true,
            score: None,
            depth: self.stats.max_depth as u32,
            nodes: self.stats.nodes,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardstate_core::{Gobblers, Loc, StateMachine, TicTacToe};

    fn config(max_playouts: u64) -> UctConfig {
        UctConfig {
            max_playouts,
            ..UctConfig::default()
        }
    }

    #[test]
    fn test_reward() {
        let win = Some(Outcome::Winner(Player::One));
        assert_eq!(reward(win, Some(Player::One)), 1.0);
        assert_eq!(reward(win, Some(Player::Two)), 0.0);
        assert_eq!(reward(Some(Outcome::Draw), Some(Player::Two)), 0.5);
        assert_eq!(reward(None, None), 0.5);
    }

    #[test]
    fn test_takes_immediate_win() {
        let mut live = StateMachine::new(TicTacToe::new()).unwrap();
        for (col, row) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            let player = live.player();
            let mv = MoveRecord::pool_to_board(player, TicTacToe::pool(player), Loc::board(col, row));
            live.execute_with_confirm(&mv).unwrap();
        }
        let mut board = SearchBoard::from_live(&live).unwrap();
        let mut uct = Uct::new(config(3_000), Some(1));
        let report = uct.search(&mut board, &Budget::unlimited()).unwrap();

        assert_eq!(
            report.best_move,
            MoveRecord::pool_to_board(Player::One, TicTacToe::pool(Player::One), Loc::board(2, 0))
        );
        assert_eq!(report.nodes, 3_000);
        board.verify_unwound().unwrap();
    }

    #[test]
    fn test_gobblers_move_is_legal() {
        let live = StateMachine::new(Gobblers::new()).unwrap();
        let mut board = SearchBoard::from_live(&live).unwrap();
        let mut uct = Uct::new(config(500), Some(2));
        let report = uct.search(&mut board, &Budget::unlimited()).unwrap();

        assert!(report.evaluated);
        assert!(live.legal_moves().contains(&report.best_move));
        assert!(uct.tree_size() > 1);
        board.verify_unwound().unwrap();
        assert!(board.machine().sameboard(&live).is_ok());
    }

    #[test]
    fn test_node_limit_still_plays_out() {
        let live = StateMachine::new(TicTacToe::new()).unwrap();
        let mut board = SearchBoard::from_live(&live).unwrap();
        let mut uct = Uct::new(
            UctConfig {
                max_nodes: 4,
                ..config(200)
            },
            Some(3),
        );
        let report = uct.search(&mut board, &Budget::unlimited()).unwrap();
        assert_eq!(uct.tree_size(), 4);
        assert_eq!(report.nodes, 200);
        board.verify_unwound().unwrap();
    }
}
