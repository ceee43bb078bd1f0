//! Iterative negamax with alpha-beta pruning.
//!
//! The walk keeps an explicit frame stack instead of recursing, so a
//! cancelled search can unwind the board from any depth.
//!
//! Scores are from the view of the player to move at each frame. A child
//! whose player to move differs from its parent's is negated on the way up;
//! a child where the same player moves again (a draw waiting for
//! confirmation, say) keeps its sign.
//!
//! The transposition table is keyed by digest, which carries neither the
//! distance from the root nor repetition counts. Forced results are stored
//! relative to their node, and positions that already occurred before are
//! neither looked up nor stored.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::time::Instant;

use boardstate_core::{Game, MoveRecord, Player};
use tracing::{debug, instrument};

use crate::adapter::SearchBoard;
use crate::config::AlphaBetaConfig;
use crate::engine::{Budget, Engine, SearchReport};
use crate::error::SearchError;
use crate::evaluate::{score_from_table, score_to_table, terminal_score, Evaluator, WIN_THRESHOLD};
use crate::stats::SearchStats;

/// Larger than any score, and safe to negate.
const INF: i32 = i32::MAX - 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bound {
    Exact,
    /// Failed high: the true score is at least this.
    Lower,
    /// Failed low: the true score is at most this.
    Upper,
}

#[derive(Clone, Debug)]
struct TableEntry {
    depth: u32,
    score: i32,
    bound: Bound,
    best: Option<MoveRecord>,
}

/// Stack frame for the iterative walk.
struct Frame {
    digest: u64,
    player: Player,
    /// Distance from the search root
    ply: usize,
    /// False for repeated positions, which stay out of the table.
    cacheable: bool,
    moves: Vec<MoveRecord>,
    /// Index of the next move to try
    next: usize,
    /// Remaining depth
    depth: u32,
    alpha: i32,
    beta: i32,
    alpha_orig: i32,
    best_score: i32,
    best_move: Option<usize>,
}

impl Frame {
    /// Fold in the score of the move just tried, from this frame's view.
    #[inline]
    fn update(&mut self, score: i32) {
        if score > self.best_score {
            self.best_score = score;
            self.best_move = Some(self.next - 1);
        }
        self.alpha = self.alpha.max(score);
    }

    #[inline]
    fn cut_off(&self) -> bool {
        self.alpha >= self.beta
    }

    fn best(&self) -> Option<(MoveRecord, i32)> {
        self.best_move
            .map(|i| (self.moves[i].clone(), self.best_score))
    }
}

enum Iteration {
    Complete(MoveRecord, i32),
    /// Budget ran out; best root move so far, if any child finished.
    Stopped(Option<(MoveRecord, i32)>),
}

/// Depth-limited adversarial search with a transposition table.
pub struct AlphaBeta<G: Game, E: Evaluator<G>> {
    config: AlphaBetaConfig,
    log_interval_secs: u64,
    evaluator: E,
    table: HashMap<u64, TableEntry>,
    pub stats: SearchStats,
    _game: PhantomData<fn() -> G>,
}

impl<G: Game, E: Evaluator<G>> AlphaBeta<G, E> {
    pub fn new(config: AlphaBetaConfig, evaluator: E) -> Self {
        Self {
            config,
            log_interval_secs: 0,
            evaluator,
            table: HashMap::new(),
            stats: SearchStats::new(),
            _game: PhantomData,
        }
    }

    pub fn with_log_interval(mut self, secs: u64) -> Self {
        self.log_interval_secs = secs;
        self
    }

    /// Distinct positions in the transposition table.
    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    /// Legal moves with the table's best move first.
    fn ordered_moves(&self, board: &SearchBoard<G>, digest: u64) -> Vec<MoveRecord> {
        let mut moves = board.list_moves();
        let hint = self.table.get(&digest).and_then(|e| e.best.as_ref());
        if let Some(pos) = hint.and_then(|best| moves.iter().position(|m| m == best)) {
            moves[..=pos].rotate_right(1);
        }
        moves
    }

    fn open_frame(
        &self,
        board: &SearchBoard<G>,
        moves: Vec<MoveRecord>,
        digest: u64,
        depth: u32,
        alpha: i32,
        beta: i32,
    ) -> Frame {
        Frame {
            digest,
            player: board.player(),
            ply: board.ply(),
            cacheable: !board.repeated(),
            moves,
            next: 0,
            depth,
            alpha,
            beta,
            alpha_orig: alpha,
            best_score: -INF,
            best_move: None,
        }
    }

    /// Score without expanding: finished games, usable table entries and
    /// the horizon.
    fn leaf(
        &mut self,
        board: &SearchBoard<G>,
        digest: u64,
        remaining: u32,
        alpha: i32,
        beta: i32,
    ) -> Option<i32> {
        if board.is_terminal() {
            self.stats.terminal_positions += 1;
            return Some(terminal_score(board.outcome(), board.player(), board.ply()));
        }
        let entry = self.table.get(&digest).filter(|_| !board.repeated());
        if let Some(entry) = entry {
            let score = score_from_table(entry.score, board.ply());
            let usable = entry.depth >= remaining
                && match entry.bound {
                    Bound::Exact => true,
                    Bound::Lower => score >= beta,
                    Bound::Upper => score <= alpha,
                };
            if usable {
                self.stats.cache_hits += 1;
                return Some(score);
            }
        }
        if remaining == 0 {
            return Some(self.evaluator.evaluate(board.machine(), board.player()));
        }
        None
    }

    fn store(&mut self, frame: &Frame) {
        let Some(best) = frame.best_move.filter(|_| frame.cacheable) else {
            return;
        };
        let bound = if frame.best_score <= frame.alpha_orig {
            Bound::Upper
        } else if frame.best_score >= frame.beta {
            Bound::Lower
        } else {
            Bound::Exact
        };
        if self.table.len() >= self.config.table_capacity {
            debug!(entries = self.table.len(), "transposition table full, clearing");
            self.table.clear();
        }
        self.table.insert(
            frame.digest,
            TableEntry {
                depth: frame.depth,
                score: score_to_table(frame.best_score, frame.ply),
                bound,
                best: Some(frame.moves[best].clone()),
            },
        );
    }

    /// One fixed-depth pass from the root. Leaves the board unwound.
    fn search_depth(
        &mut self,
        board: &mut SearchBoard<G>,
        budget: &Budget,
        depth: u32,
    ) -> Result<Iteration, SearchError> {
        let base = board.ply();
        let digest = board.digest();
        let moves = self.ordered_moves(board, digest);
        let mut stack = Vec::with_capacity(depth as usize + 1);
        stack.push(self.open_frame(board, moves, digest, depth, -INF, INF));

        loop {
            if budget.expired() {
                let partial = stack.first().and_then(Frame::best);
                board.unwind_to(base)?;
                return Ok(Iteration::Stopped(partial));
            }
            if self.stats.should_log(self.log_interval_secs) {
                self.stats.log_progress("alpha-beta", self.table.len());
            }

            let Some(frame) = stack.last_mut() else {
                return Ok(Iteration::Stopped(None));
            };

            if frame.cut_off() || frame.next >= frame.moves.len() {
                self.stats.branches_pruned += (frame.moves.len() - frame.next) as u64;
                let Some(done) = stack.pop() else {
                    continue;
                };
                self.store(&done);
                let Some(parent) = stack.last_mut() else {
                    return Ok(match done.best() {
                        Some((mv, score)) => Iteration::Complete(mv, score),
                        None => Iteration::Stopped(None),
                    });
                };
                board.unmake_move()?;
                let score = if done.player == parent.player {
                    done.best_score
                } else {
                    -done.best_score
                };
                parent.update(score);
                continue;
            }

            let mv = frame.moves[frame.next].clone();
            frame.next += 1;
            let parent_player = frame.player;
            let (alpha, beta) = (frame.alpha, frame.beta);
            let remaining = frame.depth - 1;

            board.make_move(&mv)?;
            self.stats.nodes += 1;
            self.stats.reach(board.ply() - base);

            let same = board.player() == parent_player;
            let (child_alpha, child_beta) = if same { (alpha, beta) } else { (-beta, -alpha) };
            let child_digest = board.digest();

            let mut score = self.leaf(board, child_digest, remaining, child_alpha, child_beta);
            if score.is_none() {
                let moves = self.ordered_moves(board, child_digest);
                if moves.is_empty() {
                    score = Some(self.evaluator.evaluate(board.machine(), board.player()));
                } else {
                    let child = self.open_frame(board, moves, child_digest, remaining, child_alpha, child_beta);
                    stack.push(child);
                }
            }

            if let Some(score) = score {
                board.unmake_move()?;
                if let Some(frame) = stack.last_mut() {
                    frame.update(if same { score } else { -score });
                }
            }
        }
    }
}

impl<G: Game, E: Evaluator<G>> Engine<G> for AlphaBeta<G, E> {
    fn name(&self) -> &'static str {
        "alpha-beta"
    }

    #[instrument(level = "debug", skip_all, fields(max_depth = self.config.max_depth))]
    fn search(
        &mut self,
        board: &mut SearchBoard<G>,
        budget: &Budget,
    ) -> Result<SearchReport, SearchError> {
        let started = Instant::now();
        self.stats = SearchStats::new();
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

        let base = board.ply();
        let mut best: Option<(MoveRecord, i32, u32)> = None;
        let mut partial = None;
        for depth in 1..=self.config.max_depth.max(1) {
            let iteration = match self.search_depth(board, budget, depth) {
                Ok(iteration) => iteration,
                Err(err) => {
                    board.unwind_to(base)?;
                    return Err(err);
                }
            };
            match iteration {
                Iteration::Complete(mv, score) => {
                    debug!(depth, score, %mv, nodes = self.stats.nodes, "iteration complete");
                    best = Some((mv, score, depth));
                    if score.abs() >= WIN_THRESHOLD {
                        break;
                    }
                }
                Iteration::Stopped(found) => {
                    partial = found;
                    break;
                }
            }
        }
        board.unwind_to(base)?;
        self.stats.log_summary("alpha-beta");

        let elapsed = started.elapsed();
        let report = match (best, partial) {
            (Some((mv, score, depth)), _) => SearchReport {
                best_move: mv,
                evaluated: true,
                score: Some(score),
                depth,
                nodes: self.stats.nodes,
                elapsed,
            },
            (None, Some((mv, score))) => SearchReport {
                best_move: mv,
                evaluated: true,
                score: Some(score),
                depth: 0,
                nodes: self.stats.nodes,
                elapsed,
            },
            (None, None) => SearchReport {
                nodes: self.stats.nodes,
                ..SearchReport::fallback(board, elapsed)
            },
        };
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::{TerminalEvaluator, WIN};
    use boardstate_core::{Loc, StateMachine, TicTacToe};

    fn position(cells: &[(u8, u8)]) -> StateMachine<TicTacToe> {
        let mut machine = StateMachine::new(TicTacToe::new()).unwrap();
        for &(col, row) in cells {
            let player = machine.player();
            let mv = MoveRecord::pool_to_board(player, TicTacToe::pool(player), Loc::board(col, row));
            machine.execute_with_confirm(&mv).unwrap();
        }
        machine
    }

    fn engine(max_depth: u32) -> AlphaBeta<TicTacToe, TerminalEvaluator> {
        AlphaBeta::new(
            AlphaBetaConfig {
                max_depth,
                ..AlphaBetaConfig::default()
            },
            TerminalEvaluator,
        )
    }

    fn placement(player: Player, col: u8, row: u8) -> MoveRecord {
        MoveRecord::pool_to_board(player, TicTacToe::pool(player), Loc::board(col, row))
    }

    #[test]
    fn test_takes_immediate_win() {
        // X: a1 b1, O: a2 b2
        let live = position(&[(0, 0), (0, 1), (1, 0), (1, 1)]);
        let mut board = SearchBoard::from_live(&live).unwrap();
        let report = engine(4).search(&mut board, &Budget::unlimited()).unwrap();

        assert_eq!(report.best_move, placement(Player::One, 2, 0));
        assert_eq!(report.score, Some(WIN - 1));
        board.verify_unwound().unwrap();
    }

    #[test]
    fn test_blocks_immediate_loss() {
        // X: a1 c3, O: b2 b1; O threatens b3
        let live = position(&[(0, 0), (1, 1), (2, 2), (1, 0)]);
        let mut board = SearchBoard::from_live(&live).unwrap();
        let report = engine(3).search(&mut board, &Budget::unlimited()).unwrap();

        assert_eq!(report.best_move, placement(Player::One, 1, 2));
        assert!(report.score.is_some_and(|s| s > -WIN_THRESHOLD));
        board.verify_unwound().unwrap();
    }

    #[test]
    fn test_empty_board_is_draw() {
        let live = StateMachine::new(TicTacToe::new()).unwrap();
        let mut board = SearchBoard::from_live(&live).unwrap();
        let mut ab = engine(9);
        let report = ab.search(&mut board, &Budget::unlimited()).unwrap();

        assert_eq!(report.score, Some(0));
        assert_eq!(report.depth, 9);
        assert!(ab.table_len() > 0);
        assert!(live.legal_moves().contains(&report.best_move));
        board.verify_unwound().unwrap();
    }

    #[test]
    fn test_cancelled_search_falls_back() {
        let live = StateMachine::new(TicTacToe::new()).unwrap();
        let mut board = SearchBoard::from_live(&live).unwrap();
        let budget = Budget::unlimited();
        budget.cancel();

        let report = engine(9).search(&mut board, &budget).unwrap();
        assert!(!report.evaluated);
        assert_eq!(report.best_move, MoveRecord::resign(Player::One));
        board.verify_unwound().unwrap();
    }

    #[test]
    fn test_confirmation_is_forced() {
        let mut live = StateMachine::new(TicTacToe::new()).unwrap();
        live.execute(&placement(Player::One, 1, 1)).unwrap();
        let mut board = SearchBoard::from_live(&live).unwrap();

        let report = engine(5).search(&mut board, &Budget::unlimited()).unwrap();
        assert_eq!(report.best_move, MoveRecord::done(Player::One));
    }

    #[test]
    fn test_repeated_position_stays_out_of_table() {
        use boardstate_core::games::Size;
        use boardstate_core::Gobblers;

        let mut live = StateMachine::new(Gobblers::new()).unwrap();
        live.execute(&MoveRecord::edit(Player::One)).unwrap();
        for (cell, player) in [(0, Player::One), (8, Player::Two)] {
            let from = Gobblers::reserve(player, Size::Large);
            live.execute(&MoveRecord::pool_to_board(player, from, Gobblers::cell(cell)))
                .unwrap();
        }
        live.execute(&MoveRecord::start(Player::One)).unwrap();

        // Shuffle both large pieces out and back, then out once more.
        let slide = |player, from, to| {
            MoveRecord::board_to_board(player, Gobblers::cell(from), Gobblers::cell(to))
        };
        for mv in [
            slide(Player::One, 0, 1),
            slide(Player::Two, 8, 7),
            slide(Player::One, 1, 0),
            slide(Player::Two, 7, 8),
            slide(Player::One, 0, 1),
        ] {
            live.execute_with_confirm(&mv).unwrap();
        }

        let mut board = SearchBoard::from_live(&live).unwrap();
        assert!(board.repeated());
        let mut ab: AlphaBeta<Gobblers, _> = AlphaBeta::new(
            AlphaBetaConfig {
                max_depth: 2,
                ..AlphaBetaConfig::default()
            },
            TerminalEvaluator,
        );
        let report = ab.search(&mut board, &Budget::unlimited()).unwrap();

        assert!(live.legal_moves().contains(&report.best_move));
        assert!(ab.table_len() > 0);
        assert!(!ab.table.contains_key(&board.digest()));
        board.verify_unwound().unwrap();
    }
}
