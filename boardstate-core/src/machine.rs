//! The reversible state machine.
//!
//! All state changes go through logged primitives, so every
//! [`StateMachine::execute`] can be undone exactly by
//! [`StateMachine::unexecute`] (or by rewinding to a recorded
//! [`StateMachine::log_depth`]).
//!
//! # Gestures
//!
//! ```text
//! pick  X from a      floating = X@a
//! drop  X on b        landing b pushed, floating cleared
//! pick  from b        undrop: b's drop is reverted, floating = X@a again
//! drop  X on a        unpick: a's pick is reverted, floating cleared
//! done                commit: landings cleared, turn passes
//! ```
//!
//! Undrop and unpick are forward moves: they replay the inverse of the
//! original entries as new log entries, so hooks that touched counters or
//! captured pieces are reverted too.
//!
//! # Journals
//!
//! In [`Journal::Interactive`] mode a commit clears the log, so nothing can
//! be unexecuted across a confirmed move. Search clones use
//! [`Journal::Retained`] and keep commit markers instead.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use rand::Rng;
use tracing::{debug, error, instrument, trace};

use crate::cell::{CellGraph, Loc};
use crate::digest::{DigestStream, RepetitionTable, StateView, DIGEST_SEED};
use crate::error::{ConsistencyError, ContractViolation, Result};
use crate::moves::{MoveRecord, Op};
use crate::mutation::{Floating, Landing, Mutation, MutationLog};
use crate::phase::{Outcome, Phase, Step};
use crate::piece::{PieceCatalog, PieceId, Player};
use crate::rules::{Effects, Game, Position};

/// What a commit does to the mutation log.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Journal {
    /// Commit clears the log.
    Interactive,
    /// Commit leaves a marker; everything stays undoable.
    Retained,
}

/// One board instance: graph, phase, player, floating piece and log.
#[derive(Clone, Debug)]
pub struct StateMachine<G: Game> {
    game: G,
    catalog: Arc<PieceCatalog>,
    stream: DigestStream,
    graph: CellGraph,
    phase: Phase,
    player: Player,
    move_number: u32,
    floating: Option<Floating>,
    counters: Vec<i32>,
    landings: Vec<Landing>,
    outcome: Option<Outcome>,
    resign_from: Option<Phase>,
    repetitions: RepetitionTable,
    log: MutationLog,
    journal: Journal,
    committed: bool,
}

impl<G: Game> StateMachine<G> {
    /// Create an interactive machine at the game's starting position.
    pub fn new(game: G) -> Result<Self> {
        Self::with_journal(game, Journal::Interactive)
    }

    pub fn with_journal(game: G, journal: Journal) -> Result<Self> {
        let mut machine = StateMachine {
            catalog: Arc::clone(game.catalog()),
            stream: DigestStream::new(DIGEST_SEED),
            graph: game.build_graph(),
            phase: game.initial_phase(),
            player: game.first_player(),
            move_number: 1,
            floating: None,
            counters: vec![0; game.counters()],
            landings: Vec::new(),
            outcome: None,
            resign_from: None,
            repetitions: RepetitionTable::new(),
            log: MutationLog::new(),
            journal,
            committed: false,
            game,
        };
        machine.reset()?;
        Ok(machine)
    }

    /// Rebuild a game by executing a recorded history from the start.
    pub fn replay<'m>(game: G, moves: impl IntoIterator<Item = &'m MoveRecord>) -> Result<Self> {
        let mut machine = Self::new(game)?;
        for mv in moves {
            machine.execute(mv)?;
        }
        Ok(machine)
    }

    /// Back to the starting position. Stacks are cleared and repopulated;
    /// the graph itself is kept.
    #[instrument(level = "debug", skip(self), fields(game = %self.game.name()))]
    pub fn reset(&mut self) -> Result<()> {
        self.graph.clear();
        self.game.populate(&mut self.graph)?;
        self.counters.iter_mut().for_each(|c| *c = 0);
        self.phase = self.game.initial_phase();
        self.player = self.game.first_player();
        self.move_number = 1;
        self.floating = None;
        self.landings.clear();
        self.outcome = None;
        self.resign_from = None;
        self.repetitions.clear();
        self.log.clear();
        self.committed = false;
        debug!(digest = self.digest(), "reset");
        Ok(())
    }

    /// Deep copy for a search thread, verified against the original.
    #[instrument(level = "debug", skip(self), fields(game = %self.game.name()))]
    pub fn clone_for_search(&self) -> Result<Self, ConsistencyError> {
        let mut copy = self.clone();
        copy.journal = Journal::Retained;
        if let Err(err) = self.sameboard(&copy) {
            error!(%err, "clone differs from original");
            return Err(err);
        }
        Ok(copy)
    }

    // ========== Accessors ==========

    #[inline]
    pub fn game(&self) -> &G {
        &self.game
    }

    #[inline]
    pub fn catalog(&self) -> &Arc<PieceCatalog> {
        &self.catalog
    }

    #[inline]
    pub fn graph(&self) -> &CellGraph {
        &self.graph
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Player to move.
    #[inline]
    pub fn player(&self) -> Player {
        self.player
    }

    #[inline]
    pub fn move_number(&self) -> u32 {
        self.move_number
    }

    #[inline]
    pub fn floating(&self) -> Option<(PieceId, Loc)> {
        self.floating.as_ref().map(|f| (f.piece, f.source))
    }

    #[inline]
    pub fn counters(&self) -> &[i32] {
        &self.counters
    }

    #[inline]
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    #[inline]
    pub fn journal(&self) -> Journal {
        self.journal
    }

    /// Cells of uncommitted drops, oldest first.
    pub fn landings(&self) -> impl Iterator<Item = Loc> + '_ {
        self.landings.iter().map(|l| l.cell)
    }

    /// Current log length; pass to [`unexecute_to`](Self::unexecute_to).
    #[inline]
    pub fn log_depth(&self) -> usize {
        self.log.len()
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.phase.is_game_over()
    }

    /// Whether `Done` is legal now.
    #[inline]
    pub fn is_done_eligible(&self) -> bool {
        self.game.phase_traits(self.phase).done_eligible
    }

    /// Times `digest` has been committed in a repetition-tracking phase.
    pub fn repetitions(&self, digest: u64) -> u32 {
        self.repetitions.count(digest)
    }

    /// Read-only view for game policy.
    pub fn position(&self) -> Position<'_> {
        Position {
            graph: &self.graph,
            catalog: &self.catalog,
            phase: self.phase,
            traits: self.game.phase_traits(self.phase),
            player: self.player,
            floating: self.floating(),
            counters: &self.counters,
            last_landing: self.landings.last().map(|l| l.cell),
            move_number: self.move_number,
        }
    }

    // ========== Digest ==========

    pub fn view(&self) -> StateView<'_> {
        StateView {
            graph: &self.graph,
            floating: self.floating.as_ref(),
            counters: &self.counters,
            landings: &self.landings,
            phase: self.phase,
            player: self.player,
            outcome: self.outcome,
            resign_from: self.resign_from,
        }
    }

    #[inline]
    pub fn digest(&self) -> u64 {
        self.view().digest(&self.stream)
    }

    /// Field-by-field comparison, independent of the digest.
    pub fn same_state(&self, other: &StateMachine<G>) -> bool {
        self.view().same_state(&other.view())
    }

    /// Field comparison and digest comparison must agree.
    pub fn sameboard(&self, other: &StateMachine<G>) -> Result<(), ConsistencyError> {
        self.view().sameboard(&other.view(), &self.stream)
    }

    // ========== Move generation ==========

    pub fn legal_moves(&self) -> Vec<MoveRecord> {
        self.game.legal_moves(&self.position())
    }

    pub fn random_move<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<MoveRecord> {
        self.game.random_move(&self.position(), rng)
    }

    /// Would picking from `loc` be accepted (including an undrop)?
    pub fn can_pick(&self, loc: Loc) -> bool {
        let op = if loc.is_board() { Op::PickBoard } else { Op::Pick };
        if !self.game.permits(self.phase, op) || self.floating.is_some() {
            return false;
        }
        if self.landings.last().is_some_and(|l| l.cell == loc) {
            return true;
        }
        self.game.can_pick(&self.position(), loc)
    }

    /// Would dropping the floating piece on `loc` be accepted (including an
    /// unpick)?
    pub fn can_drop(&self, loc: Loc) -> bool {
        let op = if loc.is_board() { Op::DropBoard } else { Op::Drop };
        if !self.game.permits(self.phase, op) {
            return false;
        }
        match &self.floating {
            None => false,
            Some(f) if f.source == loc => true,
            Some(f) => self.game.can_drop(&self.position(), f.source, f.piece, loc),
        }
    }

    // ========== Execute / unexecute ==========

    /// Apply one move.
    ///
    /// On a contract violation nothing is changed: the partial call is
    /// rolled back before the error is returned.
    pub fn execute(&mut self, mv: &MoveRecord) -> Result<()> {
        let depth = self.log.len();
        self.committed = false;
        self.log.push(Mutation::Begin { op: mv.op });

        let result = self.apply(mv);
        let committed = std::mem::take(&mut self.committed);
        match result {
            Ok(()) => {
                trace!(%mv, phase = ?self.phase, "execute");
                if committed && self.journal == Journal::Interactive {
                    self.log.clear();
                }
                Ok(())
            }
            Err(err) => {
                if let Err(unwind) = self.rewind(depth) {
                    error!(%unwind, "rollback failed");
                }
                error!(%mv, phase = ?self.phase, %err, "contract violation");
                Err(err.into())
            }
        }
    }

    /// Execute `mv`, then confirm it if the machine is left waiting for
    /// `Done`. Returns the confirmation that was applied, if any.
    pub fn execute_with_confirm(&mut self, mv: &MoveRecord) -> Result<Option<MoveRecord>> {
        let depth = self.log.len();
        self.execute(mv)?;
        if mv.op == Op::Done || !self.is_done_eligible() {
            return Ok(None);
        }
        let done = MoveRecord::done(self.player);
        if let Err(err) = self.execute(&done) {
            if self.log.len() >= depth {
                self.rewind(depth)?;
            }
            return Err(err);
        }
        Ok(Some(done))
    }

    /// Undo the most recent execute, which must have been `mv`.
    pub fn unexecute(&mut self, mv: &MoveRecord) -> Result<(), ContractViolation> {
        let (begin, op) = self
            .log
            .last_begin()
            .ok_or(ContractViolation::UnmakeWithoutMake)?;
        if op != mv.op {
            return Err(ContractViolation::UnmakeMismatch {
                expected: op,
                found: mv.op,
            });
        }
        self.rewind(begin)?;
        trace!(%mv, "unexecute");
        Ok(())
    }

    /// Undo everything logged since `depth` was observed.
    pub fn unexecute_to(&mut self, depth: usize) -> Result<(), ContractViolation> {
        if depth > self.log.len() {
            return Err(ContractViolation::UnmakeWithoutMake);
        }
        self.rewind(depth)
    }

    fn rewind(&mut self, depth: usize) -> Result<(), ContractViolation> {
        while self.log.len() > depth {
            let Some(entry) = self.log.pop() else {
                break;
            };
            self.undo_entry(entry)?;
        }
        Ok(())
    }

    /// Apply the inverse of one popped entry without logging it.
    fn undo_entry(&mut self, entry: Mutation) -> Result<(), ContractViolation> {
        match entry {
            Mutation::Begin { .. } => {}
            Mutation::Push { cell, piece } => {
                let found = self.graph.pop(cell);
                if found != Some(piece) {
                    return Err(ContractViolation::PieceMismatch {
                        cell,
                        expected: piece,
                        found,
                    });
                }
            }
            Mutation::Pop { cell, piece } => self.graph.push(cell, piece),
            Mutation::Float { before } => self.floating = before,
            Mutation::Phase { before } => self.phase = before,
            Mutation::Player { before } => self.player = before,
            Mutation::MoveNumber { before } => self.move_number = before,
            Mutation::Counter { index, delta } => self.counters[index] -= delta,
            Mutation::Outcome { before } => self.outcome = before,
            Mutation::ResignFrom { before } => self.resign_from = before,
            Mutation::Repetition { digest } => self.repetitions.forget(digest),
            Mutation::Landed => {
                self.landings.pop();
            }
            Mutation::Unlanded { landing } => self.landings.push(landing),
            Mutation::Commit { landings } => self.landings = landings,
        }
        Ok(())
    }

    // ========== Dispatch ==========

    fn apply(&mut self, mv: &MoveRecord) -> Result<(), ContractViolation> {
        if !self.game.permits(self.phase, mv.op) {
            return Err(ContractViolation::IllegalInPhase {
                op: mv.op,
                phase: self.phase,
            });
        }
        let unattributed = matches!(mv.op, Op::Start | Op::Edit) || self.phase == Phase::Puzzle;
        if !unattributed && mv.player != self.player {
            return Err(ContractViolation::WrongPlayer {
                expected: self.player,
                found: mv.player,
            });
        }

        match mv.op {
            Op::Pick | Op::PickBoard => {
                let from = address(mv.op, mv.from, "from")?;
                check_kind(mv.op, from, mv.op == Op::PickBoard)?;
                self.gesture_pick(from)
            }
            Op::Drop | Op::DropBoard => {
                let to = address(mv.op, mv.to, "to")?;
                check_kind(mv.op, to, mv.op == Op::DropBoard)?;
                self.gesture_drop(to, &mv.captures)
            }
            Op::PoolToBoard | Op::BoardToBoard => self.composite(mv),
            Op::Done => self.do_done(),
            Op::Pass => self.do_pass(),
            Op::Resign => self.do_resign(),
            Op::Start => self.do_start(mv.player),
            Op::Edit => self.do_edit(),
        }
    }

    fn gesture_pick(&mut self, from: Loc) -> Result<(), ContractViolation> {
        self.graph.require(from)?;
        if self.floating.is_some() {
            return Err(ContractViolation::AlreadyFloating);
        }
        if self.landings.last().is_some_and(|l| l.cell == from) {
            self.undrop(from)?;
            return self.transition(Step::Undrop);
        }
        if !self.game.can_pick(&self.position(), from) {
            return Err(ContractViolation::IllegalPick(from));
        }
        self.pick_from(from)?;
        self.transition(Step::Pick)
    }

    fn gesture_drop(&mut self, to: Loc, captures: &[Loc]) -> Result<(), ContractViolation> {
        self.graph.require(to)?;
        let (piece, source) = match &self.floating {
            Some(f) => (f.piece, f.source),
            None => return Err(ContractViolation::NothingFloating),
        };
        if to == source {
            self.unpick()?;
            return self.transition(Step::Unpick);
        }
        if !self.game.can_drop(&self.position(), source, piece, to) {
            return Err(ContractViolation::IllegalDrop(to));
        }
        self.check_captures(to, piece, captures)?;
        self.drop_on(to, captures)?;
        self.transition(Step::Drop)?;
        if self.phase == Phase::Puzzle {
            self.commit()?;
        }
        Ok(())
    }

    fn composite(&mut self, mv: &MoveRecord) -> Result<(), ContractViolation> {
        let from = address(mv.op, mv.from, "from")?;
        let to = address(mv.op, mv.to, "to")?;
        check_kind(mv.op, from, mv.op == Op::BoardToBoard)?;
        check_kind(mv.op, to, true)?;
        self.graph.require(from)?;
        self.graph.require(to)?;
        if self.floating.is_some() {
            return Err(ContractViolation::AlreadyFloating);
        }

        if !self.game.can_pick(&self.position(), from) {
            return Err(ContractViolation::IllegalPick(from));
        }
        self.pick_from(from)?;
        self.transition(Step::Pick)?;

        let piece = self
            .floating
            .as_ref()
            .map(|f| f.piece)
            .ok_or(ContractViolation::NothingFloating)?;
        if !self.game.can_drop(&self.position(), from, piece, to) {
            return Err(ContractViolation::IllegalDrop(to));
        }
        self.check_captures(to, piece, &mv.captures)?;
        self.drop_on(to, &mv.captures)?;
        self.transition(Step::Drop)?;
        if self.phase == Phase::Puzzle {
            self.commit()?;
        }
        Ok(())
    }

    fn do_done(&mut self) -> Result<(), ContractViolation> {
        let before = self.phase;
        self.commit()?;
        let next = self
            .game
            .next_phase(before, Step::Done, &self.position())
            .ok_or(ContractViolation::NoTransition {
                phase: before,
                step: Step::Done,
            })?;

        if before == Phase::ResignPending {
            let winner = self.player.opponent();
            self.set_resign_from(None);
            self.set_outcome(Some(Outcome::Winner(winner)));
            self.set_phase(next);
            debug!(%winner, "resignation confirmed");
            return Ok(());
        }

        if next == Phase::GameOver {
            let outcome = self.game.outcome(&self.position()).unwrap_or(Outcome::Draw);
            self.set_outcome(Some(outcome));
            self.set_phase(next);
            debug!(%outcome, "game over");
            return Ok(());
        }

        self.set_player(self.player.opponent());
        self.set_move_number(self.move_number + 1);
        if let Some(outcome) = self.game.outcome(&self.position()) {
            self.set_outcome(Some(outcome));
            self.set_phase(Phase::GameOver);
            debug!(%outcome, moves = self.move_number, "game over");
            return Ok(());
        }

        self.set_phase(next);
        self.count_repetition();
        Ok(())
    }

    fn do_pass(&mut self) -> Result<(), ContractViolation> {
        if self.floating.is_some() {
            self.unpick()?;
        }
        self.transition(Step::Pass)
    }

    /// Resign, or take a pending resignation back.
    fn do_resign(&mut self) -> Result<(), ContractViolation> {
        if self.phase == Phase::ResignPending {
            let back = self.resign_from.ok_or(ContractViolation::NoTransition {
                phase: self.phase,
                step: Step::Resign,
            })?;
            self.set_resign_from(None);
            self.set_phase(back);
            return Ok(());
        }
        if self.floating.is_some() {
            self.unpick()?;
        }
        let before = self.phase;
        self.transition(Step::Resign)?;
        self.set_resign_from(Some(before));
        Ok(())
    }

    fn do_start(&mut self, player: Player) -> Result<(), ContractViolation> {
        self.commit()?;
        self.set_player(player);
        self.set_outcome(None);
        self.set_resign_from(None);
        let next = self
            .game
            .next_phase(self.phase, Step::Start, &self.position())
            .ok_or(ContractViolation::NoTransition {
                phase: self.phase,
                step: Step::Start,
            })?;
        match self.game.outcome(&self.position()) {
            Some(outcome) => {
                self.set_outcome(Some(outcome));
                self.set_phase(Phase::GameOver);
            }
            None => self.set_phase(next),
        }
        Ok(())
    }

    fn do_edit(&mut self) -> Result<(), ContractViolation> {
        self.commit()?;
        self.transition(Step::Edit)
    }

    /// Return any floating piece, clear the landings and mark the boundary.
    fn commit(&mut self) -> Result<(), ContractViolation> {
        if self.floating.is_some() {
            self.unpick()?;
        }
        let landings = std::mem::take(&mut self.landings);
        trace!(landings = landings.len(), "commit");
        self.log.push(Mutation::Commit { landings });
        self.committed = true;
        Ok(())
    }

    fn transition(&mut self, step: Step) -> Result<(), ContractViolation> {
        let next = self
            .game
            .next_phase(self.phase, step, &self.position())
            .ok_or(ContractViolation::NoTransition {
                phase: self.phase,
                step,
            })?;
        self.set_phase(next);
        Ok(())
    }

    fn count_repetition(&mut self) {
        let Some(limit) = self.game.repetition_limit() else {
            return;
        };
        if !self.game.phase_traits(self.phase).tracks_repetition {
            return;
        }
        let digest = self.digest();
        let count = self.repetitions.record(digest);
        self.log.push(Mutation::Repetition { digest });
        if count == limit {
            debug!(digest, count, "repetition limit reached");
            self.set_phase(Phase::DrawPending);
        }
    }

    // ========== Gestures ==========

    fn effects(&mut self) -> Effects<'_> {
        Effects::new(
            &mut self.graph,
            &mut self.counters,
            &mut self.log,
            &self.catalog,
            self.player,
        )
    }

    fn pick_from(&mut self, from: Loc) -> Result<(), ContractViolation> {
        let start = self.log.len();
        let piece = self.effects().remove_top(from)?;
        let mut fx = Effects::new(
            &mut self.graph,
            &mut self.counters,
            &mut self.log,
            &self.catalog,
            self.player,
        );
        self.game.after_pick(&mut fx, from, piece)?;
        let span = start..self.log.len();
        self.set_floating(Some(Floating {
            piece,
            source: from,
            span,
        }));
        Ok(())
    }

    fn check_captures(&self, to: Loc, piece: PieceId, captures: &[Loc]) -> Result<(), ContractViolation> {
        if self.game.can_capture(&self.position(), to, piece, captures) {
            return Ok(());
        }
        Err(ContractViolation::IllegalCapture(
            captures.first().copied().unwrap_or(to),
        ))
    }

    fn drop_on(&mut self, to: Loc, captures: &[Loc]) -> Result<(), ContractViolation> {
        let floating = self
            .floating
            .clone()
            .ok_or(ContractViolation::NothingFloating)?;
        let start = self.log.len();
        self.effects().push(to, floating.piece)?;
        let mut fx = Effects::new(
            &mut self.graph,
            &mut self.counters,
            &mut self.log,
            &self.catalog,
            self.player,
        );
        self.game.after_drop(&mut fx, to, floating.piece, captures)?;
        let span = start..self.log.len();
        self.set_floating(None);
        self.log.push(Mutation::Landed);
        self.landings.push(Landing {
            cell: to,
            span,
            floating,
        });
        Ok(())
    }

    fn unpick(&mut self) -> Result<(), ContractViolation> {
        let floating = self
            .floating
            .clone()
            .ok_or(ContractViolation::NothingFloating)?;
        self.revert(floating.span)?;
        self.set_floating(None);
        Ok(())
    }

    fn undrop(&mut self, from: Loc) -> Result<(), ContractViolation> {
        let landing = self
            .landings
            .pop()
            .ok_or(ContractViolation::IllegalPick(from))?;
        self.log.push(Mutation::Unlanded {
            landing: landing.clone(),
        });
        self.revert(landing.span)?;
        self.set_floating(Some(landing.floating));
        Ok(())
    }

    /// Replay the inverses of a logged span as new logged mutations.
    fn revert(&mut self, span: Range<usize>) -> Result<(), ContractViolation> {
        for entry in self.log.span(span).into_iter().rev() {
            match entry {
                Mutation::Push { cell, piece } => {
                    let found = self.effects().pop_at(cell);
                    if found != Some(piece) {
                        return Err(ContractViolation::PieceMismatch {
                            cell,
                            expected: piece,
                            found,
                        });
                    }
                }
                Mutation::Pop { cell, piece } => self.effects().push_at(cell, piece),
                Mutation::Counter { index, delta } => self.effects().add_counter(index, -delta),
                _ => {}
            }
        }
        Ok(())
    }

    // ========== Logged setters ==========

    fn set_floating(&mut self, floating: Option<Floating>) {
        let before = std::mem::replace(&mut self.floating, floating);
        self.log.push(Mutation::Float { before });
    }

    fn set_phase(&mut self, phase: Phase) {
        if phase != self.phase {
            self.log.push(Mutation::Phase { before: self.phase });
            self.phase = phase;
        }
    }

    fn set_player(&mut self, player: Player) {
        if player != self.player {
            self.log.push(Mutation::Player {
                before: self.player,
            });
            self.player = player;
        }
    }

    fn set_move_number(&mut self, move_number: u32) {
        self.log.push(Mutation::MoveNumber {
            before: self.move_number,
        });
        self.move_number = move_number;
    }

    fn set_outcome(&mut self, outcome: Option<Outcome>) {
        if outcome != self.outcome {
            self.log.push(Mutation::Outcome {
                before: self.outcome,
            });
            self.outcome = outcome;
        }
    }

    fn set_resign_from(&mut self, phase: Option<Phase>) {
        if phase != self.resign_from {
            self.log.push(Mutation::ResignFrom {
                before: self.resign_from,
            });
            self.resign_from = phase;
        }
    }
}

fn address(op: Op, loc: Option<Loc>, field: &'static str) -> Result<Loc, ContractViolation> {
    loc.ok_or(ContractViolation::MissingAddress { op, field })
}

fn check_kind(op: Op, loc: Loc, board: bool) -> Result<(), ContractViolation> {
    if loc.is_board() == board {
        Ok(())
    } else {
        Err(ContractViolation::WrongCellKind { op, loc })
    }
}

impl<G: Game> fmt::Display for StateMachine<G> {
    /// Top pieces, highest row first, then the machine state.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (0..self.graph.rows()).rev() {
            for col in 0..self.graph.cols() {
                let glyph = self
                    .graph
                    .top(Loc::board(col, row))
                    .map_or('.', |p| self.catalog.glyph(p));
                write!(f, "{}", glyph)?;
            }
            writeln!(f)?;
        }
        write!(f, "{} to move, {:?}", self.player, self.phase)?;
        if let Some(outcome) = self.outcome {
            write!(f, ", {}", outcome)?;
        }
        Ok(())
    }
}
