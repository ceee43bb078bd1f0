//! The per-game policy plugged into the generic machine.
//!
//! A game supplies its cell graph, a piece catalog, the legality predicates
//! and a move generator. The machine calls the same [`Game::can_pick`] and
//! [`Game::can_drop`] predicates to validate every gesture that the
//! generator uses to enumerate moves, so search and UI agree on legality.

use std::fmt::Debug;
use std::sync::Arc;

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::cell::{CellGraph, Loc};
use crate::error::ContractViolation;
use crate::moves::{MoveRecord, Op};
use crate::mutation::{Mutation, MutationLog};
use crate::phase::{standard_permits, standard_transition, Outcome, Phase, PhaseTraits, Step};
use crate::piece::{PieceCatalog, PieceId, Player};

/// Read-only view of the machine handed to game policy.
#[derive(Clone, Copy, Debug)]
pub struct Position<'a> {
    pub graph: &'a CellGraph,
    pub catalog: &'a PieceCatalog,
    pub phase: Phase,
    pub traits: PhaseTraits,
    pub player: Player,
    /// Floating piece and where it came from.
    pub floating: Option<(PieceId, Loc)>,
    pub counters: &'a [i32],
    /// Cell of the most recent uncommitted drop.
    pub last_landing: Option<Loc>,
    pub move_number: u32,
}

impl Position<'_> {
    #[inline]
    pub fn top(&self, loc: Loc) -> Option<PieceId> {
        self.graph.top(loc)
    }

    /// Top of `loc` as it would look with the top of `lifted` removed.
    #[inline]
    pub fn top_after_lift(&self, loc: Loc, lifted: Option<Loc>) -> Option<PieceId> {
        let cell = self.graph.get(loc)?;
        if lifted == Some(loc) && !cell.is_infinite() {
            cell.peek(1)
        } else {
            cell.top()
        }
    }

    #[inline]
    pub fn owner(&self, piece: PieceId) -> Option<Player> {
        self.catalog.owner(piece)
    }

    #[inline]
    pub fn counter(&self, index: usize) -> i32 {
        self.counters.get(index).copied().unwrap_or(0)
    }
}

/// `[Done]` when the phase is waiting for confirmation.
pub fn confirmation_moves(pos: &Position<'_>) -> Option<Vec<MoveRecord>> {
    pos.traits
        .done_eligible
        .then(|| vec![MoveRecord::done(pos.player)])
}

/// Logged side effects available to game hooks.
///
/// Everything done through here is recorded in the mutation log and undone
/// exactly by `unexecute`, undrop and unpick.
pub struct Effects<'a> {
    graph: &'a mut CellGraph,
    counters: &'a mut [i32],
    log: &'a mut MutationLog,
    catalog: &'a PieceCatalog,
    player: Player,
}

impl<'a> Effects<'a> {
    pub(crate) fn new(
        graph: &'a mut CellGraph,
        counters: &'a mut [i32],
        log: &'a mut MutationLog,
        catalog: &'a PieceCatalog,
        player: Player,
    ) -> Self {
        Self {
            graph,
            counters,
            log,
            catalog,
            player,
        }
    }

    #[inline]
    pub fn graph(&self) -> &CellGraph {
        self.graph
    }

    #[inline]
    pub fn player(&self) -> Player {
        self.player
    }

    #[inline]
    pub fn owner(&self, piece: PieceId) -> Option<Player> {
        self.catalog.owner(piece)
    }

    #[inline]
    pub fn counter(&self, index: usize) -> i32 {
        self.counters.get(index).copied().unwrap_or(0)
    }

    /// Remove and return the top piece of `loc`.
    pub fn remove_top(&mut self, loc: Loc) -> Result<PieceId, ContractViolation> {
        let idx = self.graph.require(loc)?;
        self.pop_at(idx).ok_or(ContractViolation::EmptyCell(loc))
    }

    /// Push `piece` onto `loc`.
    pub fn push(&mut self, loc: Loc, piece: PieceId) -> Result<(), ContractViolation> {
        let idx = self.graph.require(loc)?;
        if !self.graph.cell(idx).has_room() {
            return Err(ContractViolation::StackFull(loc));
        }
        self.push_at(idx, piece);
        Ok(())
    }

    /// Add `delta` to counter `index`.
    pub fn add_counter(&mut self, index: usize, delta: i32) {
        debug_assert!(index < self.counters.len(), "counter {} out of range", index);
        if delta == 0 || index >= self.counters.len() {
            return;
        }
        self.counters[index] += delta;
        self.log.push(Mutation::Counter { index, delta });
    }

    pub(crate) fn push_at(&mut self, idx: usize, piece: PieceId) {
        self.graph.push(idx, piece);
        self.log.push(Mutation::Push { cell: idx, piece });
    }

    pub(crate) fn pop_at(&mut self, idx: usize) -> Option<PieceId> {
        let piece = self.graph.pop(idx)?;
        self.log.push(Mutation::Pop { cell: idx, piece });
        Some(piece)
    }
}

/// Everything a game contributes to the machine.
pub trait Game: Clone + Debug + Send + Sync + 'static {
    fn name(&self) -> &str;

    fn catalog(&self) -> &Arc<PieceCatalog>;

    /// Build the empty cell graph. Called once per machine.
    fn build_graph(&self) -> CellGraph;

    /// Put the starting pieces on a cleared graph.
    fn populate(&self, graph: &mut CellGraph) -> Result<(), ContractViolation>;

    /// Number of auxiliary counters (all start at zero).
    fn counters(&self) -> usize {
        0
    }

    fn first_player(&self) -> Player {
        Player::One
    }

    fn initial_phase(&self) -> Phase {
        Phase::AwaitingMove
    }

    fn permits(&self, phase: Phase, op: Op) -> bool {
        standard_permits(phase, op)
    }

    /// The transition table. Must not mutate anything; `pos` already
    /// reflects the mutation that caused `step`.
    fn next_phase(&self, phase: Phase, step: Step, _pos: &Position<'_>) -> Option<Phase> {
        standard_transition(phase, step)
    }

    fn phase_traits(&self, phase: Phase) -> PhaseTraits {
        phase.standard_traits()
    }

    /// May the player to move lift the top of `from`? Nothing is floating.
    fn can_pick(&self, pos: &Position<'_>, from: Loc) -> bool;

    /// May `piece`, lifted from `from`, land on `to`? When called by the
    /// machine the piece is already floating.
    fn can_drop(&self, pos: &Position<'_>, from: Loc, piece: PieceId, to: Loc) -> bool;

    /// May `piece`, landing on `to`, remove the tops of `captures`? The
    /// default only accepts an empty list.
    fn can_capture(&self, _pos: &Position<'_>, _to: Loc, _piece: PieceId, captures: &[Loc]) -> bool {
        captures.is_empty()
    }

    /// Every legal move in this position.
    fn legal_moves(&self, pos: &Position<'_>) -> Vec<MoveRecord>;

    /// One legal move, for playouts. Must be a member of `legal_moves`.
    fn random_move<R: Rng + ?Sized>(&self, pos: &Position<'_>, rng: &mut R) -> Option<MoveRecord> {
        self.legal_moves(pos).choose(rng).cloned()
    }

    /// Evaluated after every commit, with the next player to move.
    fn outcome(&self, pos: &Position<'_>) -> Option<Outcome>;

    fn after_pick(
        &self,
        _fx: &mut Effects<'_>,
        _from: Loc,
        _piece: PieceId,
    ) -> Result<(), ContractViolation> {
        Ok(())
    }

    /// Default removes the top piece of every capture cell. The machine has
    /// already checked the list with [`Game::can_capture`].
    fn after_drop(
        &self,
        fx: &mut Effects<'_>,
        _to: Loc,
        _piece: PieceId,
        captures: &[Loc],
    ) -> Result<(), ContractViolation> {
        for &loc in captures {
            fx.remove_top(loc)?;
        }
        Ok(())
    }

    /// Occurrences of one committed position that make a draw pending.
    fn repetition_limit(&self) -> Option<u32> {
        Some(3)
    }
}
