//! Phases and the standard transition table.
//!
//! ```text
//!                  pick/unpick              done
//!  AwaitingMove ----------------> (same)  <------- PendingConfirmation
//!       |  drop / pass                                 ^   |
//!       +----------------------------------------------+   | undrop / pick
//!       |                                                  v
//!       | resign         done                         AwaitingMove
//!       +--------> ResignPending ------> GameOver <------ DrawPending
//!                   (resign again returns)                 (done)
//! ```
//!
//! Games override [`Game::next_phase`](crate::rules::Game::next_phase) to add
//! special phases; the functions here are the defaults.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::moves::Op;
use crate::piece::Player;

/// Machine state.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Free setup: any piece may be moved anywhere, every drop commits.
    Puzzle,
    AwaitingMove,
    PendingConfirmation,
    ResignPending,
    DrawPending,
    GameOver,
    /// Game-specific intermediate phase.
    Special(u8),
}

impl Phase {
    /// Properties of the built-in phases.
    pub fn standard_traits(self) -> PhaseTraits {
        match self {
            Phase::Puzzle => PhaseTraits::new(false, false),
            Phase::AwaitingMove => PhaseTraits::new(false, true),
            Phase::PendingConfirmation => PhaseTraits::new(true, true),
            Phase::ResignPending => PhaseTraits::new(true, false),
            Phase::DrawPending => PhaseTraits::new(true, false),
            Phase::GameOver => PhaseTraits::new(false, false),
            Phase::Special(_) => PhaseTraits::new(false, true),
        }
    }

    #[inline]
    pub fn is_game_over(self) -> bool {
        self == Phase::GameOver
    }

    /// Stable numeric code used by the digest stream.
    #[inline]
    pub fn code(self) -> u64 {
        match self {
            Phase::Puzzle => 0,
            Phase::AwaitingMove => 1,
            Phase::PendingConfirmation => 2,
            Phase::ResignPending => 3,
            Phase::DrawPending => 4,
            Phase::GameOver => 5,
            Phase::Special(n) => 16 + n as u64,
        }
    }
}

/// Per-phase properties.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PhaseTraits {
    /// `Done` is legal.
    pub done_eligible: bool,
    /// Committed positions in this phase count toward repetition.
    pub tracks_repetition: bool,
}

impl PhaseTraits {
    pub const fn new(done_eligible: bool, tracks_repetition: bool) -> Self {
        Self {
            done_eligible,
            tracks_repetition,
        }
    }
}

/// What just happened, as seen by the transition table.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Step {
    Pick,
    Drop,
    /// The floating piece went back to its source.
    Unpick,
    /// The last dropped piece was picked up again.
    Undrop,
    Done,
    Pass,
    Resign,
    Start,
    Edit,
}

/// Result of a finished game.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Winner(Player),
    Draw,
}

impl Outcome {
    /// Stable numeric code used by the digest stream.
    #[inline]
    pub fn code(outcome: Option<Outcome>) -> u64 {
        match outcome {
            None => 0,
            Some(Outcome::Winner(p)) => 1 + p.index() as u64,
            Some(Outcome::Draw) => 3,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Winner(p) => write!(f, "{} wins", p),
            Outcome::Draw => write!(f, "draw"),
        }
    }
}

/// Which operations each built-in phase accepts.
pub fn standard_permits(phase: Phase, op: Op) -> bool {
    match phase {
        Phase::GameOver => matches!(op, Op::Start | Op::Edit),
        Phase::Puzzle => !matches!(op, Op::Done | Op::Pass | Op::Resign),
        Phase::AwaitingMove | Phase::Special(_) => op != Op::Done,
        Phase::PendingConfirmation => {
            op.is_gesture() || matches!(op, Op::Done | Op::Resign | Op::Start | Op::Edit)
        }
        Phase::ResignPending | Phase::DrawPending => {
            matches!(op, Op::Done | Op::Resign | Op::Start | Op::Edit)
        }
    }
}

/// The default transition table. `None` means the pair is undefined.
pub fn standard_transition(phase: Phase, step: Step) -> Option<Phase> {
    use Phase::*;
    let next = match (phase, step) {
        (_, Step::Start) => AwaitingMove,
        (_, Step::Edit) => Puzzle,

        (Puzzle, Step::Pick | Step::Drop | Step::Unpick | Step::Undrop) => Puzzle,

        (AwaitingMove, Step::Pick | Step::Unpick | Step::Undrop) => AwaitingMove,
        (AwaitingMove, Step::Drop | Step::Pass) => PendingConfirmation,

        (PendingConfirmation, Step::Pick | Step::Undrop) => AwaitingMove,
        (PendingConfirmation, Step::Drop | Step::Unpick) => PendingConfirmation,
        (PendingConfirmation, Step::Done) => AwaitingMove,

        (Special(n), Step::Pick | Step::Unpick | Step::Undrop) => Special(n),
        (Special(_), Step::Drop | Step::Pass) => PendingConfirmation,

        (AwaitingMove | PendingConfirmation | DrawPending | Special(_), Step::Resign) => {
            ResignPending
        }
        (ResignPending | DrawPending, Step::Done) => GameOver,

        _ => return None,
    };
    Some(next)
}
