//! Error types.
//!
//! Contract violations are bugs in the caller or the phase table; the
//! machine rolls back the offending call before returning one. Consistency
//! errors implicate the digest formula or clone logic and are kept distinct.

use thiserror::Error;

use crate::cell::Loc;
use crate::moves::Op;
use crate::phase::{Phase, Step};
use crate::piece::{PieceId, Player};

/// A call the machine refuses to perform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("{op:?} is not permitted in phase {phase:?}")]
    IllegalInPhase { op: Op, phase: Phase },

    #[error("no transition from {phase:?} on {step:?}")]
    NoTransition { phase: Phase, step: Step },

    #[error("a piece is already floating")]
    AlreadyFloating,

    #[error("no piece is floating")]
    NothingFloating,

    #[error("move by {found} but {expected} is to move")]
    WrongPlayer { expected: Player, found: Player },

    #[error("unknown cell {0}")]
    UnknownCell(Loc),

    #[error("cell {0} is empty")]
    EmptyCell(Loc),

    #[error("cell {0} is full")]
    StackFull(Loc),

    #[error("{op:?} cannot use cell {loc}")]
    WrongCellKind { op: Op, loc: Loc },

    #[error("{op:?} is missing its {field} address")]
    MissingAddress { op: Op, field: &'static str },

    #[error("cannot pick from {0}")]
    IllegalPick(Loc),

    #[error("cannot drop on {0}")]
    IllegalDrop(Loc),

    #[error("cannot capture on {0}")]
    IllegalCapture(Loc),

    #[error("unexecute without a matching execute")]
    UnmakeWithoutMake,

    #[error("unexecute of {found:?} but last executed was {expected:?}")]
    UnmakeMismatch { expected: Op, found: Op },

    #[error("expected {expected:?} on top of cell {cell} while unwinding, found {found:?}")]
    PieceMismatch {
        cell: usize,
        expected: PieceId,
        found: Option<PieceId>,
    },
}

/// Two states that should be identical are not.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    #[error("states differ in {field} but digests agree")]
    DigestCollision { field: &'static str, digest: u64 },

    #[error("states agree but digests differ ({left:#018x} vs {right:#018x})")]
    DigestMismatch { left: u64, right: u64 },

    #[error("states differ in {field}")]
    StateMismatch { field: &'static str },
}

/// Any failure reported by the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Contract(#[from] ContractViolation),

    #[error("consistency check failed: {0}")]
    Consistency(#[from] ConsistencyError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
