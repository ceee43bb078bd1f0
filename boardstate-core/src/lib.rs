//! Reversible, digest-verified turn-based game state.
//!
//! A game is a [`CellGraph`] of board and pool locations, a [`PieceCatalog`]
//! and a [`Game`] policy. [`StateMachine`] drives it: every move is an
//! [`execute`](StateMachine::execute) that can be undone exactly, and every
//! state has a reproducible 64-bit [`digest`](StateMachine::digest).
//!
//! ```text
//! Puzzle --start--> AwaitingMove --drop--> PendingConfirmation --done--> AwaitingMove
//!                        |                        |
//!                      resign                   resign
//!                        v                        v
//!                   ResignPending ------done----> GameOver
//! ```

pub mod cell;
pub mod digest;
pub mod error;
pub mod games;
pub mod machine;
pub mod moves;
pub mod mutation;
pub mod phase;
pub mod piece;
pub mod rules;

pub use cell::{Cell, CellGraph, CellKind, Direction, Loc, Neighborhood};
pub use digest::{DigestStream, RepetitionTable, StateView, DIGEST_SEED};
pub use error::{ConsistencyError, ContractViolation, Error, Result};
pub use games::{Gobblers, TicTacToe};
pub use machine::{Journal, StateMachine};
pub use moves::{MoveRecord, Op};
pub use mutation::{Floating, Landing, Mutation, MutationLog};
pub use phase::{standard_permits, standard_transition, Outcome, Phase, PhaseTraits, Step};
pub use piece::{Piece, PieceCatalog, PieceId, Player};
pub use rules::{confirmation_moves, Effects, Game, Position};
