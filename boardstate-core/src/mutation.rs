//! The mutation log.
//!
//! Every primitive edit the machine makes is recorded here as a
//! self-describing entry. Undoing an entry needs nothing but the entry
//! itself, so rewinding to any earlier depth is a loop of `pop` + inverse.
//!
//! ```text
//! execute(pick a1)   [Begin(PickBoard), Pop(0, X), Float(None), Phase(AwaitingMove)]
//! execute(drop b2)   [Begin(DropBoard), Push(4, X), Counter(0, +1), Float(Some..), Landed, Phase(..)]
//! ```

use std::ops::Range;

use crate::cell::Loc;
use crate::moves::Op;
use crate::phase::{Outcome, Phase};
use crate::piece::{PieceId, Player};

/// The piece currently held by the player.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Floating {
    pub piece: PieceId,
    pub source: Loc,
    /// Log entries the pick produced (removal plus game hooks).
    pub span: Range<usize>,
}

/// A drop that has not been committed yet.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Landing {
    pub cell: Loc,
    /// Log entries the drop produced (placement plus game hooks).
    pub span: Range<usize>,
    /// What was floating before the drop.
    pub floating: Floating,
}

/// One primitive edit.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Mutation {
    /// Start of one `execute` call.
    Begin { op: Op },
    Push { cell: usize, piece: PieceId },
    Pop { cell: usize, piece: PieceId },
    Float { before: Option<Floating> },
    Phase { before: Phase },
    Player { before: Player },
    MoveNumber { before: u32 },
    Counter { index: usize, delta: i32 },
    Outcome { before: Option<Outcome> },
    ResignFrom { before: Option<Phase> },
    /// A committed digest was counted for repetition.
    Repetition { digest: u64 },
    Landed,
    Unlanded { landing: Landing },
    /// Commit boundary; holds the landings it cleared.
    Commit { landings: Vec<Landing> },
}

/// LIFO record of mutations since the last cleared commit.
#[derive(Clone, Debug, Default)]
pub struct MutationLog {
    entries: Vec<Mutation>,
}

impl MutationLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(256),
        }
    }

    #[inline]
    pub fn push(&mut self, entry: Mutation) {
        self.entries.push(entry);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<Mutation> {
        self.entries.pop()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Position and op of the most recent `Begin`.
    pub fn last_begin(&self) -> Option<(usize, Op)> {
        self.entries.iter().enumerate().rev().find_map(|(i, e)| match e {
            Mutation::Begin { op } => Some((i, *op)),
            _ => None,
        })
    }

    /// Copy of a span, for replaying inverses while the log keeps growing.
    pub fn span(&self, range: Range<usize>) -> Vec<Mutation> {
        self.entries[range].to_vec()
    }

    /// Number of `Begin` markers, i.e. executes that can still be undone.
    pub fn executes(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, Mutation::Begin { .. }))
            .count()
    }
}
