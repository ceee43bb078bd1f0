//! State digests and repetition bookkeeping.
//!
//! # Digest stream
//!
//! Every contribution is a keyed draw: xxh64 over a 25-byte key
//! `[domain, a, b, c]` (little-endian u64s) with the fixed seed
//! [`DIGEST_SEED`]. Draws are XORed together, so the result depends only on
//! the state, never on the order moves were made in.
//!
//! ```text
//! Order  Domain     Key (a, b, c)
//! 1      CELL       (cell loc, stack level, piece)      every stacked piece
//! 2      FLOATING   (piece, source loc, 0)              or one NOTHING draw
//! 3      COUNTER    (index, value, 0)                   every counter
//! 4      LANDING    (landing loc, order, 0)             every pending drop
//! 5      STATE      (phase, player, outcome | resign)   exactly once
//! ```
//!
//! The move number is not part of the digest: a position reached again
//! later in the game must digest equal for repetition to be detected.

use std::collections::HashMap;

use xxhash_rust::xxh64::xxh64;

use crate::cell::{CellGraph, Loc};
use crate::error::ConsistencyError;
use crate::mutation::{Floating, Landing};
use crate::phase::{Outcome, Phase};
use crate::piece::Player;

/// Seed shared by every digest stream.
pub const DIGEST_SEED: u64 = 0x62_6f_61_72_64_73_74_31;

const CELL: u8 = 1;
const FLOATING: u8 = 2;
const NOTHING: u8 = 3;
const COUNTER: u8 = 4;
const LANDING: u8 = 5;
const STATE: u8 = 6;

/// Reproducible keyed pseudo-random values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DigestStream {
    seed: u64,
}

impl DigestStream {
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// The value for one key. Same key, same value, in every process.
    #[inline]
    pub fn draw(&self, domain: u8, a: u64, b: u64, c: u64) -> u64 {
        let mut key = [0u8; 25];
        key[0] = domain;
        key[1..9].copy_from_slice(&a.to_le_bytes());
        key[9..17].copy_from_slice(&b.to_le_bytes());
        key[17..25].copy_from_slice(&c.to_le_bytes());
        xxh64(&key, self.seed)
    }
}

impl Default for DigestStream {
    fn default() -> Self {
        Self::new(DIGEST_SEED)
    }
}

/// Borrowed view of every field that defines a logical state.
#[derive(Clone, Copy, Debug)]
pub struct StateView<'a> {
    pub graph: &'a CellGraph,
    pub floating: Option<&'a Floating>,
    pub counters: &'a [i32],
    pub landings: &'a [Landing],
    pub phase: Phase,
    pub player: Player,
    pub outcome: Option<Outcome>,
    pub resign_from: Option<Phase>,
}

impl StateView<'_> {
    /// Digest of this state.
    pub fn digest(&self, stream: &DigestStream) -> u64 {
        let mut h = 0u64;

        for cell in self.graph.cells() {
            let loc = cell.loc().key();
            for (level, piece) in cell.stack().iter().enumerate() {
                h ^= stream.draw(CELL, loc, level as u64, piece.0 as u64);
            }
        }

        h ^= match self.floating {
            Some(f) => stream.draw(FLOATING, f.piece.0 as u64, f.source.key(), 0),
            None => stream.draw(NOTHING, 0, 0, 0),
        };

        for (i, &value) in self.counters.iter().enumerate() {
            h ^= stream.draw(COUNTER, i as u64, value as i64 as u64, 0);
        }

        for (order, landing) in self.landings.iter().enumerate() {
            h ^= stream.draw(LANDING, landing.cell.key(), order as u64, 0);
        }

        let resign = self.resign_from.map_or(0, |p| p.code() + 1);
        h ^= stream.draw(
            STATE,
            self.phase.code(),
            self.player.index() as u64,
            Outcome::code(self.outcome) | (resign << 8),
        );

        h
    }

    /// First field in which two states differ, compared directly rather than
    /// through digests.
    pub fn first_difference(&self, other: &StateView<'_>) -> Option<&'static str> {
        if self.graph.len() != other.graph.len() {
            return Some("cells");
        }
        let cells_equal = self
            .graph
            .cells()
            .iter()
            .zip(other.graph.cells())
            .all(|(a, b)| a.loc() == b.loc() && a.stack() == b.stack());
        if !cells_equal {
            return Some("cells");
        }
        let floating = |v: &StateView<'_>| v.floating.map(|f| (f.piece, f.source));
        if floating(self) != floating(other) {
            return Some("floating");
        }
        if self.counters != other.counters {
            return Some("counters");
        }
        let landed = |v: &StateView<'_>| v.landings.iter().map(|l| l.cell).collect::<Vec<Loc>>();
        if landed(self) != landed(other) {
            return Some("landings");
        }
        if self.phase != other.phase {
            return Some("phase");
        }
        if self.player != other.player {
            return Some("player");
        }
        if self.outcome != other.outcome {
            return Some("outcome");
        }
        if self.resign_from != other.resign_from {
            return Some("resign_from");
        }
        None
    }

    /// Field-by-field equality.
    pub fn same_state(&self, other: &StateView<'_>) -> bool {
        self.first_difference(other).is_none()
    }

    /// Cross-check field equality against digest equality.
    ///
    /// Succeeds only when the states are identical and digest identically;
    /// any disagreement between the two notions is reported distinctly.
    pub fn sameboard(
        &self,
        other: &StateView<'_>,
        stream: &DigestStream,
    ) -> Result<(), ConsistencyError> {
        let left = self.digest(stream);
        let right = other.digest(stream);
        match (self.first_difference(other), left == right) {
            (None, true) => Ok(()),
            (None, false) => Err(ConsistencyError::DigestMismatch { left, right }),
            (Some(field), true) => Err(ConsistencyError::DigestCollision {
                field,
                digest: left,
            }),
            (Some(field), false) => Err(ConsistencyError::StateMismatch { field }),
        }
    }
}

/// Multiset of committed digests.
#[derive(Clone, Debug, Default)]
pub struct RepetitionTable {
    counts: HashMap<u64, u32>,
}

impl RepetitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more occurrence and return the new total.
    pub fn record(&mut self, digest: u64) -> u32 {
        let count = self.counts.entry(digest).or_insert(0);
        *count += 1;
        *count
    }

    /// Undo one `record`.
    pub fn forget(&mut self, digest: u64) {
        if let Some(count) = self.counts.get_mut(&digest) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(&digest);
            }
        }
    }

    #[inline]
    pub fn count(&self, digest: u64) -> u32 {
        self.counts.get(&digest).copied().unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }

    /// Number of distinct digests recorded.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Neighborhood;
    use crate::piece::PieceId;

    fn view<'a>(graph: &'a CellGraph, counters: &'a [i32]) -> StateView<'a> {
        StateView {
            graph,
            floating: None,
            counters,
            landings: &[],
            phase: Phase::AwaitingMove,
            player: Player::One,
            outcome: None,
            resign_from: None,
        }
    }

    #[test]
    fn test_draw_is_deterministic() {
        let a = DigestStream::default();
        let b = DigestStream::new(DIGEST_SEED);
        assert_eq!(a.draw(CELL, 1, 2, 3), b.draw(CELL, 1, 2, 3));
        assert_ne!(a.draw(CELL, 1, 2, 3), a.draw(CELL, 1, 2, 4));
        assert_ne!(a.draw(CELL, 1, 2, 3), a.draw(COUNTER, 1, 2, 3));
    }

    #[test]
    fn test_one_cell_changes_digest() {
        let stream = DigestStream::default();
        let empty = CellGraph::grid(3, 3, 1, Neighborhood::Moore);
        let mut one = empty.clone();
        one.place(Loc::board(1, 1), PieceId(0)).unwrap();
        let mut other = empty.clone();
        other.place(Loc::board(1, 1), PieceId(1)).unwrap();

        let d_empty = view(&empty, &[]).digest(&stream);
        let d_one = view(&one, &[]).digest(&stream);
        let d_other = view(&other, &[]).digest(&stream);
        assert_ne!(d_empty, d_one);
        assert_ne!(d_one, d_other);
    }

    #[test]
    fn test_placement_order_irrelevant() {
        let stream = DigestStream::default();
        let mut a = CellGraph::grid(3, 3, 1, Neighborhood::Moore);
        let mut b = a.clone();
        a.place(Loc::board(0, 0), PieceId(0)).unwrap();
        a.place(Loc::board(2, 2), PieceId(1)).unwrap();
        b.place(Loc::board(2, 2), PieceId(1)).unwrap();
        b.place(Loc::board(0, 0), PieceId(0)).unwrap();

        assert_eq!(view(&a, &[]).digest(&stream), view(&b, &[]).digest(&stream));
        assert!(view(&a, &[]).same_state(&view(&b, &[])));
        assert!(view(&a, &[]).sameboard(&view(&b, &[]), &stream).is_ok());
    }

    #[test]
    fn test_sameboard_reports_field() {
        let stream = DigestStream::default();
        let graph = CellGraph::grid(3, 3, 1, Neighborhood::Moore);
        let a = view(&graph, &[1, 0]);
        let b = view(&graph, &[0, 1]);
        assert_eq!(a.first_difference(&b), Some("counters"));
        assert_eq!(
            a.sameboard(&b, &stream),
            Err(ConsistencyError::StateMismatch { field: "counters" })
        );

        let mut c = view(&graph, &[1, 0]);
        c.player = Player::Two;
        assert_eq!(a.first_difference(&c), Some("player"));
        assert_ne!(a.digest(&stream), c.digest(&stream));
    }

    #[test]
    fn test_repetition_table() {
        let mut table = RepetitionTable::new();
        assert_eq!(table.record(7), 1);
        assert_eq!(table.record(7), 2);
        assert_eq!(table.record(9), 1);
        table.forget(7);
        assert_eq!(table.count(7), 1);
        table.forget(7);
        assert_eq!(table.count(7), 0);
        assert_eq!(table.len(), 1);
    }
}
