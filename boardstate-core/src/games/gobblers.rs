//! Gobblet Gobblers on the generic machine.
//!
//! ```text
//! Cells:   3x3 board, capacity 3 (one piece per size), Moore links
//!          cell index i = row * 3 + col
//!            6 7 8
//!            3 4 5
//!            0 1 2
//! Pools:   pool(player * 3 + size), two pieces each, finite
//! Pieces:  id = player * 3 + size   (P1: s m l, P2: S M L)
//! ```
//!
//! Rules:
//! - A piece lands on an empty cell or gobbles a strictly smaller top piece.
//! - A board piece never lands back where it was lifted from.
//! - Reveal rule: if lifting a piece exposes an opponent line, the piece
//!   must gobble into that line.
//! - After a move, a visible line for the player to move wins for them
//!   (a revealed line beats a completed one); otherwise a line for the
//!   mover wins. A player with no legal move loses.

use std::sync::Arc;

use crate::cell::{CellGraph, Loc, Neighborhood};
use crate::error::ContractViolation;
use crate::moves::{MoveRecord, Op};
use crate::phase::{standard_permits, Outcome, Phase};
use crate::piece::{Piece, PieceCatalog, PieceId, Player};
use crate::rules::{confirmation_moves, Game, Position};

/// Piece size.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Size {
    Small = 0,
    Medium = 1,
    Large = 2,
}

impl Size {
    /// Check if this size can gobble (cover) another size.
    #[inline]
    pub fn can_gobble(self, other: Size) -> bool {
        (self as u8) > (other as u8)
    }

    /// Get all sizes as an iterator.
    pub fn all() -> impl Iterator<Item = Size> {
        [Size::Small, Size::Medium, Size::Large].into_iter()
    }
}

/// Visible top piece of each board cell.
type Tops = [Option<PieceId>; 9];

#[derive(Clone, Debug)]
pub struct Gobblers {
    catalog: Arc<PieceCatalog>,
}

impl Gobblers {
    pub const PIECES_PER_SIZE: usize = 2;

    const WIN_LINES: [[usize; 3]; 8] = [
        [0, 1, 2], // Row 0
        [3, 4, 5], // Row 1
        [6, 7, 8], // Row 2
        [0, 3, 6], // Col 0
        [1, 4, 7], // Col 1
        [2, 5, 8], // Col 2
        [0, 4, 8], // Main diagonal
        [2, 4, 6], // Anti-diagonal
    ];

    pub fn new() -> Self {
        let mut catalog = PieceCatalog::new();
        for player in Player::ALL {
            for size in Size::all() {
                let glyph = match (player, size) {
                    (Player::One, Size::Small) => 's',
                    (Player::One, Size::Medium) => 'm',
                    (Player::One, Size::Large) => 'l',
                    (Player::Two, Size::Small) => 'S',
                    (Player::Two, Size::Medium) => 'M',
                    (Player::Two, Size::Large) => 'L',
                };
                catalog.add(Piece {
                    owner: Some(player),
                    rank: size as u8,
                    glyph,
                });
            }
        }
        Self {
            catalog: Arc::new(catalog),
        }
    }

    #[inline]
    pub fn piece(player: Player, size: Size) -> PieceId {
        PieceId((player.index() * 3 + size as usize) as u8)
    }

    #[inline]
    pub fn size_of(piece: PieceId) -> Size {
        match piece.0 % 3 {
            0 => Size::Small,
            1 => Size::Medium,
            _ => Size::Large,
        }
    }

    /// Reserve pool holding a player's pieces of one size.
    #[inline]
    pub fn reserve(player: Player, size: Size) -> Loc {
        Loc::pool((player.index() * 3 + size as usize) as u8)
    }

    /// Board location of cell index 0-8.
    #[inline]
    pub fn cell(idx: usize) -> Loc {
        debug_assert!(idx < 9);
        Loc::board((idx % 3) as u8, (idx / 3) as u8)
    }

    #[inline]
    fn cell_index(loc: Loc) -> Option<usize> {
        match loc {
            Loc::Board { col, row } if col < 3 && row < 3 => Some(row as usize * 3 + col as usize),
            _ => None,
        }
    }

    /// Visible tops, optionally as if the top of `lifted` were in hand.
    fn tops(pos: &Position<'_>, lifted: Option<Loc>) -> Tops {
        let mut tops = [None; 9];
        for (i, top) in tops.iter_mut().enumerate() {
            *top = pos.top_after_lift(Self::cell(i), lifted);
        }
        tops
    }

    fn winning_line(&self, tops: &Tops, player: Player) -> Option<[usize; 3]> {
        Self::WIN_LINES.iter().copied().find(|line| {
            line.iter()
                .all(|&i| tops[i].and_then(|p| self.catalog.owner(p)) == Some(player))
        })
    }

    #[inline]
    fn covers(piece: PieceId, under: Option<PieceId>) -> bool {
        under.map_or(true, |u| Self::size_of(piece).can_gobble(Self::size_of(u)))
    }

    /// Shared landing rule for play. `tops` must already reflect the lift.
    fn landing_ok(&self, tops: &Tops, player: Player, from: Loc, piece: PieceId, to: Loc) -> bool {
        let Some(idx) = Self::cell_index(to) else {
            return false;
        };
        if to == from || !Self::covers(piece, tops[idx]) {
            return false;
        }
        if from.is_board() {
            if let Some(line) = self.winning_line(tops, player.opponent()) {
                return line.contains(&idx);
            }
        }
        true
    }

    /// Every placement and slide for the player to move.
    fn generate(&self, pos: &Position<'_>) -> Vec<MoveRecord> {
        let player = pos.player;
        let mut moves = Vec::with_capacity(32);

        let board = Self::tops(pos, None);
        for size in Size::all() {
            let from = Self::reserve(player, size);
            let Some(piece) = pos.top(from) else {
                continue;
            };
            for to in (0..9).map(Self::cell) {
                if self.landing_ok(&board, player, from, piece, to) {
                    moves.push(MoveRecord::pool_to_board(player, from, to));
                }
            }
        }

        for (i, top) in board.iter().enumerate() {
            let Some(piece) = *top else {
                continue;
            };
            if pos.owner(piece) != Some(player) {
                continue;
            }
            let from = Self::cell(i);
            let lifted = Self::tops(pos, Some(from));
            for to in (0..9).map(Self::cell) {
                if self.landing_ok(&lifted, player, from, piece, to) {
                    moves.push(MoveRecord::board_to_board(player, from, to));
                }
            }
        }

        moves
    }
}

impl Default for Gobblers {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for Gobblers {
    fn name(&self) -> &str {
        "gobblers"
    }

    fn catalog(&self) -> &Arc<PieceCatalog> {
        &self.catalog
    }

    fn build_graph(&self) -> CellGraph {
        let mut graph = CellGraph::grid(3, 3, 3, Neighborhood::Moore);
        for player in Player::ALL {
            for size in Size::all() {
                let Loc::Pool(slot) = Self::reserve(player, size) else {
                    continue;
                };
                graph = graph.with_pool(slot, false, Self::PIECES_PER_SIZE);
            }
        }
        graph
    }

    fn populate(&self, graph: &mut CellGraph) -> Result<(), ContractViolation> {
        for player in Player::ALL {
            for size in Size::all() {
                for _ in 0..Self::PIECES_PER_SIZE {
                    graph.place(Self::reserve(player, size), Self::piece(player, size))?;
                }
            }
        }
        Ok(())
    }

    /// Passing is not a move: a player who cannot move has lost.
    fn permits(&self, phase: Phase, op: Op) -> bool {
        op != Op::Pass && standard_permits(phase, op)
    }

    fn can_pick(&self, pos: &Position<'_>, from: Loc) -> bool {
        let Some(piece) = pos.top(from) else {
            return false;
        };
        match pos.phase {
            Phase::Puzzle => true,
            Phase::AwaitingMove => {
                if pos.owner(piece) != Some(pos.player) {
                    return false;
                }
                if from.is_pool() {
                    return true;
                }
                let lifted = Self::tops(pos, Some(from));
                (0..9)
                    .map(Self::cell)
                    .any(|to| self.landing_ok(&lifted, pos.player, from, piece, to))
            }
            _ => false,
        }
    }

    fn can_drop(&self, pos: &Position<'_>, from: Loc, piece: PieceId, to: Loc) -> bool {
        match pos.phase {
            Phase::Puzzle => {
                let Some(cell) = pos.graph.get(to) else {
                    return false;
                };
                if !cell.has_room() {
                    return false;
                }
                match (to, pos.owner(piece)) {
                    (Loc::Board { .. }, _) => Self::covers(piece, cell.top()),
                    (Loc::Pool(_), Some(owner)) => to == Self::reserve(owner, Self::size_of(piece)),
                    (Loc::Pool(_), None) => false,
                }
            }
            Phase::AwaitingMove => {
                let tops = Self::tops(pos, None);
                self.landing_ok(&tops, pos.player, from, piece, to)
            }
            _ => false,
        }
    }

    fn legal_moves(&self, pos: &Position<'_>) -> Vec<MoveRecord> {
        if let Some(done) = confirmation_moves(pos) {
            return done;
        }
        if pos.phase != Phase::AwaitingMove {
            return Vec::new();
        }
        self.generate(pos)
    }

    fn outcome(&self, pos: &Position<'_>) -> Option<Outcome> {
        let tops = Self::tops(pos, None);
        let to_move = pos.player;
        let mover = to_move.opponent();
        if self.winning_line(&tops, to_move).is_some() {
            return Some(Outcome::Winner(to_move));
        }
        if self.winning_line(&tops, mover).is_some() {
            return Some(Outcome::Winner(mover));
        }
        if self.generate(pos).is_empty() {
            return Some(Outcome::Winner(mover));
        }
        None
    }
}
