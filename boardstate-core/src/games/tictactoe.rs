//! Tic-tac-toe as a place-then-confirm game.
//!
//! ```text
//! Cells:    3x3 board, capacity 1, Moore links
//! Pools:    pool0 = X (infinite), pool1 = O (infinite)
//! Counters: [stones of P1 on board, stones of P2 on board]
//! ```

use std::sync::Arc;

use rand::Rng;

use crate::cell::{CellGraph, Direction, Loc, Neighborhood};
use crate::error::ContractViolation;
use crate::moves::{MoveRecord, Op};
use crate::phase::{standard_permits, Outcome, Phase};
use crate::piece::{Piece, PieceCatalog, PieceId, Player};
use crate::rules::{confirmation_moves, Effects, Game, Position};

/// Directions that start a line; the other four are their opposites.
const LINE_DIRS: [Direction; 4] = [Direction::E, Direction::N, Direction::NE, Direction::NW];

#[derive(Clone, Debug)]
pub struct TicTacToe {
    catalog: Arc<PieceCatalog>,
    stones: [PieceId; 2],
}

impl TicTacToe {
    pub const SIZE: u8 = 3;

    pub fn new() -> Self {
        let mut catalog = PieceCatalog::new();
        let x = catalog.add(Piece {
            owner: Some(Player::One),
            rank: 0,
            glyph: 'X',
        });
        let o = catalog.add(Piece {
            owner: Some(Player::Two),
            rank: 0,
            glyph: 'O',
        });
        Self {
            catalog: Arc::new(catalog),
            stones: [x, o],
        }
    }

    #[inline]
    pub fn stone(&self, player: Player) -> PieceId {
        self.stones[player.index()]
    }

    /// The pool a player draws stones from.
    #[inline]
    pub fn pool(player: Player) -> Loc {
        Loc::pool(player.index() as u8)
    }

    fn line_winner(&self, graph: &CellGraph) -> Option<Player> {
        for loc in graph.board_locs() {
            let Some(piece) = graph.top(loc) else {
                continue;
            };
            for dir in LINE_DIRS {
                let run = graph.run_length(loc, dir, |c| c.top() == Some(piece));
                if run + 1 >= Self::SIZE as usize {
                    return self.catalog.owner(piece);
                }
            }
        }
        None
    }

    fn board_cells() -> usize {
        Self::SIZE as usize * Self::SIZE as usize
    }
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for TicTacToe {
    fn name(&self) -> &str {
        "tictactoe"
    }

    fn catalog(&self) -> &Arc<PieceCatalog> {
        &self.catalog
    }

    fn build_graph(&self) -> CellGraph {
        CellGraph::grid(Self::SIZE, Self::SIZE, 1, Neighborhood::Moore)
            .with_pool(0, true, 1)
            .with_pool(1, true, 1)
    }

    fn populate(&self, graph: &mut CellGraph) -> Result<(), ContractViolation> {
        for player in Player::ALL {
            graph.place(Self::pool(player), self.stone(player))?;
        }
        Ok(())
    }

    fn counters(&self) -> usize {
        2
    }

    /// No passing; a full board ends the game first.
    fn permits(&self, phase: Phase, op: Op) -> bool {
        op != Op::Pass && standard_permits(phase, op)
    }

    fn can_pick(&self, pos: &Position<'_>, from: Loc) -> bool {
        match pos.phase {
            Phase::Puzzle => pos.top(from).is_some(),
            Phase::AwaitingMove => from == Self::pool(pos.player),
            _ => false,
        }
    }

    fn can_drop(&self, pos: &Position<'_>, _from: Loc, piece: PieceId, to: Loc) -> bool {
        let Some(cell) = pos.graph.get(to) else {
            return false;
        };
        match pos.phase {
            Phase::Puzzle if to.is_pool() => {
                cell.top().and_then(|p| pos.owner(p)) == pos.owner(piece)
            }
            Phase::Puzzle | Phase::AwaitingMove => to.is_board() && cell.is_empty(),
            _ => false,
        }
    }

    fn legal_moves(&self, pos: &Position<'_>) -> Vec<MoveRecord> {
        if let Some(done) = confirmation_moves(pos) {
            return done;
        }
        let from = Self::pool(pos.player);
        if pos.phase != Phase::AwaitingMove || !self.can_pick(pos, from) {
            return Vec::new();
        }
        let stone = self.stone(pos.player);
        pos.graph
            .board_locs()
            .filter(|&to| self.can_drop(pos, from, stone, to))
            .map(|to| MoveRecord::pool_to_board(pos.player, from, to))
            .collect()
    }

    fn random_move<R: Rng + ?Sized>(&self, pos: &Position<'_>, rng: &mut R) -> Option<MoveRecord> {
        if pos.traits.done_eligible {
            return Some(MoveRecord::done(pos.player));
        }
        if pos.phase != Phase::AwaitingMove {
            return None;
        }
        let empty: Vec<Loc> = pos
            .graph
            .board_locs()
            .filter(|&l| pos.top(l).is_none())
            .collect();
        if empty.is_empty() {
            return None;
        }
        let to = empty[rng.random_range(0..empty.len())];
        Some(MoveRecord::pool_to_board(pos.player, Self::pool(pos.player), to))
    }

    fn outcome(&self, pos: &Position<'_>) -> Option<Outcome> {
        if let Some(winner) = self.line_winner(pos.graph) {
            return Some(Outcome::Winner(winner));
        }
        let stones = (pos.counter(0) + pos.counter(1)) as usize;
        (stones >= Self::board_cells()).then_some(Outcome::Draw)
    }

    fn after_pick(
        &self,
        fx: &mut Effects<'_>,
        from: Loc,
        piece: PieceId,
    ) -> Result<(), ContractViolation> {
        if from.is_board() {
            if let Some(owner) = fx.owner(piece) {
                fx.add_counter(owner.index(), -1);
            }
        }
        Ok(())
    }

    fn after_drop(
        &self,
        fx: &mut Effects<'_>,
        to: Loc,
        piece: PieceId,
        _captures: &[Loc],
    ) -> Result<(), ContractViolation> {
        if to.is_board() {
            if let Some(owner) = fx.owner(piece) {
                fx.add_counter(owner.index(), 1);
            }
        }
        Ok(())
    }
}
