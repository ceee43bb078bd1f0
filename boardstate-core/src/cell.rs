//! The cell graph: every location a piece can occupy.
//!
//! # Layout
//!
//! ```text
//! Board cells come first, row-major, then pool cells in the order added:
//!
//!   row 2:  6 7 8        (col, row) -> row * cols + col
//!   row 1:  3 4 5
//!   row 0:  0 1 2        Pool(slot) -> cols * rows + k
//! ```
//!
//! Topology is fixed at construction. Only stacks and sweep marks change
//! during play, and stacks only change through the state machine's logged
//! primitives (or through [`CellGraph::place`] while populating).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ContractViolation;
use crate::piece::PieceId;

/// Address of a cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Loc {
    /// A board square.
    Board { col: u8, row: u8 },
    /// A pool (supply/rack) slot.
    Pool(u8),
}

impl Loc {
    #[inline]
    pub const fn board(col: u8, row: u8) -> Loc {
        Loc::Board { col, row }
    }

    #[inline]
    pub const fn pool(slot: u8) -> Loc {
        Loc::Pool(slot)
    }

    #[inline]
    pub fn is_board(self) -> bool {
        matches!(self, Loc::Board { .. })
    }

    #[inline]
    pub fn is_pool(self) -> bool {
        matches!(self, Loc::Pool(_))
    }

    /// Stable numeric key used by the digest stream.
    #[inline]
    pub const fn key(self) -> u64 {
        match self {
            Loc::Board { col, row } => (1 << 16) | ((col as u64) << 8) | row as u64,
            Loc::Pool(slot) => (2 << 16) | slot as u64,
        }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Loc::Board { col, row } if col < 26 => {
                write!(f, "{}{}", (b'a' + col) as char, row as u32 + 1)
            }
            Loc::Board { col, row } => write!(f, "({},{})", col, row),
            Loc::Pool(slot) => write!(f, "pool{}", slot),
        }
    }
}

/// Compass direction between neighboring board cells.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
#[repr(u8)]
pub enum Direction {
    N = 0,
    NE = 1,
    E = 2,
    SE = 3,
    S = 4,
    SW = 5,
    W = 6,
    NW = 7,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::N,
        Direction::NE,
        Direction::E,
        Direction::SE,
        Direction::S,
        Direction::SW,
        Direction::W,
        Direction::NW,
    ];

    pub const ORTHOGONAL: [Direction; 4] =
        [Direction::N, Direction::E, Direction::S, Direction::W];

    /// (dcol, drow) step. North is increasing row.
    #[inline]
    pub fn offset(self) -> (i8, i8) {
        match self {
            Direction::N => (0, 1),
            Direction::NE => (1, 1),
            Direction::E => (1, 0),
            Direction::SE => (1, -1),
            Direction::S => (0, -1),
            Direction::SW => (-1, -1),
            Direction::W => (-1, 0),
            Direction::NW => (-1, 1),
        }
    }

    #[inline]
    pub fn opposite(self) -> Direction {
        Direction::ALL[(self as usize + 4) % 8]
    }
}

/// Which neighbor links a grid gets.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Neighborhood {
    /// Four orthogonal links.
    Orthogonal,
    /// All eight links.
    Moore,
}

/// What kind of location a cell is.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CellKind {
    Board,
    /// An infinite pool always offers its one pattern piece and absorbs
    /// anything dropped on it.
    Pool { infinite: bool },
}

/// One location node.
#[derive(Clone, Debug)]
pub struct Cell {
    loc: Loc,
    kind: CellKind,
    capacity: usize,
    stack: Vec<PieceId>,
    neighbors: [Option<usize>; 8],
    sweep: std::cell::Cell<u32>,
}

impl Cell {
    fn new(loc: Loc, kind: CellKind, capacity: usize) -> Cell {
        Cell {
            loc,
            kind,
            capacity,
            stack: Vec::with_capacity(capacity.min(8)),
            neighbors: [None; 8],
            sweep: std::cell::Cell::new(0),
        }
    }

    #[inline]
    pub fn loc(&self) -> Loc {
        self.loc
    }

    #[inline]
    pub fn kind(&self) -> CellKind {
        self.kind
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_infinite(&self) -> bool {
        matches!(self.kind, CellKind::Pool { infinite: true })
    }

    /// Pieces bottom to top.
    #[inline]
    pub fn stack(&self) -> &[PieceId] {
        &self.stack
    }

    #[inline]
    pub fn top(&self) -> Option<PieceId> {
        self.stack.last().copied()
    }

    /// The piece `depth` levels below the top (0 = top).
    #[inline]
    pub fn peek(&self, depth: usize) -> Option<PieceId> {
        self.stack.len().checked_sub(depth + 1).map(|i| self.stack[i])
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.stack.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// True if another piece fits (infinite pools always accept).
    #[inline]
    pub fn has_room(&self) -> bool {
        self.is_infinite() || self.stack.len() < self.capacity
    }

    #[inline]
    pub fn neighbor(&self, dir: Direction) -> Option<usize> {
        self.neighbors[dir as usize]
    }

    /// Last sweep that visited this cell.
    #[inline]
    pub fn sweep_mark(&self) -> u32 {
        self.sweep.get()
    }
}

/// The fixed set of cells for one board instance.
#[derive(Clone, Debug)]
pub struct CellGraph {
    cells: Vec<Cell>,
    index: HashMap<Loc, usize>,
    cols: u8,
    rows: u8,
    sweep_counter: std::cell::Cell<u32>,
}

impl CellGraph {
    /// Build a `cols` x `rows` board whose cells each hold up to `capacity`
    /// pieces.
    pub fn grid(cols: u8, rows: u8, capacity: usize, neighborhood: Neighborhood) -> CellGraph {
        let mut cells = Vec::with_capacity(cols as usize * rows as usize);
        let mut index = HashMap::new();
        for row in 0..rows {
            for col in 0..cols {
                let loc = Loc::board(col, row);
                index.insert(loc, cells.len());
                cells.push(Cell::new(loc, CellKind::Board, capacity));
            }
        }

        let dirs: &[Direction] = match neighborhood {
            Neighborhood::Orthogonal => &Direction::ORTHOGONAL,
            Neighborhood::Moore => &Direction::ALL,
        };
        for cell in cells.iter_mut() {
            let Loc::Board { col, row } = cell.loc else {
                continue;
            };
            for &dir in dirs {
                let (dc, dr) = dir.offset();
                let c = col as i16 + dc as i16;
                let r = row as i16 + dr as i16;
                if (0..cols as i16).contains(&c) && (0..rows as i16).contains(&r) {
                    cell.neighbors[dir as usize] = Some(r as usize * cols as usize + c as usize);
                }
            }
        }

        CellGraph {
            cells,
            index,
            cols,
            rows,
            sweep_counter: std::cell::Cell::new(0),
        }
    }

    /// Add a pool slot. Finite pools hold up to `capacity` pieces.
    pub fn with_pool(mut self, slot: u8, infinite: bool, capacity: usize) -> CellGraph {
        let loc = Loc::pool(slot);
        debug_assert!(!self.index.contains_key(&loc), "duplicate pool slot {}", slot);
        self.index.insert(loc, self.cells.len());
        self.cells
            .push(Cell::new(loc, CellKind::Pool { infinite }, capacity));
        self
    }

    #[inline]
    pub fn cols(&self) -> u8 {
        self.cols
    }

    #[inline]
    pub fn rows(&self) -> u8 {
        self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[inline]
    pub fn cell(&self, idx: usize) -> &Cell {
        &self.cells[idx]
    }

    #[inline]
    pub fn index_of(&self, loc: Loc) -> Option<usize> {
        self.index.get(&loc).copied()
    }

    #[inline]
    pub fn get(&self, loc: Loc) -> Option<&Cell> {
        self.index_of(loc).map(|i| &self.cells[i])
    }

    /// Index of `loc`, or an unknown-cell violation.
    pub fn require(&self, loc: Loc) -> Result<usize, ContractViolation> {
        self.index_of(loc).ok_or(ContractViolation::UnknownCell(loc))
    }

    #[inline]
    pub fn top(&self, loc: Loc) -> Option<PieceId> {
        self.get(loc).and_then(Cell::top)
    }

    #[inline]
    pub fn height(&self, loc: Loc) -> usize {
        self.get(loc).map_or(0, Cell::height)
    }

    /// Board locations, row-major.
    pub fn board_locs(&self) -> impl Iterator<Item = Loc> + '_ {
        self.cells
            .iter()
            .map(|c| c.loc)
            .filter(|l| l.is_board())
    }

    /// Pool locations in the order they were added.
    pub fn pool_locs(&self) -> impl Iterator<Item = Loc> + '_ {
        self.cells.iter().map(|c| c.loc).filter(|l| l.is_pool())
    }

    /// The neighbor of `loc` in `dir`, if linked.
    pub fn neighbor(&self, loc: Loc, dir: Direction) -> Option<Loc> {
        let cell = self.get(loc)?;
        cell.neighbor(dir).map(|i| self.cells[i].loc)
    }

    /// All linked neighbors of `loc`.
    pub fn neighbors(&self, loc: Loc) -> impl Iterator<Item = Loc> + '_ {
        let links = self.get(loc).map(|c| c.neighbors).unwrap_or([None; 8]);
        links.into_iter().flatten().map(move |i| self.cells[i].loc)
    }

    /// Walk from `loc` in `dir` while `pred` holds, returning how many
    /// further cells matched.
    pub fn run_length(&self, loc: Loc, dir: Direction, pred: impl Fn(&Cell) -> bool) -> usize {
        let mut count = 0;
        let mut cur = self.index_of(loc).and_then(|i| self.cells[i].neighbor(dir));
        while let Some(i) = cur {
            if !pred(&self.cells[i]) {
                break;
            }
            count += 1;
            cur = self.cells[i].neighbor(dir);
        }
        count
    }

    // ========== Sweeps ==========

    /// Start a new sweep and return its mark.
    pub fn begin_sweep(&self) -> u32 {
        let next = self.sweep_counter.get().wrapping_add(1).max(1);
        self.sweep_counter.set(next);
        next
    }

    /// Flood fill from `start` over linked cells satisfying `pred`.
    ///
    /// Visited cells are stamped with a fresh sweep mark, so each cell is
    /// visited at most once per call.
    pub fn connected_group(&self, start: Loc, pred: impl Fn(&Cell) -> bool) -> Vec<Loc> {
        let Some(first) = self.index_of(start) else {
            return Vec::new();
        };
        if !pred(&self.cells[first]) {
            return Vec::new();
        }

        let mark = self.begin_sweep();
        let mut group = Vec::new();
        let mut pending = vec![first];
        self.cells[first].sweep.set(mark);

        while let Some(i) = pending.pop() {
            group.push(self.cells[i].loc);
            for next in self.cells[i].neighbors.into_iter().flatten() {
                let cell = &self.cells[next];
                if cell.sweep.get() != mark && pred(cell) {
                    cell.sweep.set(mark);
                    pending.push(next);
                }
            }
        }
        group
    }

    // ========== Setup ==========

    /// Empty every stack. Topology is untouched.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.stack.clear();
        }
    }

    /// Put a piece on a cell while populating a position.
    ///
    /// Unlike play, this also stocks infinite pools with their pattern piece.
    pub fn place(&mut self, loc: Loc, piece: PieceId) -> Result<(), ContractViolation> {
        let idx = self.require(loc)?;
        let cell = &mut self.cells[idx];
        if cell.is_infinite() {
            cell.stack.clear();
        } else if cell.stack.len() >= cell.capacity {
            return Err(ContractViolation::StackFull(loc));
        }
        cell.stack.push(piece);
        Ok(())
    }

    // ========== Primitives (logged by the machine) ==========

    /// Push a piece. Infinite pools absorb it.
    #[inline]
    pub(crate) fn push(&mut self, idx: usize, piece: PieceId) {
        let cell = &mut self.cells[idx];
        if !cell.is_infinite() {
            cell.stack.push(piece);
        }
    }

    /// Pop the top piece. Infinite pools hand out a copy of their pattern.
    #[inline]
    pub(crate) fn pop(&mut self, idx: usize) -> Option<PieceId> {
        let cell = &mut self.cells[idx];
        if cell.is_infinite() {
            cell.stack.last().copied()
        } else {
            cell.stack.pop()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_indexing() {
        let graph = CellGraph::grid(3, 3, 1, Neighborhood::Moore);
        assert_eq!(graph.len(), 9);
        assert_eq!(graph.index_of(Loc::board(0, 0)), Some(0));
        assert_eq!(graph.index_of(Loc::board(2, 0)), Some(2));
        assert_eq!(graph.index_of(Loc::board(1, 1)), Some(4));
        assert_eq!(graph.index_of(Loc::board(3, 0)), None);
    }

    #[test]
    fn test_moore_neighbors() {
        let graph = CellGraph::grid(3, 3, 1, Neighborhood::Moore);
        assert_eq!(graph.neighbors(Loc::board(1, 1)).count(), 8);
        assert_eq!(graph.neighbors(Loc::board(0, 0)).count(), 3);
        assert_eq!(graph.neighbor(Loc::board(0, 0), Direction::NE), Some(Loc::board(1, 1)));
        assert_eq!(graph.neighbor(Loc::board(0, 0), Direction::S), None);
    }

    #[test]
    fn test_orthogonal_neighbors() {
        let graph = CellGraph::grid(3, 3, 1, Neighborhood::Orthogonal);
        assert_eq!(graph.neighbors(Loc::board(1, 1)).count(), 4);
        assert_eq!(graph.neighbor(Loc::board(1, 1), Direction::NE), None);
    }

    #[test]
    fn test_direction_opposite() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            let (dc, dr) = dir.offset();
            assert_eq!(dir.opposite().offset(), (-dc, -dr));
        }
    }

    #[test]
    fn test_pools_follow_board() {
        let graph = CellGraph::grid(3, 3, 1, Neighborhood::Moore)
            .with_pool(0, true, 1)
            .with_pool(1, false, 2);
        assert_eq!(graph.index_of(Loc::pool(0)), Some(9));
        assert_eq!(graph.index_of(Loc::pool(1)), Some(10));
        assert_eq!(graph.pool_locs().count(), 2);
        assert_eq!(graph.board_locs().count(), 9);
        assert_eq!(graph.neighbors(Loc::pool(0)).count(), 0);
    }

    #[test]
    fn test_infinite_pool_primitives() {
        let mut graph = CellGraph::grid(1, 1, 1, Neighborhood::Moore).with_pool(0, true, 1);
        graph.place(Loc::pool(0), PieceId(3)).unwrap();
        let idx = graph.index_of(Loc::pool(0)).unwrap();

        assert_eq!(graph.pop(idx), Some(PieceId(3)));
        assert_eq!(graph.pop(idx), Some(PieceId(3)));
        graph.push(idx, PieceId(3));
        assert_eq!(graph.height(Loc::pool(0)), 1);
    }

    #[test]
    fn test_place_respects_capacity() {
        let mut graph = CellGraph::grid(1, 1, 2, Neighborhood::Moore);
        let loc = Loc::board(0, 0);
        graph.place(loc, PieceId(0)).unwrap();
        graph.place(loc, PieceId(1)).unwrap();
        assert_eq!(
            graph.place(loc, PieceId(2)),
            Err(ContractViolation::StackFull(loc))
        );
        assert_eq!(graph.top(loc), Some(PieceId(1)));
        assert_eq!(graph.get(loc).unwrap().peek(1), Some(PieceId(0)));
        assert_eq!(graph.get(loc).unwrap().peek(2), None);
    }

    #[test]
    fn test_connected_group() {
        let mut graph = CellGraph::grid(3, 3, 1, Neighborhood::Orthogonal);
        for loc in [Loc::board(0, 0), Loc::board(1, 0), Loc::board(1, 1), Loc::board(2, 2)] {
            graph.place(loc, PieceId(0)).unwrap();
        }

        let group = graph.connected_group(Loc::board(0, 0), |c| !c.is_empty());
        assert_eq!(group.len(), 3);
        assert!(!group.contains(&Loc::board(2, 2)));

        // A second sweep gets a fresh mark and finds the same group.
        let again = graph.connected_group(Loc::board(1, 1), |c| !c.is_empty());
        assert_eq!(again.len(), 3);
        assert!(graph.get(Loc::board(1, 1)).unwrap().sweep_mark() > 1);

        assert!(graph.connected_group(Loc::board(0, 2), |c| !c.is_empty()).is_empty());
    }

    #[test]
    fn test_run_length() {
        let mut graph = CellGraph::grid(3, 3, 1, Neighborhood::Moore);
        graph.place(Loc::board(1, 1), PieceId(0)).unwrap();
        graph.place(Loc::board(2, 2), PieceId(0)).unwrap();
        let n = graph.run_length(Loc::board(0, 0), Direction::NE, |c| c.top() == Some(PieceId(0)));
        assert_eq!(n, 2);
        let n = graph.run_length(Loc::board(0, 0), Direction::E, |c| c.top() == Some(PieceId(0)));
        assert_eq!(n, 0);
    }

    #[test]
    fn test_loc_display() {
        assert_eq!(Loc::board(0, 0).to_string(), "a1");
        assert_eq!(Loc::board(2, 1).to_string(), "c2");
        assert_eq!(Loc::pool(4).to_string(), "pool4");
    }
}
