//! Players and the canonical piece table.
//!
//! Boards never own pieces. Every cell stack holds [`PieceId`] indices into a
//! [`PieceCatalog`] that is built once per game and shared by `Arc` between
//! the live machine and every search clone.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Player identifier.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Player {
    One = 0,
    Two = 1,
}

impl Player {
    pub const ALL: [Player; 2] = [Player::One, Player::Two];

    /// Get the opponent player.
    #[inline]
    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// Zero-based index (0 or 1).
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::One => write!(f, "P1"),
            Player::Two => write!(f, "P2"),
        }
    }
}

/// Index of a piece in its catalog.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceId(pub u8);

impl PieceId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A canonical piece. Immutable once registered.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct Piece {
    /// Owning player, `None` for neutral pieces.
    pub owner: Option<Player>,
    /// Game-defined rank (size, orientation, value...).
    pub rank: u8,
    /// Single character used in text renderings.
    pub glyph: char,
}

/// The canonical piece table for one game.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PieceCatalog {
    pieces: Vec<Piece>,
}

impl PieceCatalog {
    pub fn new() -> Self {
        Self { pieces: Vec::new() }
    }

    /// Register a piece and return its id.
    ///
    /// # Panics
    ///
    /// If the catalog already holds 256 pieces.
    pub fn add(&mut self, piece: Piece) -> PieceId {
        assert!(
            self.pieces.len() <= u8::MAX as usize,
            "piece catalog is full ({} pieces)",
            self.pieces.len()
        );
        let id = PieceId(self.pieces.len() as u8);
        self.pieces.push(piece);
        id
    }

    #[inline]
    pub fn get(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(id.index())
    }

    /// Owner of a piece, `None` for neutral or unknown ids.
    #[inline]
    pub fn owner(&self, id: PieceId) -> Option<Player> {
        self.get(id).and_then(|p| p.owner)
    }

    /// Glyph for rendering, `?` for unknown ids.
    pub fn glyph(&self, id: PieceId) -> char {
        self.get(id).map(|p| p.glyph).unwrap_or('?')
    }

    /// Find the id of the piece with the given owner and rank.
    pub fn find(&self, owner: Option<Player>, rank: u8) -> Option<PieceId> {
        self.pieces
            .iter()
            .position(|p| p.owner == owner && p.rank == rank)
            .map(|i| PieceId(i as u8))
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PieceId, &Piece)> + '_ {
        self.pieces
            .iter()
            .enumerate()
            .map(|(i, p)| (PieceId(i as u8), p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_opponent() {
        assert_eq!(Player::One.opponent(), Player::Two);
        assert_eq!(Player::Two.opponent(), Player::One);
    }

    #[test]
    fn test_catalog_lookup() {
        let mut catalog = PieceCatalog::new();
        let x = catalog.add(Piece { owner: Some(Player::One), rank: 0, glyph: 'X' });
        let o = catalog.add(Piece { owner: Some(Player::Two), rank: 0, glyph: 'O' });

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.owner(x), Some(Player::One));
        assert_eq!(catalog.owner(o), Some(Player::Two));
        assert_eq!(catalog.find(Some(Player::Two), 0), Some(o));
        assert_eq!(catalog.find(None, 0), None);
        assert_eq!(catalog.glyph(PieceId(9)), '?');
    }

    #[test]
    #[should_panic(expected = "piece catalog is full")]
    fn test_catalog_refuses_257th_piece() {
        let mut catalog = PieceCatalog::new();
        let piece = Piece { owner: None, rank: 0, glyph: '#' };
        for i in 0..256 {
            assert_eq!(catalog.add(piece), PieceId(i as u8));
        }
        catalog.add(piece);
    }
}
