//! Move records: pure data consumed by [`StateMachine::execute`].
//!
//! [`StateMachine::execute`]: crate::machine::StateMachine::execute
//!
//! # Operations
//!
//! ```text
//! Pick          lift the top piece of a pool cell          from
//! PickBoard     lift the top piece of a board cell         from
//! Drop          put the floating piece on a pool cell        to
//! DropBoard     put the floating piece on a board cell       to
//! PoolToBoard   Pick + DropBoard in one record             from, to
//! BoardToBoard  PickBoard + DropBoard in one record        from, to
//! Pass, Resign, Done, Start, Edit                          (none)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cell::Loc;
use crate::piece::Player;

/// Operation code.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum Op {
    Pick,
    Drop,
    PickBoard,
    DropBoard,
    PoolToBoard,
    BoardToBoard,
    Pass,
    Resign,
    Done,
    Start,
    Edit,
}

impl Op {
    #[inline]
    pub fn is_gesture(self) -> bool {
        matches!(self, Op::Pick | Op::Drop | Op::PickBoard | Op::DropBoard)
    }

    fn name(self) -> &'static str {
        match self {
            Op::Pick => "pick",
            Op::Drop => "drop",
            Op::PickBoard => "pickb",
            Op::DropBoard => "dropb",
            Op::PoolToBoard => "place",
            Op::BoardToBoard => "move",
            Op::Pass => "pass",
            Op::Resign => "resign",
            Op::Done => "done",
            Op::Start => "start",
            Op::Edit => "edit",
        }
    }
}

/// One transition of the state machine.
#[derive(Clone, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub struct MoveRecord {
    pub op: Op,
    pub player: Player,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Loc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Loc>,
    /// Cells whose top piece is removed when this move lands.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub captures: Vec<Loc>,
    /// Game-specific choice (orientation, promotion...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<u8>,
}

impl MoveRecord {
    fn bare(op: Op, player: Player) -> MoveRecord {
        MoveRecord {
            op,
            player,
            from: None,
            to: None,
            captures: Vec::new(),
            variant: None,
        }
    }

    /// Lift the top piece of `from` (a pool or board pick depending on the cell).
    pub fn pick(player: Player, from: Loc) -> MoveRecord {
        let op = if from.is_board() { Op::PickBoard } else { Op::Pick };
        MoveRecord {
            from: Some(from),
            ..Self::bare(op, player)
        }
    }

    /// Put the floating piece on `to`.
    pub fn drop(player: Player, to: Loc) -> MoveRecord {
        let op = if to.is_board() { Op::DropBoard } else { Op::Drop };
        MoveRecord {
            to: Some(to),
            ..Self::bare(op, player)
        }
    }

    /// Composite placement from a pool.
    pub fn pool_to_board(player: Player, from: Loc, to: Loc) -> MoveRecord {
        MoveRecord {
            from: Some(from),
            to: Some(to),
            ..Self::bare(Op::PoolToBoard, player)
        }
    }

    /// Composite move between board cells.
    pub fn board_to_board(player: Player, from: Loc, to: Loc) -> MoveRecord {
        MoveRecord {
            from: Some(from),
            to: Some(to),
            ..Self::bare(Op::BoardToBoard, player)
        }
    }

    pub fn done(player: Player) -> MoveRecord {
        Self::bare(Op::Done, player)
    }

    pub fn pass(player: Player) -> MoveRecord {
        Self::bare(Op::Pass, player)
    }

    pub fn resign(player: Player) -> MoveRecord {
        Self::bare(Op::Resign, player)
    }

    /// Leave setup with `player` to move.
    pub fn start(player: Player) -> MoveRecord {
        Self::bare(Op::Start, player)
    }

    pub fn edit(player: Player) -> MoveRecord {
        Self::bare(Op::Edit, player)
    }

    pub fn with_captures(mut self, captures: Vec<Loc>) -> MoveRecord {
        self.captures = captures;
        self
    }

    pub fn with_variant(mut self, variant: u8) -> MoveRecord {
        self.variant = Some(variant);
        self
    }
}

impl fmt::Display for MoveRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.player, self.op.name())?;
        if let Some(from) = self.from {
            write!(f, " {}", from)?;
        }
        if let Some(to) = self.to {
            write!(f, " {}", to)?;
        }
        for cap in &self.captures {
            write!(f, " x{}", cap)?;
        }
        if let Some(v) = self.variant {
            write!(f, " v{}", v)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_op_follows_cell_kind() {
        assert_eq!(MoveRecord::pick(Player::One, Loc::pool(0)).op, Op::Pick);
        assert_eq!(MoveRecord::pick(Player::One, Loc::board(1, 1)).op, Op::PickBoard);
        assert_eq!(MoveRecord::drop(Player::One, Loc::pool(0)).op, Op::Drop);
        assert_eq!(MoveRecord::drop(Player::One, Loc::board(1, 1)).op, Op::DropBoard);
    }

    #[test]
    fn test_display() {
        let mv = MoveRecord::board_to_board(Player::Two, Loc::board(0, 0), Loc::board(2, 2))
            .with_captures(vec![Loc::board(1, 1)]);
        assert_eq!(mv.to_string(), "P2 move a1 c3 xb2");
        assert_eq!(MoveRecord::done(Player::One).to_string(), "P1 done");
    }

    #[test]
    fn test_serde_omits_empty_fields() {
        let json = serde_json::to_string(&MoveRecord::done(Player::One)).unwrap();
        assert_eq!(json, r#"{"op":"Done","player":"One"}"#);

        let mv = MoveRecord::pool_to_board(Player::One, Loc::pool(1), Loc::board(0, 2)).with_variant(3);
        let back: MoveRecord = serde_json::from_str(&serde_json::to_string(&mv).unwrap()).unwrap();
        assert_eq!(back, mv);
    }
}
