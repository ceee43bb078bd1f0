//! Make/unmake view of a cloned machine for search engines.
//!
//! ```text
//! live machine --clone_for_search--> SearchBoard (retained journal)
//! make_move:    push log depth, execute + implicit Done
//! unmake_move:  pop depth, rewind the log to it
//! ```

use boardstate_core::{
    ConsistencyError, ContractViolation, Game, MoveRecord, Op, Outcome, Player, StateMachine,
};
use rand::Rng;
use tracing::instrument;

use crate::error::SearchError;

/// A search-owned clone of a live machine.
#[derive(Clone, Debug)]
pub struct SearchBoard<G: Game> {
    machine: StateMachine<G>,
    /// Log depth before each made move.
    stack: Vec<usize>,
    root_digest: u64,
}

impl<G: Game> SearchBoard<G> {
    /// Deep-clone `live` and verify the copy against it.
    #[instrument(level = "debug", skip_all, fields(game = %live.game().name()))]
    pub fn from_live(live: &StateMachine<G>) -> Result<Self, SearchError> {
        let machine = live.clone_for_search()?;
        Ok(Self {
            root_digest: machine.digest(),
            machine,
            stack: Vec::with_capacity(64),
        })
    }

    /// Execute `mv`, confirming it if the machine asks for `Done`.
    pub fn make_move(&mut self, mv: &MoveRecord) -> Result<(), SearchError> {
        let depth = self.machine.log_depth();
        self.machine.execute_with_confirm(mv)?;
        self.stack.push(depth);
        Ok(())
    }

    /// Undo the most recent [`make_move`](Self::make_move).
    pub fn unmake_move(&mut self) -> Result<(), ContractViolation> {
        let depth = self
            .stack
            .pop()
            .ok_or(ContractViolation::UnmakeWithoutMake)?;
        self.machine.unexecute_to(depth)
    }

    /// Unmake until only `ply` moves remain made.
    pub fn unwind_to(&mut self, ply: usize) -> Result<(), ContractViolation> {
        while self.stack.len() > ply {
            self.unmake_move()?;
        }
        Ok(())
    }

    /// Moves currently made on top of the root.
    #[inline]
    pub fn ply(&self) -> usize {
        self.stack.len()
    }

    /// The board must be back at its root position.
    pub fn verify_unwound(&self) -> Result<(), SearchError> {
        let digest = self.machine.digest();
        if self.stack.is_empty() && digest == self.root_digest {
            return Ok(());
        }
        Err(ConsistencyError::DigestMismatch {
            left: self.root_digest,
            right: digest,
        }
        .into())
    }

    pub fn list_moves(&self) -> Vec<MoveRecord> {
        self.machine.legal_moves()
    }

    pub fn random_move<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<MoveRecord> {
        self.machine.random_move(rng)
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.machine.is_game_over()
    }

    #[inline]
    pub fn outcome(&self) -> Option<Outcome> {
        self.machine.outcome()
    }

    #[inline]
    pub fn player(&self) -> Player {
        self.machine.player()
    }

    #[inline]
    pub fn digest(&self) -> u64 {
        self.machine.digest()
    }

    /// Has the current committed position occurred before, in the game or
    /// on the searched line? Such nodes are one step closer to a
    /// repetition draw than their digest shows.
    pub fn repeated(&self) -> bool {
        self.machine.repetitions(self.machine.digest()) > 1
    }

    #[inline]
    pub fn machine(&self) -> &StateMachine<G> {
        &self.machine
    }

    /// What to play when nothing was searched: pass if the game allows it
    /// here, resign otherwise.
    pub fn fallback_move(&self) -> MoveRecord {
        let player = self.machine.player();
        if self.machine.game().permits(self.machine.phase(), Op::Pass) {
            MoveRecord::pass(player)
        } else {
            MoveRecord::resign(player)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardstate_core::{Journal, Loc, TicTacToe};

    #[test]
    fn test_make_unmake_restores_root() {
        let live = StateMachine::new(TicTacToe::new()).unwrap();
        let mut board = SearchBoard::from_live(&live).unwrap();
        assert_eq!(board.machine().journal(), Journal::Retained);

        let mv = MoveRecord::pool_to_board(Player::One, TicTacToe::pool(Player::One), Loc::board(1, 1));
        board.make_move(&mv).unwrap();
        assert_eq!(board.player(), Player::Two);
        assert_eq!(board.ply(), 1);
        assert!(board.verify_unwound().is_err());

        board.unmake_move().unwrap();
        board.verify_unwound().unwrap();
        assert!(board.machine().sameboard(&live).is_ok());
        assert_eq!(board.unmake_move(), Err(ContractViolation::UnmakeWithoutMake));
    }

    #[test]
    fn test_unwind_to() {
        let live = StateMachine::new(TicTacToe::new()).unwrap();
        let mut board = SearchBoard::from_live(&live).unwrap();
        for _ in 0..3 {
            let mv = board.list_moves()[0].clone();
            board.make_move(&mv).unwrap();
        }
        board.unwind_to(1).unwrap();
        assert_eq!(board.ply(), 1);
        board.unwind_to(0).unwrap();
        board.verify_unwound().unwrap();
    }

    #[test]
    fn test_bad_move_leaves_board() {
        let live = StateMachine::new(TicTacToe::new()).unwrap();
        let mut board = SearchBoard::from_live(&live).unwrap();
        let mv = MoveRecord::pool_to_board(Player::Two, TicTacToe::pool(Player::Two), Loc::board(0, 0));
        assert!(matches!(board.make_move(&mv), Err(SearchError::Engine(_))));
        assert_eq!(board.ply(), 0);
        board.verify_unwound().unwrap();
    }

    #[test]
    fn test_fallback_resigns_without_pass() {
        let live = StateMachine::new(TicTacToe::new()).unwrap();
        let board = SearchBoard::from_live(&live).unwrap();
        let fallback = board.fallback_move();
        assert_eq!(fallback, MoveRecord::resign(Player::One));

        let mut played = live.clone();
        played.execute_with_confirm(&fallback).unwrap();
        assert_eq!(played.outcome(), Some(Outcome::Winner(Player::Two)));
    }
}
