//! Reference games built on the machine.

pub mod gobblers;
pub mod tictactoe;

pub use gobblers::{Gobblers, Size};
pub use tictactoe::TicTacToe;
