//! Position scoring for alpha-beta.

use boardstate_core::{Game, Outcome, Player, StateMachine};

/// Score of a won game; faster wins score higher.
pub const WIN: i32 = 1_000_000;

/// Scores at or beyond this are forced results.
pub const WIN_THRESHOLD: i32 = WIN - 1_000;

/// Scores a non-terminal position from `player`'s point of view.
pub trait Evaluator<G: Game>: Send {
    fn evaluate(&self, machine: &StateMachine<G>, player: Player) -> i32;
}

impl<G, F> Evaluator<G> for F
where
    G: Game,
    F: Fn(&StateMachine<G>, Player) -> i32 + Send,
{
    fn evaluate(&self, machine: &StateMachine<G>, player: Player) -> i32 {
        self(machine, player)
    }
}

/// Knows nothing but finished games: every open position is even.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalEvaluator;

impl<G: Game> Evaluator<G> for TerminalEvaluator {
    fn evaluate(&self, _machine: &StateMachine<G>, _player: Player) -> i32 {
        0
    }
}

/// Score of a finished game `ply` moves below the root.
pub fn terminal_score(outcome: Option<Outcome>, player: Player, ply: usize) -> i32 {
    let ply = ply.min(WIN as usize - WIN_THRESHOLD as usize) as i32;
    match outcome {
        Some(Outcome::Winner(winner)) if winner == player => WIN - ply,
        Some(Outcome::Winner(_)) => -(WIN - ply),
        Some(Outcome::Draw) | None => 0,
    }
}

/// Forced-result scores measured from the node instead of the root, for
/// storing. Other scores pass through.
pub fn score_to_table(score: i32, ply: usize) -> i32 {
    let ply = ply.min(WIN as usize - WIN_THRESHOLD as usize) as i32;
    if score >= WIN_THRESHOLD {
        score + ply
    } else if score <= -WIN_THRESHOLD {
        score - ply
    } else {
        score
    }
}

/// Inverse of [`score_to_table`] for a node `ply` moves below the root.
pub fn score_from_table(score: i32, ply: usize) -> i32 {
    let ply = ply.min(WIN as usize - WIN_THRESHOLD as usize) as i32;
    if score >= WIN_THRESHOLD {
        score - ply
    } else if score <= -WIN_THRESHOLD {
        score + ply
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardstate_core::TicTacToe;

    #[test]
    fn test_terminal_score() {
        let win = Some(Outcome::Winner(Player::One));
        assert_eq!(terminal_score(win, Player::One, 3), WIN - 3);
        assert_eq!(terminal_score(win, Player::Two, 3), -(WIN - 3));
        assert_eq!(terminal_score(Some(Outcome::Draw), Player::Two, 3), 0);
        assert!(terminal_score(win, Player::One, 1) > terminal_score(win, Player::One, 5));
    }

    #[test]
    fn test_table_scores_follow_the_node() {
        // Win found 3 plies below a node sitting at ply 2.
        let stored = score_to_table(WIN - 5, 2);
        assert_eq!(stored, WIN - 3);
        // The same node reached at ply 6 is a win 9 plies from that root.
        assert_eq!(score_from_table(stored, 6), WIN - 9);
        assert_eq!(score_from_table(score_to_table(-(WIN - 5), 2), 6), -(WIN - 9));
        assert_eq!(score_to_table(42, 7), 42);
        assert_eq!(score_from_table(-42, 7), -42);
    }

    #[test]
    fn test_closure_evaluator() {
        let machine = StateMachine::new(TicTacToe::new()).unwrap();
        let by_counter = |m: &StateMachine<TicTacToe>, p: Player| m.counters()[p.index()] * 10;
        assert_eq!(by_counter.evaluate(&machine, Player::One), 0);
        assert_eq!(TerminalEvaluator.evaluate(&machine, Player::One), 0);
    }
}
