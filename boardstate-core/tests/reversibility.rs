//! Fuzzed make/unmake checks on reachable positions.
//!
//! Every legal move and every accepted gesture is executed and undone from
//! positions reached by random play. The digest and the field comparison
//! must both come back to where they started. Records the generator does
//! not produce must be refused and leave no trace.

use boardstate_core::{
    Game, Gobblers, Journal, Loc, MoveRecord, Phase, StateMachine, TicTacToe,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const GAMES: usize = 20;
const MAX_PLIES: usize = 60;

/// All cell addresses of the machine's graph.
fn all_locs<G: Game>(machine: &StateMachine<G>) -> Vec<Loc> {
    machine.graph().cells().iter().map(|c| c.loc()).collect()
}

/// Execute and undo `mv`, asserting the state is restored.
fn check_round_trip<G: Game>(machine: &mut StateMachine<G>, mv: &MoveRecord) {
    let before = machine.clone();
    let digest = machine.digest();
    let depth = machine.log_depth();

    machine
        .execute(mv)
        .unwrap_or_else(|e| panic!("{} rejected in {:?}: {}", mv, before.phase(), e));
    machine.unexecute(mv).unwrap();

    assert_eq!(machine.digest(), digest, "digest changed by {}", mv);
    assert!(machine.same_state(&before), "state changed by {}", mv);
    assert_eq!(machine.log_depth(), depth);
    assert!(machine.sameboard(&before).is_ok());
}

/// Try every pick the machine accepts, and every drop after it.
fn check_gestures<G: Game>(machine: &mut StateMachine<G>) {
    let player = machine.player();
    let locs = all_locs(machine);
    for &from in &locs {
        if !machine.can_pick(from) {
            continue;
        }
        let pick = MoveRecord::pick(player, from);
        check_round_trip(machine, &pick);

        machine.execute(&pick).unwrap();
        let targets: Vec<Loc> = locs.iter().copied().filter(|&l| machine.can_drop(l)).collect();
        let source = machine.floating().map(|(_, source)| source);
        assert!(source.is_some_and(|s| targets.contains(&s)), "unpick must be accepted");
        for to in targets {
            check_round_trip(machine, &MoveRecord::drop(player, to));
        }
        machine.unexecute(&pick).unwrap();
    }
}

/// Execute `mv`, which must be refused with the state untouched.
fn check_refused<G: Game>(machine: &mut StateMachine<G>, before: &StateMachine<G>, mv: &MoveRecord) {
    let result = machine.execute(mv);
    assert!(result.is_err(), "{} accepted in {:?}", mv, before.phase());
    assert_eq!(machine.log_depth(), before.log_depth(), "{} left log entries", mv);
    assert!(machine.sameboard(before).is_ok(), "{} changed the state", mv);
}

/// Composite records between every pair of cells, passes, early
/// confirmations, wrong-player copies and legal moves with a capture
/// bolted on. Whatever is not in `legal` must be refused.
fn check_ungenerated<G: Game, R: Rng>(machine: &mut StateMachine<G>, legal: &[MoveRecord], rng: &mut R) {
    let before = machine.clone();
    let player = machine.player();
    let locs = all_locs(machine);

    let mut records = vec![MoveRecord::pass(player), MoveRecord::done(player)];
    for &from in &locs {
        for &to in &locs {
            records.push(MoveRecord::pool_to_board(player, from, to));
            records.push(MoveRecord::board_to_board(player, from, to));
        }
    }
    for mv in legal {
        records.push(MoveRecord {
            player: player.opponent(),
            ..mv.clone()
        });
        if mv.to.is_some() {
            let victim = locs[rng.random_range(0..locs.len())];
            records.push(mv.clone().with_captures(vec![victim]));
        }
    }

    for mv in records.iter().filter(|mv| !legal.contains(mv)) {
        check_refused(machine, &before, mv);
    }
}

/// Random play that tries non-generated records at every ply.
fn fuzz_refusals<G: Game>(game: G, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut machine = StateMachine::with_journal(game, Journal::Retained).unwrap();

    for _ in 0..GAMES / 2 {
        machine.reset().unwrap();
        while !machine.is_game_over() && machine.move_number() as usize <= MAX_PLIES {
            let moves = machine.legal_moves();
            check_ungenerated(&mut machine, &moves, &mut rng);
            let mv = &moves[rng.random_range(0..moves.len())];
            machine.execute(mv).unwrap();
        }
    }
}

fn fuzz<G: Game>(game: G, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut machine = StateMachine::with_journal(game, Journal::Retained).unwrap();

    for _ in 0..GAMES {
        machine.reset().unwrap();
        for _ in 0..MAX_PLIES {
            if machine.is_game_over() {
                break;
            }
            let moves = machine.legal_moves();
            assert!(!moves.is_empty(), "no moves in {:?}", machine.phase());
            for mv in &moves {
                check_round_trip(&mut machine, mv);
            }
            if machine.phase() != Phase::DrawPending {
                check_gestures(&mut machine);
            }

            let mv = &moves[rng.random_range(0..moves.len())];
            machine.execute(mv).unwrap();
        }
    }
}

#[test]
fn test_tictactoe_moves_reverse() {
    fuzz(TicTacToe::new(), 1);
}

#[test]
fn test_gobblers_moves_reverse() {
    fuzz(Gobblers::new(), 2);
}

#[test]
fn test_tictactoe_refuses_ungenerated() {
    fuzz_refusals(TicTacToe::new(), 4);
}

#[test]
fn test_gobblers_refuses_ungenerated() {
    fuzz_refusals(Gobblers::new(), 5);
}

#[test]
fn test_whole_game_unwinds() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut machine = StateMachine::with_journal(Gobblers::new(), Journal::Retained).unwrap();
    let start = machine.clone();

    let mut history = Vec::new();
    while !machine.is_game_over() && history.len() < 200 {
        let mv = machine.random_move(&mut rng).unwrap();
        machine.execute(&mv).unwrap();
        history.push(mv);
    }
    for mv in history.iter().rev() {
        machine.unexecute(mv).unwrap();
    }
    assert_eq!(machine.digest(), start.digest());
    assert!(machine.same_state(&start));
    assert_eq!(machine.move_number(), 1);
}

#[test]
fn test_unexecute_to_depth() {
    let mut machine = StateMachine::with_journal(TicTacToe::new(), Journal::Retained).unwrap();
    let start = machine.clone();
    let depth = machine.log_depth();

    for (col, row) in [(0, 0), (1, 1), (2, 2)] {
        let player = machine.player();
        let mv = MoveRecord::pool_to_board(player, TicTacToe::pool(player), Loc::board(col, row));
        machine.execute_with_confirm(&mv).unwrap();
    }
    assert_eq!(machine.counters(), &[2, 1]);

    machine.unexecute_to(depth).unwrap();
    assert!(machine.sameboard(&start).is_ok());
    assert!(machine.unexecute_to(depth + 1).is_err());
}
