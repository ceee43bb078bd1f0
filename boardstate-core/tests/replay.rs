//! Move histories survive a JSON round trip and replay to the same digest.

use boardstate_core::{Game, Gobblers, MoveRecord, StateMachine, TicTacToe};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Random self-play, returning the full executed history.
fn play_out<G: Game>(game: G, seed: u64) -> (StateMachine<G>, Vec<MoveRecord>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut machine = StateMachine::new(game).unwrap();
    let mut history = Vec::new();
    while !machine.is_game_over() && history.len() < 400 {
        let mv = machine.random_move(&mut rng).unwrap();
        if let Some(done) = machine.execute_with_confirm(&mv).unwrap() {
            history.push(mv);
            history.push(done);
        } else {
            history.push(mv);
        }
    }
    (machine, history)
}

fn check_replay<G: Game>(game: G, seed: u64) {
    let (live, history) = play_out(game.clone(), seed);

    let json = serde_json::to_string(&history).unwrap();
    let loaded: Vec<MoveRecord> = serde_json::from_str(&json).unwrap();
    assert_eq!(loaded, history);

    let replayed = StateMachine::replay(game, &loaded).unwrap();
    assert_eq!(replayed.digest(), live.digest());
    assert_eq!(replayed.move_number(), live.move_number());
    assert!(replayed.sameboard(&live).is_ok());
}

#[test]
fn test_tictactoe_history_replays() {
    for seed in 0..10 {
        check_replay(TicTacToe::new(), seed);
    }
}

#[test]
fn test_gobblers_history_replays() {
    for seed in 0..10 {
        check_replay(Gobblers::new(), seed);
    }
}

#[test]
fn test_history_wire_format() {
    let json = r#"[
        {"op":"PoolToBoard","player":"One","from":{"Pool":0},"to":{"Board":{"col":1,"row":1}}},
        {"op":"Done","player":"One"}
    ]"#;
    let moves: Vec<MoveRecord> = serde_json::from_str(json).unwrap();
    let machine = StateMachine::replay(TicTacToe::new(), &moves).unwrap();
    assert_eq!(machine.move_number(), 2);
    assert_eq!(machine.counters(), &[1, 0]);
}
