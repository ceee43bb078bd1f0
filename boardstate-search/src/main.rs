//! Self-play between two search engines.
//!
//! ```text
//! boardstate --game gobblers --first alpha-beta --second uct --time-ms 500
//! ```
//!
//! After the game the recorded history is replayed on a fresh machine and
//! compared with the live one.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use boardstate_core::{Game, Gobblers, MoveRecord, Player, StateMachine, TicTacToe};
use boardstate_search::{build_engine, spawn_search, Budget, EngineKind, GameKind, SearchConfig};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "boardstate", about = "Self-play between boardstate search engines")]
struct Args {
    #[arg(long, value_enum, default_value_t = GameKind::TicTacToe)]
    game: GameKind,

    /// Engine for the first player
    #[arg(long, value_enum, default_value_t = EngineKind::AlphaBeta)]
    first: EngineKind,

    /// Engine for the second player
    #[arg(long, value_enum, default_value_t = EngineKind::Uct)]
    second: EngineKind,

    /// TOML search configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Per-move time budget in milliseconds (0 = unlimited)
    #[arg(long)]
    time_ms: Option<u64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Alpha-beta depth limit
    #[arg(long)]
    depth: Option<u32>,

    /// UCT playouts per move
    #[arg(long)]
    playouts: Option<u64>,

    /// Stop after this many moves
    #[arg(long, default_value_t = 200)]
    max_moves: usize,
}

impl Args {
    fn search_config(&self) -> Result<SearchConfig> {
        let mut config = match &self.config {
            Some(path) => SearchConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => SearchConfig::default(),
        };
        if let Some(ms) = self.time_ms {
            config.time_limit_ms = ms;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(depth) = self.depth {
            config.alphabeta.max_depth = depth;
        }
        if let Some(playouts) = self.playouts {
            config.uct.max_playouts = playouts;
        }
        Ok(config)
    }

    fn engine_for(&self, player: Player) -> EngineKind {
        match player {
            Player::One => self.first,
            Player::Two => self.second,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = args.search_config()?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl-C handler")?;

    match args.game {
        GameKind::TicTacToe => self_play(TicTacToe::new(), &args, &config, &running),
        GameKind::Gobblers => self_play(Gobblers::new(), &args, &config, &running),
    }
}

fn self_play<G: Game>(
    game: G,
    args: &Args,
    config: &SearchConfig,
    running: &Arc<AtomicBool>,
) -> Result<()> {
    let mut live = StateMachine::new(game.clone())?;
    let mut history: Vec<MoveRecord> = Vec::new();
    let started = Instant::now();
    info!(
        game = game.name(),
        first = ?args.first,
        second = ?args.second,
        time_ms = config.time_limit_ms,
        "starting self-play"
    );

    let mut plies = 0;
    while !live.is_game_over() && plies < args.max_moves {
        if !running.load(Ordering::SeqCst) {
            warn!(plies, "interrupted");
            break;
        }
        let player = live.player();
        let kind = args.engine_for(player);
        let budget = Budget::new(Arc::clone(running), config.time_limit());
        let handle = spawn_search(&live, build_engine::<G>(kind, config), budget)?;
        let report = handle.join()?;
        if !running.load(Ordering::SeqCst) {
            warn!(plies, "interrupted");
            break;
        }

        let confirm = live
            .execute_with_confirm(&report.best_move)
            .with_context(|| format!("engine {:?} played {}", kind, report.best_move))?;
        info!(
            ply = plies + 1,
            engine = ?kind,
            mv = %report.best_move,
            score = ?report.score,
            depth = report.depth,
            nodes = report.nodes,
            ms = report.elapsed.as_millis() as u64,
            "move"
        );
        history.push(report.best_move);
        history.extend(confirm);
        plies += 1;
    }

    println!("{}", live);
    match live.outcome() {
        Some(outcome) => println!("Result: {}", outcome),
        None => println!("Result: unfinished after {} moves", plies),
    }
    println!("Time: {:.2}s", started.elapsed().as_secs_f64());

    let replayed = StateMachine::replay(game, &history).context("replaying history")?;
    if let Err(err) = replayed.sameboard(&live) {
        bail!("replay disagrees with live board: {}", err);
    }
    let digest = format!("{:#018x}", live.digest());
    info!(moves = history.len(), digest = %digest, "replay verified");
    Ok(())
}
