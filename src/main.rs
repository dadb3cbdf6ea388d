use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use kibitz::chess::position::Position;
use kibitz::game::GameState;
use kibitz::notation::pgn::{Pgn, ReplayPolicy};
use kibitz::Session;

/// Plays and inspects a chess game through line-based commands on stdin.
/// Type `help` for the list of commands.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Config {
    /// Starts from the position given in Forsyth-Edwards Notation.
    #[arg(long, conflicts_with = "pgn")]
    fen: Option<String>,
    /// Starts from the game stored in the PGN file.
    #[arg(long)]
    pgn: Option<PathBuf>,
    /// Skips moves that can not be played when replaying PGN instead of
    /// failing.
    #[arg(long)]
    skip_invalid: bool,
    /// Does not print the banner.
    #[arg(long, short)]
    quiet: bool,
}

impl Config {
    const fn replay_policy(&self) -> ReplayPolicy {
        if self.skip_invalid {
            ReplayPolicy::SkipInvalid
        } else {
            ReplayPolicy::Abort
        }
    }

    fn initial_state(&self) -> anyhow::Result<GameState> {
        if let Some(fen) = &self.fen {
            return Ok(GameState::from_position(Position::try_from(fen.as_str())?));
        }
        if let Some(path) = &self.pgn {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let state = Pgn::parse(&text)?.replay(self.replay_policy())?;
            return Ok(state);
        }
        Ok(GameState::new())
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Config::parse();
    let state = config.initial_state()?;
    if !config.quiet {
        kibitz::print_engine_info();
        kibitz::print_binary_info();
    }

    let mut input = io::stdin().lock();
    let mut output = io::stdout().lock();
    let mut session = Session::with_state(state, &mut input, &mut output)
        .with_replay_policy(config.replay_policy());
    session.run()
}
