//! Text front-end over a single [`GameState`]: reads one command per line and
//! writes the response to the output stream.
//!
//! [`Session::run`] is the main loop. Commands that can not be applied (an
//! illegal move, a malformed FEN, an unreadable PGN file) are reported to the
//! output and the session carries on with the previous state. Only I/O errors
//! stop the loop.

use std::fs;
use std::io::{BufRead, Write};

use anyhow::Context;
use itertools::Itertools;
use log::{debug, info};

use crate::chess::core::{Player, Square};
use crate::chess::position::Position;
use crate::game::{GameState, MoveRequest};
use crate::notation::pgn::{Pgn, ReplayPolicy};
use crate::notation::san;
use crate::session::command::Command;

mod command;

const HELP: &str = "\
commands:
  new | restart                      start over from the standard or initial position
  position [startpos | fen <FEN>]    set up a position
  select <square>                    list legal destinations of a piece
  move <from><to>[q|r|b|n]           play a move given by its squares
  san <move>                         play a move in algebraic notation
  promote <q|r|b|n>                  finish a pending promotion
  undo | redo | goto <ply>           walk the history
  d | status | history | captured    inspect the game
  pgn | load <path>                  export or import a game
  version | help | quit";

/// Owns the game and the I/O streams of an interactive session.
pub struct Session<'a, R: BufRead, W: Write> {
    state: GameState,
    /// Squares of a move waiting for the promotion piece.
    pending_promotion: Option<(Square, Square)>,
    replay_policy: ReplayPolicy,
    input: &'a mut R,
    output: &'a mut W,
}

impl<'a, R: BufRead, W: Write> Session<'a, R, W> {
    /// Creates a session with a new game and provided I/O.
    #[must_use]
    pub fn new(input: &'a mut R, output: &'a mut W) -> Self {
        Self::with_state(GameState::new(), input, output)
    }

    /// Creates a session continuing an existing game.
    #[must_use]
    pub fn with_state(state: GameState, input: &'a mut R, output: &'a mut W) -> Self {
        Self {
            state,
            pending_promotion: None,
            replay_policy: ReplayPolicy::default(),
            input,
            output,
        }
    }

    /// Sets how `load` treats moves of the PGN that can not be played.
    #[must_use]
    pub const fn with_replay_policy(mut self, policy: ReplayPolicy) -> Self {
        self.replay_policy = policy;
        self
    }

    /// The game as of the last processed command.
    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Reads and executes commands until `quit` or the end of input.
    pub fn run(&mut self) -> anyhow::Result<()> {
        info!("session started: {}", self.state.position());
        loop {
            let mut line = String::new();
            if self
                .input
                .read_line(&mut line)
                .context("reading the next command")?
                == 0
            {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            debug!("command: {}", line.trim());
            match Command::parse(&line) {
                Command::Quit => break,
                command => self.execute(command)?,
            }
            self.output.flush()?;
        }
        info!(
            "session finished after {} moves: {}",
            self.state.cursor(),
            self.state.status()
        );
        Ok(())
    }

    fn execute(&mut self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::NewGame => self.replace(GameState::new()),
            Command::Restart => self.replace(self.state.restart()),
            Command::SetPosition { fen } => self.handle_position(fen.as_deref())?,
            Command::Select(square) => self.handle_select(square)?,
            Command::Move(uci) => match uci.promotion {
                Some(promotion) => {
                    let next = self.state.try_complete_promotion(uci.from, uci.to, promotion);
                    self.report_applied(next, &format!("{}{}{promotion}", uci.from, uci.to))?;
                },
                None => self.handle_request(uci.from, uci.to)?,
            },
            Command::San(token) if self.state.status().is_over() => {
                writeln!(self.output, "illegal move {token}: the game is over")?;
            },
            Command::San(token) => match san::from_san(self.state.position(), &token) {
                Ok(next_move) => {
                    let next = self.state.try_apply_move(&next_move);
                    self.report_applied(next, &token)?;
                },
                Err(error) => writeln!(self.output, "error: {error}")?,
            },
            Command::Promote(promotion) => match self.pending_promotion {
                Some((from, to)) => {
                    let next = self.state.try_complete_promotion(from, to, promotion);
                    self.report_applied(next, &format!("{from}{to}{promotion}"))?;
                },
                None => writeln!(self.output, "error: no promotion is pending")?,
            },
            Command::Undo => self.walk(self.state.undo())?,
            Command::Redo => self.walk(self.state.redo())?,
            Command::Goto(ply) if ply <= self.state.history().len() => {
                self.walk(self.state.jump_to(ply))?;
            },
            Command::Goto(ply) => writeln!(
                self.output,
                "error: ply {ply} is out of range 0..={}",
                self.state.history().len()
            )?,
            Command::Display => write!(self.output, "{:?}", self.state.position())?,
            Command::Status => self.handle_status()?,
            Command::History => self.handle_history()?,
            Command::Captured => self.handle_captured()?,
            Command::Pgn => write!(self.output, "{}", self.state.to_pgn())?,
            Command::Load(path) => self.handle_load(&path)?,
            Command::Version => writeln!(self.output, "{}", crate::engine_version())?,
            Command::Help => writeln!(self.output, "{HELP}")?,
            // Handled by the loop.
            Command::Quit => {},
            Command::Unknown(command) => {
                writeln!(self.output, "unknown command: {command}")?;
            },
        }
        Ok(())
    }

    fn replace(&mut self, state: GameState) {
        self.state = state;
        self.pending_promotion = None;
    }

    fn handle_position(&mut self, fen: Option<&str>) -> anyhow::Result<()> {
        let position = match fen {
            None => Ok(Position::starting()),
            Some(fen) => Position::try_from(fen),
        };
        match position {
            Ok(position) => {
                self.replace(GameState::from_position(position));
                writeln!(self.output, "position {position}")?;
            },
            Err(error) => writeln!(self.output, "error: {error:#}")?,
        }
        Ok(())
    }

    fn handle_select(&mut self, square: Square) -> anyhow::Result<()> {
        self.state = self.state.select_square(square);
        if self.state.selected_square().is_none() {
            writeln!(self.output, "nothing to select on {square}")?;
        } else {
            writeln!(
                self.output,
                "moves: {}",
                self.state.possible_moves().iter().join(" ")
            )?;
        }
        Ok(())
    }

    fn handle_request(&mut self, from: Square, to: Square) -> anyhow::Result<()> {
        match self.state.request_move(from, to) {
            MoveRequest::Applied(next) => {
                self.report_applied(Some(next), &format!("{from}{to}"))?;
            },
            MoveRequest::PendingPromotion { from, to } => {
                self.pending_promotion = Some((from, to));
                writeln!(self.output, "promote {from}{to} to: q r b n")?;
            },
            MoveRequest::Rejected => writeln!(self.output, "illegal move {from}{to}")?,
        }
        Ok(())
    }

    /// Prints the SAN of the move that produced `next` and keeps it, or
    /// reports `attempt` as illegal if the move was rejected.
    fn report_applied(&mut self, next: Option<GameState>, attempt: &str) -> anyhow::Result<()> {
        let Some(next) = next else {
            writeln!(self.output, "illegal move {attempt}")?;
            return Ok(());
        };
        let played = next.applied().last().map(|entry| entry.played);
        match played {
            Some(played) => {
                let played = san::to_san(self.state.position(), &played);
                self.replace(next);
                writeln!(self.output, "played {played}")?;
                if self.state.status().is_over() {
                    writeln!(self.output, "game over: {}", self.state.status())?;
                }
            },
            None => writeln!(self.output, "illegal move {attempt}")?,
        }
        Ok(())
    }

    fn walk(&mut self, next: GameState) -> anyhow::Result<()> {
        self.replace(next);
        writeln!(
            self.output,
            "ply {}/{}: {}",
            self.state.cursor(),
            self.state.history().len(),
            self.state.position()
        )?;
        Ok(())
    }

    fn handle_status(&mut self) -> anyhow::Result<()> {
        write!(
            self.output,
            "{} ({} to move)",
            self.state.status(),
            player_name(self.state.current_player())
        )?;
        if let Some(king) = self.state.checked_king() {
            write!(self.output, ", king in check on {king}")?;
        }
        writeln!(self.output)?;
        Ok(())
    }

    fn handle_history(&mut self) -> anyhow::Result<()> {
        for pair in self.state.move_pairs() {
            match (pair.white, pair.black) {
                (Some(white), Some(black)) => {
                    writeln!(self.output, "{}. {white} {black}", pair.number)?;
                },
                (Some(white), None) => writeln!(self.output, "{}. {white}", pair.number)?,
                (None, Some(black)) => writeln!(self.output, "{}... {black}", pair.number)?,
                (None, None) => {},
            }
        }
        writeln!(
            self.output,
            "ply {}/{}",
            self.state.cursor(),
            self.state.history().len()
        )?;
        Ok(())
    }

    fn handle_captured(&mut self) -> anyhow::Result<()> {
        let captured = self.state.captured_pieces();
        for player in [Player::White, Player::Black] {
            // Pieces captured by the player belong to the opponent.
            let pieces = captured
                .iter()
                .filter(|piece| piece.owner != player)
                .join("");
            writeln!(
                self.output,
                "{}: {pieces} ({})",
                player_name(player),
                self.state.captured_value(player)
            )?;
        }
        writeln!(self.output, "balance: {}", self.state.material_balance())?;
        Ok(())
    }

    fn handle_load(&mut self, path: &str) -> anyhow::Result<()> {
        let loaded = fs::read_to_string(path)
            .with_context(|| format!("reading {path}"))
            .and_then(|text| Ok(Pgn::parse(&text)?.replay(self.replay_policy)?));
        match loaded {
            Ok(state) => {
                info!("loaded {} moves from {path}", state.cursor());
                self.replace(state);
                writeln!(
                    self.output,
                    "loaded {} moves: {}",
                    self.state.cursor(),
                    self.state.position()
                )?;
            },
            Err(error) => writeln!(self.output, "error: {error:#}")?,
        }
        Ok(())
    }
}

const fn player_name(player: Player) -> &'static str {
    match player {
        Player::White => "white",
        Player::Black => "black",
    }
}
