//! Reads and writes single games in [Portable Game Notation] (PGN).
//!
//! Parsing extracts tag pairs and the SAN tokens of the main line: move
//! numbers, comments, variations and numeric annotation glyphs are skipped.
//! Replaying the tokens turns them into a [`GameState`].
//!
//! [Portable Game Notation]: https://www.chessprogramming.org/Portable_Game_Notation

use std::collections::BTreeMap;
use std::fmt::Write;
use std::iter::Peekable;
use std::str::Chars;

use log::{debug, warn};

use crate::chess::core::Player;
use crate::chess::position::{GameStatus, Position};
use crate::game::GameState;
use crate::notation::{san, NotationError};

/// Game termination markers.
pub const RESULTS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

/// Movetext lines of exported games do not exceed this width.
const LINE_WIDTH: usize = 80;

/// What to do with a SAN token that does not resolve to a legal move.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReplayPolicy {
    /// Stop and report the failing token.
    #[default]
    Abort,
    /// Log the failing token and continue with the next one.
    SkipInvalid,
}

/// Tag pairs and main line of a single game.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pgn {
    /// Tag pairs such as `[Event "F/S Return Match"]`.
    pub tags: BTreeMap<String, String>,
    /// SAN tokens of the main line in the order they were played.
    pub moves: Vec<String>,
    /// Game termination marker, if present.
    pub result: Option<String>,
}

impl Pgn {
    /// Parses the first game of the input.
    ///
    /// ```
    /// use kibitz::notation::pgn::Pgn;
    ///
    /// let pgn = Pgn::parse("[White \"Tal\"]\n\n1. e4 {Best by test} e5 (1... c5) 2.Nf3 *").unwrap();
    /// assert_eq!(pgn.tags["White"], "Tal");
    /// assert_eq!(pgn.moves, vec!["e4", "e5", "Nf3"]);
    /// assert_eq!(pgn.result.as_deref(), Some("*"));
    /// ```
    pub fn parse(text: &str) -> Result<Self, NotationError> {
        let mut pgn = Self::default();
        let mut chars = text.chars().peekable();
        let mut line_start = true;
        while let Some(&symbol) = chars.peek() {
            match symbol {
                '\n' => {
                    line_start = true;
                    let _ = chars.next();
                    continue;
                },
                _ if symbol.is_whitespace() => {
                    let _ = chars.next();
                    continue;
                },
                '[' => {
                    let _ = chars.next();
                    let (name, value) = parse_tag(&mut chars)?;
                    let _ = pgn.tags.insert(name, value);
                },
                '{' => {
                    let _ = chars.next();
                    skip_comment(&mut chars)?;
                },
                // Rest-of-line comment and escape lines.
                ';' => skip_line(&mut chars),
                '%' if line_start => skip_line(&mut chars),
                '(' => {
                    let _ = chars.next();
                    skip_variation(&mut chars)?;
                },
                ')' => return Err(malformed("unexpected ')'")),
                '}' => return Err(malformed("unexpected '}'")),
                '$' => {
                    let _ = chars.next();
                    while chars.next_if(char::is_ascii_digit).is_some() {}
                },
                _ => {
                    let word = read_word(&mut chars);
                    if RESULTS.contains(&word.as_str()) {
                        pgn.result = Some(word);
                        // Anything after the result belongs to the next game.
                        break;
                    }
                    let token = strip_move_number(&word);
                    if !token.is_empty() {
                        pgn.moves.push(token.to_string());
                    }
                },
            }
            line_start = false;
        }
        Ok(pgn)
    }

    /// The position the game starts from: the standard one unless the `FEN`
    /// tag says otherwise.
    pub fn starting_position(&self) -> Result<Position, NotationError> {
        let set_up = self.tags.get("SetUp").map(String::as_str);
        match (set_up, self.tags.get("FEN")) {
            (Some("0"), _) | (_, None) => Ok(Position::starting()),
            (_, Some(fen)) => Position::try_from(fen.as_str()).map_err(|error| {
                NotationError::InvalidFen {
                    fen: fen.clone(),
                    reason: format!("{error:#}"),
                }
            }),
        }
    }

    /// Plays the main line from the starting position.
    ///
    /// With [`ReplayPolicy::Abort`] the first token that does not resolve to
    /// a legal move fails the whole replay: the error carries the 1-based ply
    /// and the token, and no partially replayed game is returned.
    pub fn replay(&self, policy: ReplayPolicy) -> Result<GameState, NotationError> {
        let mut state = GameState::from_position(self.starting_position()?);
        for (index, token) in self.moves.iter().enumerate() {
            let ply = index + 1;
            match play_token(&state, token) {
                Ok(next) => state = next,
                Err(reason) => match policy {
                    ReplayPolicy::Abort => {
                        return Err(NotationError::Replay {
                            ply,
                            token: token.clone(),
                            reason: Box::new(reason),
                        });
                    },
                    ReplayPolicy::SkipInvalid => {
                        warn!("skipped ply {ply} '{token}': {reason}");
                    },
                },
            }
        }
        debug!("replayed {} of {} moves", state.cursor(), self.moves.len());
        Ok(state)
    }
}

/// Plays a single SAN token. Every token past the end of the game fails, even
/// when the final position still has legal moves.
fn play_token(state: &GameState, token: &str) -> Result<GameState, NotationError> {
    if state.status().is_over() {
        return Err(NotationError::GameOver(token.to_string()));
    }
    let next_move = san::from_san(state.position(), token)?;
    state
        .try_apply_move(&next_move)
        .ok_or_else(|| NotationError::NoLegalMove(token.to_string()))
}

fn malformed(reason: &str) -> NotationError {
    NotationError::MalformedPgn(reason.to_string())
}

/// Reads `Name "Value"]` after the opening bracket.
fn parse_tag(chars: &mut Peekable<Chars<'_>>) -> Result<(String, String), NotationError> {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
    let mut name = String::new();
    while let Some(symbol) = chars.next_if(|c| c.is_alphanumeric() || *c == '_') {
        name.push(symbol);
    }
    if name.is_empty() {
        return Err(malformed("tag pair without a name"));
    }
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
    if chars.next() != Some('"') {
        return Err(malformed(&format!("tag {name} has no quoted value")));
    }
    let mut value = String::new();
    loop {
        match chars.next() {
            Some('"') => break,
            Some('\\') => match chars.next() {
                Some(escaped) => value.push(escaped),
                None => return Err(malformed(&format!("unterminated tag {name}"))),
            },
            Some(symbol) => value.push(symbol),
            None => return Err(malformed(&format!("unterminated tag {name}"))),
        }
    }
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
    if chars.next() != Some(']') {
        return Err(malformed(&format!("unterminated tag {name}")));
    }
    Ok((name, value))
}

fn skip_comment(chars: &mut Peekable<Chars<'_>>) -> Result<(), NotationError> {
    if chars.any(|c| c == '}') {
        Ok(())
    } else {
        Err(malformed("unterminated comment"))
    }
}

fn skip_line(chars: &mut Peekable<Chars<'_>>) {
    let _ = chars.any(|c| c == '\n');
}

/// Skips a recursive annotation variation after the opening parenthesis,
/// including nested variations and comments.
fn skip_variation(chars: &mut Peekable<Chars<'_>>) -> Result<(), NotationError> {
    let mut depth = 1;
    while depth > 0 {
        match chars.next() {
            Some('(') => depth += 1,
            Some(')') => depth -= 1,
            Some('{') => skip_comment(chars)?,
            Some(';') => skip_line(chars),
            Some(_) => {},
            None => return Err(malformed("unterminated variation")),
        }
    }
    Ok(())
}

fn read_word(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut word = String::new();
    while let Some(symbol) =
        chars.next_if(|c| !c.is_whitespace() && !matches!(c, '[' | ']' | '{' | '}' | '(' | ')' | ';'))
    {
        word.push(symbol);
    }
    word
}

/// Removes the move number indication: `12.`, `12...` or `12.Nf3`.
fn strip_move_number(word: &str) -> &str {
    let digits = word.len() - word.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let rest = &word[digits..];
    if digits > 0 && rest.starts_with('.') {
        rest.trim_start_matches('.')
    } else if digits == 0 && word.chars().all(|c| c == '.') {
        ""
    } else {
        word
    }
}

/// Reads a game and replays it with the default policy.
pub fn import(text: &str) -> Result<GameState, NotationError> {
    Pgn::parse(text)?.replay(ReplayPolicy::default())
}

/// Termination marker matching the status of the visible position.
#[must_use]
pub fn result_token(state: &GameState) -> &'static str {
    match state.status() {
        GameStatus::Checkmate => match state.current_player() {
            Player::White => "0-1",
            Player::Black => "1-0",
        },
        GameStatus::Stalemate | GameStatus::InsufficientMaterial => "1/2-1/2",
        GameStatus::Ongoing => "*",
    }
}

/// Exports the moves leading to the visible position with placeholder
/// values for the Seven Tag Roster.
#[must_use]
pub fn export(state: &GameState) -> String {
    export_with_tags(state, &[])
}

/// Exports the moves leading to the visible position. `tags` override the
/// Seven Tag Roster placeholders or are appended after them.
///
/// ```
/// use kibitz::chess::core::Square;
/// use kibitz::game::{GameState, MoveRequest};
/// use kibitz::notation::pgn;
///
/// let MoveRequest::Applied(state) = GameState::new().request_move(Square::E2, Square::E4) else {
///     panic!("e2e4 is legal");
/// };
/// let exported = pgn::export_with_tags(&state, &[("White", "Morphy")]);
/// assert!(exported.contains("[White \"Morphy\"]"));
/// assert!(exported.ends_with("1. e4 *\n"));
/// ```
#[must_use]
pub fn export_with_tags(state: &GameState, tags: &[(&str, &str)]) -> String {
    let mut roster: Vec<(String, String)> = [
        ("Event", "?"),
        ("Site", "?"),
        ("Date", "????.??.??"),
        ("Round", "?"),
        ("White", "?"),
        ("Black", "?"),
        ("Result", result_token(state)),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value.to_string()))
    .collect();
    let initial = state.initial_position();
    if *initial != Position::starting() {
        roster.push(("SetUp".to_string(), "1".to_string()));
        roster.push(("FEN".to_string(), initial.to_string()));
    }
    for &(name, value) in tags {
        match roster.iter_mut().find(|(existing, _)| existing == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => roster.push((name.to_string(), value.to_string())),
        }
    }

    let mut output = String::new();
    for (name, value) in &roster {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        let _ = writeln!(output, "[{name} \"{escaped}\"]");
    }
    output.push('\n');

    let mut tokens = Vec::new();
    let mut position = *initial;
    for (index, entry) in state.applied().iter().enumerate() {
        let number = position.fullmove_counter();
        match position.side_to_move() {
            Player::White => tokens.push(format!("{number}.")),
            Player::Black if index == 0 => tokens.push(format!("{number}...")),
            Player::Black => {},
        }
        tokens.push(san::to_san(&position, &entry.played));
        position = entry.position;
    }
    let result = roster
        .iter()
        .find(|(name, _)| name == "Result")
        .map_or_else(|| result_token(state).to_string(), |(_, value)| value.clone());
    tokens.push(result);

    let mut line_length = 0;
    for token in tokens {
        if line_length > 0 && line_length + 1 + token.len() > LINE_WIDTH {
            output.push('\n');
            line_length = 0;
        }
        if line_length > 0 {
            output.push(' ');
            line_length += 1;
        }
        output.push_str(&token);
        line_length += token.len();
    }
    output.push('\n');
    output
}
