//! Line-based commands understood by [`super::Session`].

use crate::chess::core::{Promotion, Square};
use crate::chess::moves::UciMove;

#[derive(Debug, PartialEq, Eq)]
pub(super) enum Command {
    NewGame,
    Restart,
    SetPosition { fen: Option<String> },
    Select(Square),
    Move(UciMove),
    San(String),
    Promote(Promotion),
    Undo,
    Redo,
    Goto(usize),
    Display,
    Status,
    History,
    Captured,
    Pgn,
    Load(String),
    Version,
    Help,
    Quit,
    Unknown(String),
}

fn parse_setposition(parts: &[&str]) -> Command {
    match parts.get(1) {
        Some(&"startpos") if parts.len() == 2 => Command::SetPosition { fen: None },
        Some(&"fen") if parts.len() > 2 => Command::SetPosition {
            fen: Some(parts[2..].join(" ")),
        },
        _ => Command::Unknown(parts.join(" ")),
    }
}

impl Command {
    pub(super) fn parse(input: &str) -> Self {
        let parts: Vec<&str> = input.split_whitespace().collect();

        let Some(&first) = parts.first() else {
            return Self::Unknown(input.to_string());
        };
        let argument = parts.get(1).copied();
        let unknown = || Self::Unknown(input.trim().to_string());

        match (first, argument, parts.len()) {
            ("new", None, _) => Self::NewGame,
            ("restart", None, _) => Self::Restart,
            ("position", _, _) => parse_setposition(&parts),
            ("select", Some(square), 2) => Square::try_from(square).map_or_else(|_| unknown(), Self::Select),
            ("move", Some(uci), 2) => UciMove::try_from(uci).map_or_else(|_| unknown(), Self::Move),
            ("san", Some(token), 2) => Self::San(token.to_string()),
            ("promote", Some(piece), 2) => match piece.chars().collect::<Vec<_>>().as_slice() {
                [symbol] => Promotion::try_from(*symbol).map_or_else(|_| unknown(), Self::Promote),
                _ => unknown(),
            },
            ("undo", None, _) => Self::Undo,
            ("redo", None, _) => Self::Redo,
            ("goto", Some(ply), 2) => ply.parse().map_or_else(|_| unknown(), Self::Goto),
            ("d", None, _) => Self::Display,
            ("status", None, _) => Self::Status,
            ("history", None, _) => Self::History,
            ("captured", None, _) => Self::Captured,
            ("pgn", None, _) => Self::Pgn,
            // Paths may contain spaces.
            ("load", Some(_), _) => Self::Load(parts[1..].join(" ")),
            ("version", None, _) => Self::Version,
            ("help", None, _) => Self::Help,
            ("quit", None, _) => Self::Quit,
            _ => unknown(),
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_game_control() {
        assert_eq!(Command::parse("new"), Command::NewGame);
        assert_eq!(Command::parse("restart\n"), Command::Restart);
        assert_eq!(Command::parse("  undo  "), Command::Undo);
        assert_eq!(Command::parse("redo"), Command::Redo);
        assert_eq!(Command::parse("goto 12"), Command::Goto(12));
        assert_eq!(Command::parse("quit"), Command::Quit);
    }

    #[test]
    fn parse_position() {
        assert_eq!(
            Command::parse("position startpos"),
            Command::SetPosition { fen: None }
        );
        assert_eq!(
            Command::parse("position fen 4k3/8/8/8/8/8/4P3/4K3 w - - 0 1"),
            Command::SetPosition {
                fen: Some("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1".to_string())
            }
        );
        assert_eq!(
            Command::parse("position"),
            Command::Unknown("position".to_string())
        );
        assert_eq!(
            Command::parse("position startpos moves e2e4"),
            Command::Unknown("position startpos moves e2e4".to_string())
        );
    }

    #[test]
    fn parse_moves() {
        assert_eq!(Command::parse("select e2"), Command::Select(Square::E2));
        assert_eq!(
            Command::parse("move e7e8q"),
            Command::Move(UciMove {
                from: Square::E7,
                to: Square::E8,
                promotion: Some(Promotion::Queen),
            })
        );
        assert_eq!(Command::parse("san Nf3"), Command::San("Nf3".to_string()));
        assert_eq!(Command::parse("promote N"), Command::Promote(Promotion::Knight));
        assert_eq!(
            Command::parse("promote k"),
            Command::Unknown("promote k".to_string())
        );
        assert_eq!(
            Command::parse("select i9"),
            Command::Unknown("select i9".to_string())
        );
        assert_eq!(
            Command::parse("move e2"),
            Command::Unknown("move e2".to_string())
        );
    }

    #[test]
    fn parse_queries() {
        assert_eq!(Command::parse("d"), Command::Display);
        assert_eq!(Command::parse("status"), Command::Status);
        assert_eq!(Command::parse("history"), Command::History);
        assert_eq!(Command::parse("captured"), Command::Captured);
        assert_eq!(Command::parse("pgn"), Command::Pgn);
        assert_eq!(Command::parse("version"), Command::Version);
        assert_eq!(
            Command::parse("load games/my game.pgn"),
            Command::Load("games/my game.pgn".to_string())
        );
        assert_eq!(Command::parse(""), Command::Unknown(String::new()));
        assert_eq!(
            Command::parse("undo twice"),
            Command::Unknown("undo twice".to_string())
        );
    }
}
