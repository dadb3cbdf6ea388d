//! Textual move and game representations: [Standard Algebraic Notation] (SAN)
//! for single moves and [Portable Game Notation] (PGN) for whole games.
//!
//! [Standard Algebraic Notation]: https://www.chessprogramming.org/Algebraic_Chess_Notation#Standard_Algebraic_Notation_.28SAN.29
//! [Portable Game Notation]: https://www.chessprogramming.org/Portable_Game_Notation

pub mod pgn;
pub mod san;

/// Failure to read a SAN move or a PGN game. Unlike rejected move requests,
/// these are reported to the caller so that the board never silently diverges
/// from the input.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NotationError {
    #[error("malformed SAN move '{0}'")]
    Malformed(String),
    #[error("no legal move matches '{0}'")]
    NoLegalMove(String),
    #[error("'{0}' matches more than one legal move")]
    Ambiguous(String),
    #[error("'{0}' has to specify the promotion piece")]
    MissingPromotion(String),
    #[error("'{0}' is played after the game is over")]
    GameOver(String),
    #[error("malformed PGN: {0}")]
    MalformedPgn(String),
    #[error("invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },
    #[error("ply {ply}: can not play '{token}'")]
    Replay {
        ply: usize,
        token: String,
        #[source]
        reason: Box<NotationError>,
    },
}
