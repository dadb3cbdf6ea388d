//! Move representation. A move is the only way to mutate
//! [`crate::chess::position::Position`] and change the board state.
//!
//! For a move to be serialized in Standard Algebraic Notation (SAN), it also
//! requires the [`crate::chess::position::Position`] it will be applied in,
//! because SAN requires additional flags (e.g. indicating "check"/"checkmate"
//! or moving piece disambiguation). See [`crate::notation::san`].

use std::fmt;

use anyhow::bail;

use crate::chess::core::{CastlingSide, Piece, Promotion, Square};

/// Relocation of a single piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PieceMove {
    #[allow(missing_docs)]
    pub from: Square,
    #[allow(missing_docs)]
    pub to: Square,
}

/// Represents any kind of a legal chess move. `from` and `to` are always
/// distinct and `captured` is set iff a piece occupied the destination before
/// the move was made.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Move {
    Regular {
        from: Square,
        to: Square,
        captured: Option<Piece>,
    },
    /// A pawn reaching the last rank (possibly with a capture) and turning
    /// into a queen, rook, bishop or knight.
    Promotion {
        from: Square,
        to: Square,
        promotion: Promotion,
        captured: Option<Piece>,
    },
    /// King and rook relocate together. Technically, castling is a king move,
    /// so [`Move::from`] and [`Move::to`] correspond to the king.
    Castling { king: PieceMove, rook: PieceMove },
    /// [En passant] capture: the captured pawn does not stand on `to`.
    ///
    /// [En passant]: https://en.wikipedia.org/wiki/En_passant
    EnPassant {
        from: Square,
        to: Square,
        captured_square: Square,
    },
}

impl Move {
    /// Source square of the moving piece (the king for castling).
    #[must_use]
    pub const fn from(&self) -> Square {
        match *self {
            Self::Regular { from, .. }
            | Self::Promotion { from, .. }
            | Self::EnPassant { from, .. } => from,
            Self::Castling { king, .. } => king.from,
        }
    }

    /// Destination square of the moving piece (the king for castling).
    #[must_use]
    pub const fn to(&self) -> Square {
        match *self {
            Self::Regular { to, .. } | Self::Promotion { to, .. } | Self::EnPassant { to, .. } => {
                to
            },
            Self::Castling { king, .. } => king.to,
        }
    }

    /// The piece removed from the board on the destination square. En passant
    /// captures are not included because the victim does not stand on `to`:
    /// see [`Move::is_capture`].
    #[must_use]
    pub const fn captured(&self) -> Option<Piece> {
        match *self {
            Self::Regular { captured, .. } | Self::Promotion { captured, .. } => captured,
            Self::Castling { .. } | Self::EnPassant { .. } => None,
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn is_capture(&self) -> bool {
        matches!(self, Self::EnPassant { .. }) || self.captured().is_some()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn promotion(&self) -> Option<Promotion> {
        match *self {
            Self::Promotion { promotion, .. } => Some(promotion),
            _ => None,
        }
    }

    /// Returns the side for castling moves.
    #[must_use]
    pub fn castling_side(&self) -> Option<CastlingSide> {
        match self {
            Self::Castling { king, rook } => Some(if rook.from.file() > king.from.file() {
                CastlingSide::Short
            } else {
                CastlingSide::Long
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Move {
    /// Serializes a move in [UCI format].
    ///
    /// [UCI format]: http://wbec-ridderkerk.nl/html/UCIProtocol.html
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from(), self.to())?;
        if let Some(promotion) = self.promotion() {
            write!(f, "{promotion}")?;
        }
        Ok(())
    }
}

/// Source and destination squares together with an optional promotion, as
/// sent by a UCI client or typed by a user. Resolving it into a [`Move`]
/// requires the position: see
/// [`crate::chess::position::Position::build_move`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UciMove {
    #[allow(missing_docs)]
    pub from: Square,
    #[allow(missing_docs)]
    pub to: Square,
    #[allow(missing_docs)]
    pub promotion: Option<Promotion>,
}

impl TryFrom<&str> for UciMove {
    type Error = anyhow::Error;

    fn try_from(input: &str) -> anyhow::Result<Self> {
        if !input.is_ascii() || !(4..=5).contains(&input.len()) {
            bail!("UCI move should be 4 or 5 ASCII chars, got '{input}'");
        }
        let from = Square::try_from(&input[0..2])?;
        let to = Square::try_from(&input[2..4])?;
        if from == to {
            bail!("UCI move should change the square, got '{input}'");
        }
        let promotion = match input[4..].chars().next() {
            Some(symbol) => Some(Promotion::try_from(symbol)?),
            None => None,
        };
        Ok(Self {
            from,
            to,
            promotion,
        })
    }
}
