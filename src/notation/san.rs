//! Converts moves to and from [Standard Algebraic Notation] (SAN), e.g.
//! `Nbd7`, `exd6`, `e8=Q+` or `O-O-O#`.
//!
//! SAN depends on the position: the moving piece is identified by its kind
//! and the destination, so the source square is only spelled out when several
//! pieces of the same kind can reach the destination.
//!
//! [Standard Algebraic Notation]: https://www.chessprogramming.org/Algebraic_Chess_Notation#Standard_Algebraic_Notation_.28SAN.29

use std::fmt::Write;

use crate::chess::core::{CastlingSide, File, PieceKind, Promotion, Rank, Square};
use crate::chess::moves::Move;
use crate::chess::position::Position;
use crate::notation::NotationError;

/// Serializes a legal move of `position` in SAN, including the check (`+`)
/// and checkmate (`#`) suffixes.
///
/// ```
/// use kibitz::chess::core::Square;
/// use kibitz::chess::position::Position;
/// use kibitz::notation::san;
///
/// let position = Position::starting();
/// let knight = position.build_move(Square::G1, Square::F3, None).unwrap();
/// assert_eq!(san::to_san(&position, &knight), "Nf3");
/// ```
#[must_use]
pub fn to_san(position: &Position, next_move: &Move) -> String {
    let mut san = String::new();
    let from = next_move.from();
    let to = next_move.to();
    match (next_move.castling_side(), position.board().at(from)) {
        (Some(CastlingSide::Short), _) => san.push_str("O-O"),
        (Some(CastlingSide::Long), _) => san.push_str("O-O-O"),
        (None, None) => return next_move.to_string(),
        (None, Some(piece)) => match piece.kind.san_letter() {
            None => {
                if next_move.is_capture() {
                    let _ = write!(san, "{}x", from.file());
                }
                let _ = write!(san, "{to}");
                if let Some(promotion) = next_move.promotion() {
                    san.push('=');
                    san.push(promotion_letter(promotion));
                }
            },
            Some(letter) => {
                san.push(letter);
                san.push_str(&disambiguation(position, piece.kind, from, to));
                if next_move.is_capture() {
                    san.push('x');
                }
                let _ = write!(san, "{to}");
            },
        },
    }
    let mut next = *position;
    next.make_move(next_move);
    if next.is_checkmate() {
        san.push('#');
    } else if next.in_check() {
        san.push('+');
    }
    san
}

fn promotion_letter(promotion: Promotion) -> char {
    PieceKind::from(promotion).san_letter().unwrap_or('Q')
}

/// Source hint for a piece move: nothing if no other piece of the same kind
/// can legally reach `to`, otherwise the source file if it is unique among
/// them, then the source rank, then the full source square.
fn disambiguation(position: &Position, kind: PieceKind, from: Square, to: Square) -> String {
    let others: Vec<Square> = position
        .board()
        .player_pieces(position.side_to_move())
        .filter(|&(square, piece)| {
            square != from && piece.kind == kind && position.is_legal_move(square, to)
        })
        .map(|(square, _)| square)
        .collect();
    if others.is_empty() {
        String::new()
    } else if others.iter().all(|square| square.file() != from.file()) {
        from.file().to_string()
    } else if others.iter().all(|square| square.rank() != from.rank()) {
        from.rank().to_string()
    } else {
        from.to_string()
    }
}

/// Parts of a non-castling SAN token.
#[derive(Debug, Default)]
struct Pattern {
    kind: Option<PieceKind>,
    file: Option<File>,
    rank: Option<Rank>,
    capture: bool,
    target: Option<Square>,
    promotion: Option<Promotion>,
}

impl Pattern {
    fn parse(body: &str) -> Option<Self> {
        let mut pattern = Self::default();
        let mut rest = body;
        if let Some(first) = rest.chars().next() {
            if let Some(kind) = PieceKind::from_san_letter(first) {
                pattern.kind = Some(kind);
                rest = &rest[first.len_utf8()..];
            }
        }
        // Promotion: "e8=Q", "e8Q" or "e8q".
        if let Some(last) = rest.chars().last() {
            if last.is_ascii_alphabetic() && rest.len() > 2 {
                pattern.promotion = Some(Promotion::try_from(last).ok()?);
                rest = &rest[..rest.len() - 1];
                rest = rest.strip_suffix('=').unwrap_or(rest);
            }
        }
        if rest.len() < 2 || !rest.is_ascii() {
            return None;
        }
        let (prefix, target) = rest.split_at(rest.len() - 2);
        pattern.target = Some(Square::try_from(target).ok()?);
        let prefix = match prefix.strip_suffix(['x', ':']) {
            Some(stripped) => {
                pattern.capture = true;
                stripped
            },
            None => prefix,
        };
        for hint in prefix.chars() {
            match hint {
                'a'..='h' if pattern.file.is_none() && pattern.rank.is_none() => {
                    pattern.file = Some(File::try_from(hint).ok()?);
                },
                '1'..='8' if pattern.rank.is_none() => {
                    pattern.rank = Some(Rank::try_from(hint).ok()?);
                },
                _ => return None,
            }
        }
        Some(pattern)
    }

    fn matches(&self, position: &Position, candidate: &Move) -> bool {
        let from = candidate.from();
        let Some(piece) = position.board().at(from) else {
            return false;
        };
        let kind = self.kind.unwrap_or(PieceKind::Pawn);
        if piece.kind != kind || Some(candidate.to()) != self.target {
            return false;
        }
        // Pawns only leave their file when capturing.
        if kind == PieceKind::Pawn
            && !self.capture
            && self.file.is_none()
            && from.file() != candidate.to().file()
        {
            return false;
        }
        if self.file.is_some_and(|file| file != from.file())
            || self.rank.is_some_and(|rank| rank != from.rank())
        {
            return false;
        }
        match (self.promotion, candidate.promotion()) {
            (Some(expected), Some(actual)) => expected == actual,
            (Some(_), None) => false,
            // Missing promotion piece is reported separately.
            (None, _) => true,
        }
    }
}

/// Finds the legal move of `position` written as `token` in SAN.
///
/// The parser is lenient about the forms commonly found in the wild: check,
/// checkmate and annotation suffixes (`+`, `#`, `!`, `?`) are ignored,
/// castling may be written with zeros (`0-0`) and the `=` before the
/// promotion piece is optional.
pub fn from_san(position: &Position, token: &str) -> Result<Move, NotationError> {
    let body = token.trim().trim_end_matches(['+', '#', '!', '?']);
    let malformed = || NotationError::Malformed(token.to_string());
    let castling = match body {
        "O-O" | "0-0" => Some(CastlingSide::Short),
        "O-O-O" | "0-0-0" => Some(CastlingSide::Long),
        _ => None,
    };
    let moves = position.legal_moves();
    let candidates: Vec<Move> = match castling {
        Some(side) => moves
            .into_iter()
            .filter(|candidate| candidate.castling_side() == Some(side))
            .collect(),
        None => {
            let pattern = Pattern::parse(body).ok_or_else(malformed)?;
            let candidates: Vec<Move> = moves
                .into_iter()
                .filter(|candidate| pattern.matches(position, candidate))
                .collect();
            if pattern.promotion.is_none() && candidates.iter().any(|m| m.promotion().is_some()) {
                return Err(NotationError::MissingPromotion(token.to_string()));
            }
            candidates
        },
    };
    match candidates.as_slice() {
        [] => Err(NotationError::NoLegalMove(token.to_string())),
        [found] => Ok(*found),
        _ => Err(NotationError::Ambiguous(token.to_string())),
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn setup(fen: &str) -> Position {
        Position::try_from(fen).unwrap()
    }

    fn san(position: &Position, uci: &str) -> String {
        let next_move = position
            .legal_moves()
            .into_iter()
            .find(|m| m.to_string() == uci)
            .unwrap();
        to_san(position, &next_move)
    }

    #[test]
    fn pieces_and_pawns() {
        let position = Position::starting();
        assert_eq!(san(&position, "e2e4"), "e4");
        assert_eq!(san(&position, "g1f3"), "Nf3");
        assert_eq!(san(&position, "b1c3"), "Nc3");
        let position = setup("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2");
        assert_eq!(san(&position, "e4d5"), "exd5");
        assert_eq!(san(&position, "f1b5"), "Bb5+");
    }

    #[test]
    fn disambiguation() {
        // Knights on b1 and f3 can both reach d2: the file tells them apart.
        let position = setup("4k3/8/8/8/8/5N2/8/1N2K3 w - - 0 1");
        assert_eq!(san(&position, "b1d2"), "Nbd2");
        assert_eq!(san(&position, "f3d2"), "Nfd2");
        assert_eq!(san(&position, "b1c3"), "Nc3");
        // Rooks on the same file: the rank tells them apart.
        let position = setup("4k3/R7/8/8/8/8/R7/4K3 w - - 0 1");
        assert_eq!(san(&position, "a2a5"), "R2a5");
        assert_eq!(san(&position, "a7a5"), "R7a5");
        // Three queens: neither the file nor the rank is unique.
        let position = setup("2k5/8/8/8/Q6Q/8/8/Q3K3 w - - 0 1");
        assert_eq!(san(&position, "a4d4"), "Qa4d4");
        assert_eq!(san(&position, "h4d4"), "Qhd4");
        assert_eq!(san(&position, "a1d4"), "Q1d4");
    }

    #[test]
    fn special_moves() {
        let position = setup("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        assert_eq!(san(&position, "e1g1"), "O-O");
        assert_eq!(san(&position, "e1c1"), "O-O-O");
        let position = setup("4k3/8/8/3Pp3/8/8/8/4K3 w - e6 0 1");
        assert_eq!(san(&position, "d5e6"), "dxe6");
        let position = setup("1r2k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        assert_eq!(san(&position, "a7a8q"), "a8=Q");
        assert_eq!(san(&position, "a7b8n"), "axb8=N");
        // Fool's mate.
        let position = setup("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2");
        assert_eq!(san(&position, "d8h4"), "Qh4#");
    }

    #[test]
    fn parse() {
        let position = Position::starting();
        assert_eq!(from_san(&position, "e4").unwrap().to_string(), "e2e4");
        assert_eq!(from_san(&position, "Nf3").unwrap().to_string(), "g1f3");
        assert_eq!(from_san(&position, "Nf3!?").unwrap().to_string(), "g1f3");
        assert_eq!(
            from_san(&position, "e5"),
            Err(NotationError::NoLegalMove("e5".to_string()))
        );
        assert_eq!(
            from_san(&position, "Xe4"),
            Err(NotationError::Malformed("Xe4".to_string()))
        );
        assert_eq!(
            from_san(&position, "e9"),
            Err(NotationError::Malformed("e9".to_string()))
        );
        assert!(from_san(&position, "").is_err());

        let position = setup("4k3/8/8/8/8/5N2/8/1N2K3 w - - 0 1");
        assert_eq!(
            from_san(&position, "Nd2"),
            Err(NotationError::Ambiguous("Nd2".to_string()))
        );
        assert_eq!(from_san(&position, "Nbd2").unwrap().to_string(), "b1d2");
        assert_eq!(from_san(&position, "Nf3d2").unwrap().to_string(), "f3d2");

        let position = setup("r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1");
        assert_eq!(from_san(&position, "O-O").unwrap().to_string(), "e8g8");
        assert_eq!(from_san(&position, "0-0-0").unwrap().to_string(), "e8c8");

        let position = setup("1r2k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        assert_eq!(from_san(&position, "axb8=N").unwrap().to_string(), "a7b8n");
        assert_eq!(from_san(&position, "a8Q+").unwrap().to_string(), "a7a8q");
        assert_eq!(
            from_san(&position, "a8"),
            Err(NotationError::MissingPromotion("a8".to_string()))
        );
        assert_eq!(
            from_san(&position, "a8=K"),
            Err(NotationError::Malformed("a8=K".to_string()))
        );

        let position = setup("4k3/8/8/3Pp3/8/8/8/4K3 w - e6 0 1");
        assert_eq!(
            from_san(&position, "dxe6"),
            Ok(Move::EnPassant {
                from: Square::D5,
                to: Square::E6,
                captured_square: Square::E5,
            })
        );
    }
}
