//! Special moves: [castling], [en passant] and [promotion]. These are the only
//! moves whose validity depends on more than the piece movement pattern and
//! board occupancy.
//!
//! History facts the rules need (whether the king and rook moved, which pawn
//! just made a two-square advance) are folded into
//! [`crate::chess::position::Position`] as castle rights and the en passant
//! pawn, so every check here only needs the current snapshot.
//!
//! [castling]: https://www.chessprogramming.org/Castling
//! [en passant]: https://www.chessprogramming.org/En_passant
//! [promotion]: https://www.chessprogramming.org/Promotions

use arrayvec::ArrayVec;

use crate::chess::attacks;
use crate::chess::core::{CastleRights, CastlingSide, File, Piece, PieceKind, Rank, Square};
use crate::chess::position::Position;

/// Kind of a move as seen from its source and destination squares.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveType {
    Regular,
    Promotion,
    Castling,
    EnPassant,
}

/// Checks whether the king standing on `king_square` can castle with the rook
/// standing on `rook_square`:
///
/// 1. Neither the king nor the rook have moved: the castle right is still
///    there and both pieces stand on their original squares.
/// 2. All squares strictly between them are empty.
/// 3. The king is not in check.
/// 4. Neither the square the king passes through nor its destination is
///    attacked.
#[must_use]
pub fn is_castling_eligible(position: &Position, king_square: Square, rook_square: Square) -> bool {
    let board = position.board();
    let Some(king) = board.at(king_square) else {
        return false;
    };
    if king.kind != PieceKind::King {
        return false;
    }
    let player = king.owner;
    let backrank = Rank::backrank(player);
    if king_square != Square::new(File::E, backrank) {
        return false;
    }
    let side = match rook_square {
        square if square == CastlingSide::Short.rook_square(player) => CastlingSide::Short,
        square if square == CastlingSide::Long.rook_square(player) => CastlingSide::Long,
        _ => return false,
    };
    if !position
        .castling()
        .contains(CastleRights::for_side(player, side))
    {
        return false;
    }
    if board.at(rook_square) != Some(Piece::new(player, PieceKind::Rook)) {
        return false;
    }

    let (low, high) = if king_square < rook_square {
        (king_square as u8, rook_square as u8)
    } else {
        (rook_square as u8, king_square as u8)
    };
    for between in low + 1..high {
        let Ok(square) = Square::try_from(between) else {
            return false;
        };
        if board.at(square).is_some() {
            return false;
        }
    }

    let (king_destination, rook_destination) = side.destinations(player);
    // The king passes through the square the rook lands on.
    [king_square, rook_destination, king_destination]
        .into_iter()
        .all(|square| !attacks::is_square_threatened(board, square, player))
}

/// Destinations of the castling moves available to the king on
/// `king_square`.
#[must_use]
pub fn castling_targets(position: &Position, king_square: Square) -> ArrayVec<Square, 2> {
    let mut targets = ArrayVec::new();
    let Some(king) = position.board().at(king_square) else {
        return targets;
    };
    for side in [CastlingSide::Short, CastlingSide::Long] {
        if is_castling_eligible(position, king_square, side.rook_square(king.owner)) {
            targets.push(side.destinations(king.owner).0);
        }
    }
    targets
}

/// Checks whether the pawn on `pawn_square` can capture the pawn on
/// `captured_square` en passant:
///
/// 1. The immediately preceding move was a two-square advance of the pawn
///    now standing on `captured_square`.
/// 2. The capturing pawn stands next to it on its fifth rank (rank 4 for
///    White and rank 3 for Black, zero-indexed).
#[must_use]
pub fn is_en_passant_eligible(
    position: &Position,
    pawn_square: Square,
    captured_square: Square,
) -> bool {
    let board = position.board();
    let Some(pawn) = board.at(pawn_square) else {
        return false;
    };
    if pawn.kind != PieceKind::Pawn || position.en_passant() != Some(captured_square) {
        return false;
    }
    if board.at(captured_square) != Some(Piece::new(pawn.owner.opponent(), PieceKind::Pawn)) {
        return false;
    }
    let rank = Rank::en_passant_capture(pawn.owner);
    pawn_square.rank() == rank
        && captured_square.rank() == rank
        && (pawn_square.file() as i8 - captured_square.file() as i8).abs() == 1
}

/// Destination of the en passant capture available to the pawn on `from`.
#[must_use]
pub fn en_passant_targets(position: &Position, from: Square) -> Option<Square> {
    let captured = position.en_passant()?;
    let pawn = position.board().at(from)?;
    if !is_en_passant_eligible(position, from, captured) {
        return None;
    }
    captured.offset(0, pawn.owner.pawn_step())
}

/// A pawn move from `from` promotes iff the pawn stands one step away from
/// its far rank before moving.
#[must_use]
pub fn is_promotion_trigger(pawn: Piece, from: Square) -> bool {
    pawn.kind == PieceKind::Pawn && from.rank() == Rank::promoting(pawn.owner)
}

/// Determines which kind of move relocating the piece from `from` to `to`
/// would be. Returns [`None`] for an empty source square or a special move
/// whose conditions are not met (king moving two files without the right to
/// castle, pawn stepping diagonally onto an empty square without en passant).
///
/// The destination is not checked against the piece movement pattern: see
/// [`Position::is_legal_move`].
#[must_use]
pub fn classify_move(position: &Position, from: Square, to: Square) -> Option<MoveType> {
    let piece = position.board().at(from)?;
    let file_distance = (to.file() as i8 - from.file() as i8).abs();
    match piece.kind {
        PieceKind::King if file_distance == 2 && from.rank() == to.rank() => {
            let side = if to.file() > from.file() {
                CastlingSide::Short
            } else {
                CastlingSide::Long
            };
            is_castling_eligible(position, from, side.rook_square(piece.owner))
                .then_some(MoveType::Castling)
        },
        PieceKind::Pawn if is_promotion_trigger(piece, from) => Some(MoveType::Promotion),
        PieceKind::Pawn if file_distance == 1 && position.board().at(to).is_none() => {
            let captured = Square::new(to.file(), from.rank());
            is_en_passant_eligible(position, from, captured).then_some(MoveType::EnPassant)
        },
        _ => Some(MoveType::Regular),
    }
}
