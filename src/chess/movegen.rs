//! Pseudo-legal move generation: destination squares that obey the piece
//! movement pattern and board occupancy but may still leave the mover's king
//! in check. [`crate::chess::position::Position::legal_targets`] filters them.
//!
//! Generation dispatches on [`PieceKind`] into a couple of shared helpers:
//!
//! - [`sliding_targets`] walks rays for bishops, rooks and queens.
//! - [`stepping_targets`] makes single steps for knights and kings.
//! - Pawns get dedicated push and capture helpers; en passant and castling are
//!   appended when [`crate::chess::special`] confirms them.

use arrayvec::ArrayVec;
use strum::IntoEnumIterator;

use crate::chess::board::Board;
use crate::chess::core::{Direction, PieceKind, Player, Rank, Square, BOARD_WIDTH};
use crate::chess::position::Position;
use crate::chess::special;

/// Upper bound on the number of pseudo-legal destinations of a single piece:
/// a queen in the center of an empty board reaches 27 squares.
pub const MAX_TARGETS: usize = 32;

/// Destination squares of a single piece.
pub type Targets = ArrayVec<Square, MAX_TARGETS>;

/// `(file, rank)` jumps of a knight.
pub const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

/// Walks each direction until the board edge or the first occupied square.
/// The occupied square is included only when it holds an opponent piece.
pub fn sliding_targets(
    board: &Board,
    from: Square,
    owner: Player,
    directions: &[Direction],
    targets: &mut Targets,
) {
    for &direction in directions {
        let mut current = from;
        for _ in 1..BOARD_WIDTH {
            let Some(next) = current.shift(direction) else {
                break;
            };
            match board.at(next) {
                None => targets.push(next),
                Some(piece) => {
                    if piece.owner != owner {
                        targets.push(next);
                    }
                    break;
                },
            }
            current = next;
        }
    }
}

/// Makes a single step per `(file, rank)` delta. The step is valid if it stays
/// on the board and does not land on a friendly piece.
pub fn stepping_targets(
    board: &Board,
    from: Square,
    owner: Player,
    deltas: impl IntoIterator<Item = (i8, i8)>,
    targets: &mut Targets,
) {
    for (file_delta, rank_delta) in deltas {
        if let Some(to) = from.offset(file_delta, rank_delta) {
            if board.at(to).map_or(true, |piece| piece.owner != owner) {
                targets.push(to);
            }
        }
    }
}

/// Forward pawn moves: one step onto an empty square, two steps from the
/// starting rank if both squares are empty.
pub fn pawn_push_targets(board: &Board, from: Square, owner: Player, targets: &mut Targets) {
    let step = owner.pawn_step();
    let Some(single) = from.offset(0, step) else {
        return;
    };
    if board.at(single).is_some() {
        return;
    }
    targets.push(single);
    if from.rank() != Rank::pawns_starting(owner) {
        return;
    }
    if let Some(double) = from.offset(0, 2 * step) {
        if board.at(double).is_none() {
            targets.push(double);
        }
    }
}

/// Diagonal squares a pawn attacks, regardless of their occupancy.
pub fn pawn_attack_squares(from: Square, owner: Player) -> impl Iterator<Item = Square> {
    let step = owner.pawn_step();
    [-1, 1]
        .into_iter()
        .filter_map(move |file_delta| from.offset(file_delta, step))
}

/// Diagonal pawn captures: only onto squares occupied by an opponent piece.
pub fn pawn_capture_targets(board: &Board, from: Square, owner: Player, targets: &mut Targets) {
    for to in pawn_attack_squares(from, owner) {
        if board.at(to).is_some_and(|piece| piece.owner != owner) {
            targets.push(to);
        }
    }
}

/// Squares attacked (or defended) by a piece standing on `from`, ignoring
/// castling and en passant, which never capture on their destination.
pub(crate) fn attack_targets(board: &Board, from: Square) -> Targets {
    let mut targets = Targets::new();
    let Some(piece) = board.at(from) else {
        return targets;
    };
    match piece.kind {
        PieceKind::Pawn => targets.extend(pawn_attack_squares(from, piece.owner)),
        PieceKind::Knight => {
            stepping_targets(board, from, piece.owner, KNIGHT_JUMPS, &mut targets);
        },
        PieceKind::King => stepping_targets(
            board,
            from,
            piece.owner,
            Direction::iter().map(Direction::delta),
            &mut targets,
        ),
        PieceKind::Bishop => {
            sliding_targets(board, from, piece.owner, &Direction::DIAGONAL, &mut targets);
        },
        PieceKind::Rook => {
            sliding_targets(board, from, piece.owner, &Direction::ORTHOGONAL, &mut targets);
        },
        PieceKind::Queen => {
            let all = Direction::iter().collect::<ArrayVec<_, 8>>();
            sliding_targets(board, from, piece.owner, &all, &mut targets);
        },
    }
    targets
}

/// Produces pseudo-legal destinations of the piece standing on `from`. Empty
/// squares have no moves.
#[must_use]
pub fn pseudo_legal_targets(position: &Position, from: Square) -> Targets {
    let board = position.board();
    let Some(piece) = board.at(from) else {
        return Targets::new();
    };
    match piece.kind {
        PieceKind::Pawn => {
            let mut targets = Targets::new();
            pawn_push_targets(board, from, piece.owner, &mut targets);
            pawn_capture_targets(board, from, piece.owner, &mut targets);
            targets.extend(special::en_passant_targets(position, from));
            targets
        },
        PieceKind::King => {
            let mut targets = attack_targets(board, from);
            targets.extend(special::castling_targets(position, from));
            targets
        },
        PieceKind::Knight | PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen => {
            attack_targets(board, from)
        },
    }
}
