//! Threat detection: which pieces attack a given square.
//!
//! Instead of generating every opponent move, the lookup goes outward from the
//! target square: a knight attacks the square iff the square is a knight jump
//! away from it, a rook iff it is the first piece on an orthogonal ray, and so
//! on. Castling and en passant never capture on their destination and are not
//! considered, which also keeps castling generation free of recursion.

use arrayvec::ArrayVec;

use crate::chess::board::Board;
use crate::chess::core::{Direction, Piece, PieceKind, Player, Square};
use crate::chess::movegen::KNIGHT_JUMPS;

/// Squares of the pieces attacking a single square: at most 8 knights, 2 pawns
/// and the first piece on each of the 8 rays.
pub type Attackers = ArrayVec<Square, 18>;

/// Collects the squares of `defender`'s opponent pieces that attack `square`.
///
/// Pawns attack diagonally forward regardless of what stands on the target,
/// so the result is the same for an empty square and for a square occupied by
/// either side.
#[must_use]
pub fn attackers(board: &Board, square: Square, defender: Player) -> Attackers {
    let attacker = defender.opponent();
    let mut result = Attackers::new();
    let holds = |at: Square, kind: PieceKind| board.at(at) == Some(Piece::new(attacker, kind));

    for (file_delta, rank_delta) in KNIGHT_JUMPS {
        if let Some(from) = square.offset(file_delta, rank_delta) {
            if holds(from, PieceKind::Knight) {
                result.push(from);
            }
        }
    }

    // The attacking pawn stands one step "behind" the target from its own
    // perspective.
    for file_delta in [-1, 1] {
        if let Some(from) = square.offset(file_delta, -attacker.pawn_step()) {
            if holds(from, PieceKind::Pawn) {
                result.push(from);
            }
        }
    }

    for (directions, slider) in [
        (Direction::ORTHOGONAL, PieceKind::Rook),
        (Direction::DIAGONAL, PieceKind::Bishop),
    ] {
        for direction in directions {
            let mut current = square;
            let mut distance = 0;
            while let Some(next) = current.shift(direction) {
                distance += 1;
                current = next;
                let Some(piece) = board.at(next) else {
                    continue;
                };
                if piece.owner == attacker
                    && (piece.kind == slider
                        || piece.kind == PieceKind::Queen
                        || (piece.kind == PieceKind::King && distance == 1))
                {
                    result.push(next);
                }
                break;
            }
        }
    }
    result
}

/// Returns true if any piece of `defender`'s opponent attacks `square`.
#[must_use]
pub fn is_square_threatened(board: &Board, square: Square, defender: Player) -> bool {
    !attackers(board, square, defender).is_empty()
}

#[cfg(test)]
mod test {
    use itertools::Itertools;
    use pretty_assertions::assert_eq;

    use super::*;

    fn attacker_names(placement: &str, square: Square, defender: Player) -> Vec<String> {
        let board = Board::from_placement(placement).unwrap();
        attackers(&board, square, defender)
            .iter()
            .map(Square::to_string)
            .sorted()
            .collect()
    }

    #[test]
    fn starting_position() {
        let board = Board::starting();
        // Third rank is covered by White pawns and knights.
        assert!(is_square_threatened(&board, Square::E3, Player::Black));
        assert!(is_square_threatened(&board, Square::A3, Player::Black));
        assert!(!is_square_threatened(&board, Square::E4, Player::Black));
        assert!(!is_square_threatened(&board, Square::E5, Player::White));
        assert!(is_square_threatened(&board, Square::F6, Player::White));
        // Pieces defend each other, but the opponent does not reach them.
        assert!(!is_square_threatened(&board, Square::E1, Player::White));
    }

    #[test]
    fn sliders_are_blocked() {
        // Rook on a1, bishop on b2, queen on h5. The White pawn on d2 blocks
        // nothing relevant for e8.
        let placement = "4k3/8/8/7Q/8/8/1B1P4/R3K3";
        assert_eq!(attacker_names(placement, Square::A8, Player::Black), vec!["a1"]);
        assert_eq!(attacker_names(placement, Square::H8, Player::Black), vec!["b2", "h5"]);
        assert_eq!(attacker_names(placement, Square::F7, Player::Black), vec!["h5"]);
        assert_eq!(attacker_names(placement, Square::D3, Player::Black), Vec::<String>::new());
        // Own pieces block: the rook does not see beyond e1.
        assert_eq!(attacker_names(placement, Square::F1, Player::Black), vec!["e1"]);
    }

    #[test]
    fn pawns_and_knights() {
        let placement = "4k3/8/3p4/8/4N3/8/8/4K3";
        assert_eq!(attacker_names(placement, Square::E5, Player::Black), Vec::<String>::new());
        assert_eq!(attacker_names(placement, Square::E5, Player::White), vec!["d6"]);
        assert_eq!(attacker_names(placement, Square::C5, Player::White), vec!["d6"]);
        assert_eq!(attacker_names(placement, Square::D6, Player::Black), vec!["e4"]);
        assert_eq!(attacker_names(placement, Square::F2, Player::Black), vec!["e1", "e4"]);
        // Pawns never attack straight ahead.
        assert_eq!(attacker_names(placement, Square::D5, Player::White), Vec::<String>::new());
    }

    #[test]
    fn king_reaches_one_square() {
        let placement = "8/8/8/8/8/8/8/K6k";
        assert_eq!(attacker_names(placement, Square::B2, Player::Black), vec!["a1"]);
        assert_eq!(attacker_names(placement, Square::C1, Player::Black), Vec::<String>::new());
        assert_eq!(attacker_names(placement, Square::G2, Player::White), vec!["h1"]);
    }

    #[test]
    fn double_check() {
        let placement = "4k3/8/3N4/8/8/8/8/4R1K1";
        assert_eq!(attacker_names(placement, Square::E8, Player::Black), vec!["d6", "e1"]);
    }
}
