use kibitz::chess::core::{Piece, PieceKind, Player, Promotion, Square};
use kibitz::chess::position::{GameStatus, Position};
use kibitz::game::{GameState, MoveRequest};
use pretty_assertions::assert_eq;

fn play(state: &GameState, from: Square, to: Square) -> GameState {
    match state.request_move(from, to) {
        MoveRequest::Applied(next) => next,
        other => panic!("{from}{to} was not applied: {other:?}"),
    }
}

fn play_all(state: &GameState, moves: &[(Square, Square)]) -> GameState {
    moves
        .iter()
        .fold(state.clone(), |state, &(from, to)| play(&state, from, to))
}

fn from_fen(fen: &str) -> GameState {
    GameState::from_position(Position::try_from(fen).unwrap())
}

#[test]
fn scholars_mate() {
    let state = play_all(
        &GameState::new(),
        &[
            (Square::E2, Square::E4),
            (Square::E7, Square::E5),
            (Square::F1, Square::C4),
            (Square::B8, Square::C6),
            (Square::D1, Square::H5),
            (Square::G8, Square::F6),
            (Square::H5, Square::F7),
        ],
    );
    assert_eq!(state.status(), GameStatus::Checkmate);
    assert_eq!(state.current_player(), Player::Black);
    assert_eq!(state.checked_king(), Some(Square::E8));
    assert_eq!(
        state.san_moves(),
        vec!["e4", "e5", "Bc4", "Nc6", "Qh5", "Nf6", "Qxf7#"]
    );
    assert_eq!(state.captured_value(Player::White), 1);
    assert_eq!(state.material_balance(), 1);
    // Undoing the mate resumes the game.
    let undone = state.undo();
    assert_eq!(undone.status(), GameStatus::Ongoing);
    assert_eq!(undone.current_player(), Player::White);
    assert!(undone.captured_pieces().is_empty());
}

#[test]
fn castling_through_requests() {
    let state = from_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1");
    let selected = state.select_square(Square::E1);
    assert_eq!(
        selected.possible_moves(),
        &[Square::F1, Square::D1, Square::G1, Square::C1]
    );
    let castled = play(&selected, Square::E1, Square::G1);
    assert_eq!(
        castled.board().at(Square::F1),
        Some(Piece::new(Player::White, PieceKind::Rook))
    );
    assert_eq!(castled.board().at(Square::H1), None);
    let castled = play(&castled, Square::E8, Square::C8);
    assert_eq!(
        castled.position().to_string(),
        "2kr3r/pppppppp/8/8/8/8/PPPPPPPP/R4RK1 w - - 2 2"
    );
    assert_eq!(castled.san_moves(), vec!["O-O", "O-O-O"]);
    assert_eq!(castled.undo().undo().position(), state.position());
}

#[test]
fn en_passant_through_requests() {
    let state = play_all(
        &GameState::new(),
        &[
            (Square::E2, Square::E4),
            (Square::A7, Square::A6),
            (Square::E4, Square::E5),
            (Square::D7, Square::D5),
        ],
    );
    let selected = state.select_square(Square::E5);
    assert_eq!(selected.possible_moves(), &[Square::E6, Square::D6]);
    let captured = play(&selected, Square::E5, Square::D6);
    assert_eq!(captured.board().at(Square::D5), None);
    assert_eq!(
        captured.captured_pieces(),
        vec![Piece::new(Player::Black, PieceKind::Pawn)]
    );
    assert_eq!(captured.san_moves().last().map(String::as_str), Some("exd6"));
    // The right expires after one move.
    let later = play_all(
        &state,
        &[(Square::G1, Square::F3), (Square::G8, Square::F6)],
    );
    assert_eq!(later.request_move(Square::E5, Square::D6), MoveRequest::Rejected);
}

#[test]
fn promotion_choices() {
    let state = from_fen("8/4P1k1/8/8/8/8/8/4K3 w - - 0 1");
    assert_eq!(
        state.request_move(Square::E7, Square::E8),
        MoveRequest::PendingPromotion {
            from: Square::E7,
            to: Square::E8,
        }
    );
    for (promotion, kind, status) in [
        (Promotion::Queen, PieceKind::Queen, GameStatus::Ongoing),
        (Promotion::Rook, PieceKind::Rook, GameStatus::Ongoing),
        (Promotion::Bishop, PieceKind::Bishop, GameStatus::InsufficientMaterial),
        (Promotion::Knight, PieceKind::Knight, GameStatus::InsufficientMaterial),
    ] {
        let promoted = state.complete_promotion(Square::E7, Square::E8, promotion);
        assert_eq!(
            promoted.board().at(Square::E8),
            Some(Piece::new(Player::White, kind))
        );
        assert_eq!(promoted.status(), status);
    }
}

#[test]
fn insufficient_material_after_capture() {
    let state = from_fen("8/8/4k3/8/8/3K4/3r4/8 w - - 0 1");
    assert!(state.in_check());
    let state = play(&state, Square::D3, Square::D2);
    assert_eq!(state.status(), GameStatus::InsufficientMaterial);
    assert_eq!(state.request_move(Square::E6, Square::E5), MoveRequest::Rejected);
    assert_eq!(state.captured_value(Player::White), 5);
}

#[test]
#[allow(trivial_casts)]
fn only_legal_moves_are_offered() {
    // The knight is pinned to the king.
    let state = from_fen("4k3/8/8/b7/8/8/3N4/4K3 w - - 0 1");
    let pinned = state.select_square(Square::D2);
    assert_eq!(pinned.selected_square(), Some(Square::D2));
    assert_eq!(pinned.possible_moves(), &[] as &[Square]);
    assert_eq!(state.request_move(Square::D2, Square::F3), MoveRequest::Rejected);
    assert_eq!(
        state.select_square(Square::E1).possible_moves(),
        &[Square::E2, Square::F2, Square::F1, Square::D1]
    );
    // The king can not step onto a square covered by the rook.
    let state = from_fen("4k3/8/8/8/8/8/r7/4K3 w - - 0 1");
    assert_eq!(
        state.select_square(Square::E1).possible_moves(),
        &[Square::F1, Square::D1]
    );
}

#[test]
fn branching_history() {
    let state = play_all(
        &GameState::new(),
        &[
            (Square::D2, Square::D4),
            (Square::D7, Square::D5),
            (Square::C2, Square::C4),
        ],
    );
    let rewound = state.jump_to(2);
    assert!(rewound.can_redo());
    assert_eq!(rewound.history().len(), 3);
    let branched = play(&rewound, Square::G1, Square::F3);
    assert_eq!(branched.history().len(), 3);
    assert!(!branched.can_redo());
    assert_eq!(branched.san_moves(), vec!["d4", "d5", "Nf3"]);
    assert_eq!(branched.move_pairs().len(), 2);
    assert_eq!(branched.restart(), GameState::new());
}
