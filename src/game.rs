//! Game-state container: the current position, the square selected by the
//! user, the game status and the history of played moves.
//!
//! Every operation takes the state by reference and returns a new
//! [`GameState`], leaving the original untouched. A caller that serves several
//! games owns one [`GameState`] per game and serializes updates to it.
//!
//! The history is a log of `(move, position after the move)` entries with a
//! cursor. [`GameState::undo`] and [`GameState::redo`] only move the cursor;
//! the entries past the cursor are discarded once a new move is applied.

use log::debug;

use crate::chess::board::Board;
use crate::chess::core::{Piece, PieceKind, Player, Promotion, Square};
use crate::chess::moves::Move;
use crate::chess::position::{GameStatus, Position};
use crate::chess::special;
use crate::notation::{pgn, san};

/// Played move together with the position it produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    #[allow(missing_docs)]
    pub played: Move,
    #[allow(missing_docs)]
    pub position: Position,
}

impl HistoryEntry {
    /// The piece removed from the board by the move, including pawns captured
    /// en passant.
    #[must_use]
    pub fn captured(&self) -> Option<Piece> {
        match self.played {
            // The captured pawn belongs to the side to move after the capture.
            Move::EnPassant { .. } => {
                Some(Piece::new(self.position.side_to_move(), PieceKind::Pawn))
            },
            _ => self.played.captured(),
        }
    }
}

/// Outcome of [`GameState::request_move`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveRequest {
    /// The move was legal and has been applied.
    Applied(GameState),
    /// The pawn reaches the last rank: the move is legal but can only be
    /// applied once the piece is chosen through
    /// [`GameState::complete_promotion`].
    PendingPromotion {
        #[allow(missing_docs)]
        from: Square,
        #[allow(missing_docs)]
        to: Square,
    },
    /// No piece of the side to move on the source square, the destination is
    /// not legal or the game is over.
    Rejected,
}

/// One row of the move list: the move number and the SAN of both moves.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MovePair {
    pub number: u16,
    pub white: Option<String>,
    pub black: Option<String>,
}

/// Root aggregate of a single game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    initial: Position,
    position: Position,
    selected: Option<Square>,
    possible_moves: Vec<Square>,
    history: Vec<HistoryEntry>,
    /// Number of history entries that are applied to the visible position.
    cursor: usize,
    status: GameStatus,
}

impl GameState {
    /// Starts a game from the standard opening position.
    #[must_use]
    pub fn new() -> Self {
        Self::from_position(Position::starting())
    }

    /// Starts a game from a custom set-up. Undoing every move and restarting
    /// returns to this position.
    #[must_use]
    pub fn from_position(position: Position) -> Self {
        Self {
            initial: position,
            position,
            selected: None,
            possible_moves: Vec::new(),
            history: Vec::new(),
            cursor: 0,
            status: position.status(),
        }
    }

    /// Selects the square and computes legal destinations of the piece
    /// standing there. Clears the selection if there is no piece of the side
    /// to move or the game is over.
    #[must_use]
    pub fn select_square(&self, square: Square) -> Self {
        let mut result = self.clone();
        let owned = self
            .position
            .board()
            .at(square)
            .is_some_and(|piece| piece.owner == self.current_player());
        if owned && !self.status.is_over() {
            result.selected = Some(square);
            result.possible_moves = self.position.legal_targets(square);
        } else {
            result.selected = None;
            result.possible_moves.clear();
        }
        result
    }

    /// Tries to move the piece of the side to move from `from` to `to`.
    #[must_use]
    pub fn request_move(&self, from: Square, to: Square) -> MoveRequest {
        if self.status.is_over() {
            debug!("rejected {from}{to}: the game is over ({})", self.status);
            return MoveRequest::Rejected;
        }
        let Some(piece) = self.position.board().at(from) else {
            debug!("rejected {from}{to}: no piece on {from}");
            return MoveRequest::Rejected;
        };
        if piece.owner != self.current_player() || !self.position.is_legal_move(from, to) {
            debug!("rejected {from}{to}: not a legal move for {:?}", self.current_player());
            return MoveRequest::Rejected;
        }
        if special::is_promotion_trigger(piece, from) {
            return MoveRequest::PendingPromotion { from, to };
        }
        match self.position.build_move(from, to, None) {
            Some(next_move) => self
                .try_apply_move(&next_move)
                .map_or(MoveRequest::Rejected, MoveRequest::Applied),
            None => MoveRequest::Rejected,
        }
    }

    /// Applies the promotion deferred by [`GameState::request_move`]. Returns
    /// the unchanged state if the move is not a legal promotion.
    #[must_use]
    pub fn complete_promotion(&self, from: Square, to: Square, promotion: Promotion) -> Self {
        self.try_complete_promotion(from, to, promotion)
            .unwrap_or_else(|| self.clone())
    }

    /// Same as [`GameState::complete_promotion`], but reports a rejected
    /// promotion as `None`.
    #[must_use]
    pub fn try_complete_promotion(
        &self,
        from: Square,
        to: Square,
        promotion: Promotion,
    ) -> Option<Self> {
        let next = self
            .position
            .build_move(from, to, Some(promotion))
            .and_then(|next_move| self.try_apply_move(&next_move));
        if next.is_none() {
            debug!("rejected promotion {from}{to}{promotion}");
        }
        next
    }

    /// Applies a legal move, discarding the history entries past the cursor.
    /// Moves that are not legal in the current position leave the state
    /// unchanged.
    #[must_use]
    pub fn apply_move(&self, next_move: &Move) -> Self {
        self.try_apply_move(next_move)
            .unwrap_or_else(|| self.clone())
    }

    /// Applies a legal move and returns the state after it. Returns `None` if
    /// the game is already over or the move is not legal in the current
    /// position.
    #[must_use]
    pub fn try_apply_move(&self, next_move: &Move) -> Option<Self> {
        if self.status.is_over() {
            debug!("rejected {next_move}: the game is over ({})", self.status);
            return None;
        }
        let rebuilt =
            self.position
                .build_move(next_move.from(), next_move.to(), next_move.promotion());
        if rebuilt != Some(*next_move) {
            debug!("rejected {next_move}: not legal in {}", self.position);
            return None;
        }
        let mut position = self.position;
        position.make_move(next_move);
        let mut history = self.history[..self.cursor].to_vec();
        history.push(HistoryEntry {
            played: *next_move,
            position,
        });
        let result = Self {
            initial: self.initial,
            position,
            selected: None,
            possible_moves: Vec::new(),
            cursor: history.len(),
            history,
            status: position.status(),
        };
        debug!("applied {next_move}: {position} ({})", result.status);
        Some(result)
    }

    /// Steps one move back. Stepping back from the first move shows the
    /// initial position; the history is kept for [`GameState::redo`].
    #[must_use]
    pub fn undo(&self) -> Self {
        match self.cursor.checked_sub(1) {
            Some(ply) => self.restore(ply),
            None => self.clone(),
        }
    }

    /// Steps one move forward if there is an undone move.
    #[must_use]
    pub fn redo(&self) -> Self {
        if self.can_redo() {
            self.restore(self.cursor + 1)
        } else {
            self.clone()
        }
    }

    /// Moves the cursor to given ply: 0 is the initial position, the history
    /// length is the last move. Other values leave the state unchanged.
    #[must_use]
    pub fn jump_to(&self, ply: usize) -> Self {
        if ply > self.history.len() {
            debug!("ignored jump to ply {ply}: only {} moves", self.history.len());
            return self.clone();
        }
        self.restore(ply)
    }

    /// Discards the history and returns to the initial position.
    #[must_use]
    pub fn restart(&self) -> Self {
        Self::from_position(self.initial)
    }

    fn restore(&self, ply: usize) -> Self {
        let position = self.position_at(ply);
        debug!("moved to ply {ply}: {position}");
        Self {
            initial: self.initial,
            position,
            selected: None,
            possible_moves: Vec::new(),
            history: self.history.clone(),
            cursor: ply,
            status: position.status(),
        }
    }

    /// The position after `ply` moves of the history. `ply` has to be within
    /// the history.
    fn position_at(&self, ply: usize) -> Position {
        match ply.checked_sub(1) {
            Some(index) => self.history[index].position,
            None => self.initial,
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn position(&self) -> &Position {
        &self.position
    }

    /// Position the game started from.
    #[must_use]
    pub const fn initial_position(&self) -> &Position {
        &self.initial
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn board(&self) -> &Board {
        self.position.board()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn current_player(&self) -> Player {
        self.position.side_to_move()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn selected_square(&self) -> Option<Square> {
        self.selected
    }

    /// Legal destinations of the piece on the selected square.
    #[must_use]
    pub fn possible_moves(&self) -> &[Square] {
        &self.possible_moves
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn status(&self) -> GameStatus {
        self.status
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn in_check(&self) -> bool {
        self.position.in_check()
    }

    /// Square of the side to move king if it is in check.
    #[must_use]
    pub fn checked_king(&self) -> Option<Square> {
        self.position.checked_king()
    }

    /// Every played move, including the ones that were undone.
    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// The moves leading to the visible position.
    #[must_use]
    pub fn applied(&self) -> &[HistoryEntry] {
        &self.history[..self.cursor]
    }

    /// Number of moves leading to the visible position.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor < self.history.len()
    }

    /// Pieces removed from the board by the moves leading to the visible
    /// position, in the order of capture.
    #[must_use]
    pub fn captured_pieces(&self) -> Vec<Piece> {
        self.applied()
            .iter()
            .filter_map(HistoryEntry::captured)
            .collect()
    }

    /// Total value of opponent pieces captured by the player.
    #[must_use]
    pub fn captured_value(&self, player: Player) -> u32 {
        self.captured_pieces()
            .into_iter()
            .filter(|piece| piece.owner != player)
            .map(Piece::value)
            .sum()
    }

    /// Difference between the values captured by White and by Black.
    #[must_use]
    pub fn material_balance(&self) -> i64 {
        i64::from(self.captured_value(Player::White))
            - i64::from(self.captured_value(Player::Black))
    }

    /// Every move of the history in Standard Algebraic Notation, including
    /// the undone ones.
    #[must_use]
    pub fn san_moves(&self) -> Vec<String> {
        self.history
            .iter()
            .enumerate()
            .map(|(ply, entry)| san::to_san(&self.position_at(ply), &entry.played))
            .collect()
    }

    /// Groups [`GameState::san_moves`] into numbered rows. If Black moved
    /// first, the first row has no White move.
    #[must_use]
    pub fn move_pairs(&self) -> Vec<MovePair> {
        let mut pairs: Vec<MovePair> = Vec::new();
        let mut number = self.initial.fullmove_counter();
        let mut player = self.initial.side_to_move();
        for san in self.san_moves() {
            match player {
                Player::White => pairs.push(MovePair {
                    number,
                    white: Some(san),
                    black: None,
                }),
                Player::Black => match pairs.last_mut() {
                    Some(pair) if pair.number == number && pair.black.is_none() => {
                        pair.black = Some(san);
                    },
                    _ => pairs.push(MovePair {
                        number,
                        white: None,
                        black: Some(san),
                    }),
                },
            }
            if player == Player::Black {
                number = number.saturating_add(1);
            }
            player = player.opponent();
        }
        pairs
    }

    /// Exports the moves leading to the visible position in Portable Game
    /// Notation.
    #[must_use]
    pub fn to_pgn(&self) -> String {
        pgn::export(self)
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn play(state: &GameState, from: Square, to: Square) -> GameState {
        match state.request_move(from, to) {
            MoveRequest::Applied(next) => next,
            other => panic!("{from}{to} was not applied: {other:?}"),
        }
    }

    #[test]
    fn fools_mate() {
        let mut state = GameState::new();
        for (from, to) in [
            (Square::F2, Square::F3),
            (Square::E7, Square::E5),
            (Square::G2, Square::G4),
            (Square::D8, Square::H4),
        ] {
            state = play(&state, from, to);
        }
        assert_eq!(state.status(), GameStatus::Checkmate);
        assert!(state.in_check());
        assert_eq!(state.checked_king(), Some(Square::E1));
        assert!(state.position().legal_moves().is_empty());
        assert_eq!(state.san_moves(), vec!["f3", "e5", "g4", "Qh4#"]);
        // No more moves once the game is over.
        assert_eq!(state.request_move(Square::A2, Square::A3), MoveRequest::Rejected);
        assert_eq!(state.select_square(Square::A2).possible_moves(), &[] as &[Square]);
    }

    #[test]
    fn selection() {
        let state = GameState::new().select_square(Square::G1);
        assert_eq!(state.selected_square(), Some(Square::G1));
        assert_eq!(state.possible_moves(), &[Square::H3, Square::F3]);
        // Opponent pieces and empty squares can not be selected.
        let state = state.select_square(Square::G8);
        assert_eq!(state.selected_square(), None);
        assert!(state.possible_moves().is_empty());
        assert_eq!(GameState::new().select_square(Square::E4).selected_square(), None);
        // Applying a move clears the selection.
        let state = GameState::new().select_square(Square::E2);
        let state = play(&state, Square::E2, Square::E4);
        assert_eq!(state.selected_square(), None);
    }

    #[test]
    fn rejected_requests() {
        let state = GameState::new();
        assert_eq!(state.request_move(Square::E4, Square::E5), MoveRequest::Rejected);
        assert_eq!(state.request_move(Square::E7, Square::E5), MoveRequest::Rejected);
        assert_eq!(state.request_move(Square::E2, Square::E5), MoveRequest::Rejected);
        let illegal = Move::Regular {
            from: Square::E2,
            to: Square::E5,
            captured: None,
        };
        assert_eq!(state.apply_move(&illegal), state);
        assert_eq!(state.try_apply_move(&illegal), None);
    }

    #[test]
    fn no_moves_after_the_game_is_over() {
        // King and bishop against king: the position still has legal moves.
        let position = Position::try_from("4k3/8/8/8/8/8/8/2B1K3 w - - 0 1").unwrap();
        let state = GameState::from_position(position);
        assert_eq!(state.status(), GameStatus::InsufficientMaterial);
        let king_move = position.build_move(Square::E1, Square::D2, None).unwrap();
        assert_eq!(state.try_apply_move(&king_move), None);
        assert_eq!(state.apply_move(&king_move), state);
        assert_eq!(state.request_move(Square::E1, Square::D2), MoveRequest::Rejected);

        let position = Position::try_from("1r2k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let state = GameState::from_position(position);
        let promoted = state.try_complete_promotion(Square::A7, Square::B8, Promotion::Rook);
        assert_eq!(promoted.map(|next| next.cursor()), Some(1));
        assert_eq!(
            state.try_complete_promotion(Square::A7, Square::A6, Promotion::Rook),
            None
        );
    }

    #[test]
    fn undo_redo() {
        let start = GameState::new();
        let first = play(&start, Square::E2, Square::E4);
        let second = play(&first, Square::E7, Square::E5);
        let undone = second.undo();
        assert_eq!(undone.position(), first.position());
        assert_eq!(undone.cursor(), 1);
        assert!(undone.can_redo());
        assert_eq!(undone.redo().position(), second.position());
        // Undo before the first move shows the initial position and keeps the
        // history.
        let beginning = undone.undo().undo().undo();
        assert_eq!(beginning.position(), &Position::starting());
        assert_eq!(beginning.history().len(), 2);
        assert!(!beginning.can_undo());
        assert_eq!(beginning.redo().redo().position(), second.position());
        assert_eq!(beginning.redo().redo().redo(), beginning.redo().redo());
        // A new move discards the redo tail.
        let branched = undone.select_square(Square::D7);
        let branched = play(&branched, Square::D7, Square::D5);
        assert_eq!(branched.history().len(), 2);
        assert!(!branched.can_redo());
        assert_eq!(branched.san_moves(), vec!["e4", "d5"]);
    }

    #[test]
    fn jump_and_restart() {
        let mut state = GameState::new();
        for (from, to) in [
            (Square::E2, Square::E4),
            (Square::E7, Square::E5),
            (Square::G1, Square::F3),
        ] {
            state = play(&state, from, to);
        }
        let jumped = state.jump_to(1);
        assert_eq!(jumped.cursor(), 1);
        assert_eq!(jumped.current_player(), Player::Black);
        assert_eq!(jumped.jump_to(3).position(), state.position());
        assert_eq!(state.jump_to(4), state);
        let restarted = state.restart();
        assert_eq!(restarted, GameState::new());
    }

    #[test]
    fn promotion_is_deferred() {
        let position = Position::try_from("1r2k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let state = GameState::from_position(position);
        assert_eq!(
            state.request_move(Square::A7, Square::B8),
            MoveRequest::PendingPromotion {
                from: Square::A7,
                to: Square::B8,
            }
        );
        let promoted = state.complete_promotion(Square::A7, Square::B8, Promotion::Knight);
        assert_eq!(
            promoted.board().at(Square::B8),
            Some(Piece::new(Player::White, PieceKind::Knight))
        );
        assert_eq!(
            promoted.captured_pieces(),
            vec![Piece::new(Player::Black, PieceKind::Rook)]
        );
        assert_eq!(promoted.captured_value(Player::White), 5);
        assert_eq!(promoted.material_balance(), 5);
        assert_eq!(promoted.san_moves(), vec!["axb8=N"]);
        // Not a promotion.
        assert_eq!(
            state.complete_promotion(Square::E1, Square::E2, Promotion::Queen),
            state
        );
        // Undo returns to the custom set-up.
        assert_eq!(promoted.undo().position(), &position);
        assert_eq!(promoted.restart().position(), &position);
    }

    #[test]
    fn captured_pieces_follow_the_cursor() {
        let mut state = GameState::new();
        for (from, to) in [
            (Square::E2, Square::E4),
            (Square::D7, Square::D5),
            (Square::E4, Square::E5),
            (Square::F7, Square::F5),
            (Square::E5, Square::F6),
            (Square::D5, Square::D4),
            (Square::F6, Square::G7),
        ] {
            state = play(&state, from, to);
        }
        assert_eq!(
            state.captured_pieces(),
            vec![
                Piece::new(Player::Black, PieceKind::Pawn),
                Piece::new(Player::Black, PieceKind::Pawn)
            ]
        );
        assert_eq!(state.material_balance(), 2);
        assert_eq!(state.undo().captured_pieces().len(), 1);
        assert!(state.jump_to(4).captured_pieces().is_empty());
        assert_eq!(
            state.san_moves(),
            vec!["e4", "d5", "e5", "f5", "exf6", "d4", "fxg7"]
        );
    }

    #[test]
    fn move_pairs() {
        let state = play(&GameState::new(), Square::E2, Square::E4);
        let state = play(&state, Square::E7, Square::E5);
        let state = play(&state, Square::G1, Square::F3);
        assert_eq!(
            state.move_pairs(),
            vec![
                MovePair {
                    number: 1,
                    white: Some("e4".to_string()),
                    black: Some("e5".to_string()),
                },
                MovePair {
                    number: 2,
                    white: Some("Nf3".to_string()),
                    black: None,
                },
            ]
        );
        let position = Position::try_from("4k3/8/8/8/8/8/4P3/4K3 b - - 0 12").unwrap();
        let state = play(&GameState::from_position(position), Square::E8, Square::D7);
        let state = play(&state, Square::E2, Square::E4);
        assert_eq!(
            state.move_pairs(),
            vec![
                MovePair {
                    number: 12,
                    white: None,
                    black: Some("Kd7".to_string()),
                },
                MovePair {
                    number: 13,
                    white: Some("e4".to_string()),
                    black: None,
                },
            ]
        );
    }
}
