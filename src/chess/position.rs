//! A single [Chess Position]: piece placement plus the side to move, castling
//! rights, the en passant pawn and both move counters.
//!
//! Legality filtering and game status detection are implemented on top of
//! [`Position`]: every query is a pure function of the snapshot, and probing
//! a move happens on a scratch copy of the board.
//!
//! [Chess Position]: https://www.chessprogramming.org/Chess_Position

use std::fmt;
use std::num::NonZeroU16;

use anyhow::{bail, Context};
use strum::IntoEnumIterator;

use crate::chess::attacks;
use crate::chess::board::Board;
use crate::chess::core::{
    CastleRights,
    CastlingSide,
    Piece,
    PieceKind,
    Player,
    Promotion,
    Rank,
    Square,
};
use crate::chess::movegen::{self, Targets};
use crate::chess::moves::{Move, PieceMove};
use crate::chess::special::{self, MoveType};

/// Outcome of the game as seen from a single position. Draws by the
/// fifty-move rule and threefold repetition are not tracked.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameStatus {
    Ongoing,
    Checkmate,
    Stalemate,
    InsufficientMaterial,
}

impl GameStatus {
    /// Returns true if no more moves can be made.
    #[must_use]
    pub const fn is_over(self) -> bool {
        !matches!(self, Self::Ongoing)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ongoing => "ongoing",
            Self::Checkmate => "checkmate",
            Self::Stalemate => "stalemate",
            Self::InsufficientMaterial => "insufficient material",
        })
    }
}

/// State of the chess game: board, side to move, castling rights, en passant
/// and move counters. It has 1:1 relationship with [Forsyth-Edwards Notation]
/// (FEN).
///
/// [`Position::try_from()`] provides a convenient interface for creating a
/// [`Position`]. It will clean up the input (trim newlines and whitespace) and
/// attempt to parse in either FEN or a version of [Extended Position
/// Description] (EPD): FEN without Halfmove Clock and Fullmove Counter.
///
/// [Forsyth-Edwards Notation]: https://www.chessprogramming.org/Forsyth-Edwards_Notation
/// [Extended Position Description]: https://www.chessprogramming.org/Extended_Position_Description
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    board: Board,
    castling: CastleRights,
    side_to_move: Player,
    /// [Halfmove Clock][^ply] keeps track of the number of (half-)moves
    /// since the last capture or pawn move.
    ///
    /// [Halfmove Clock]: https://www.chessprogramming.org/Halfmove_Clock
    /// [^ply]: "Half-move" or ["ply"](https://www.chessprogramming.org/Ply) means a move of only
    ///     one side.
    halfmove_clock: u8,
    fullmove_counter: NonZeroU16,
    /// The pawn that made a two-square advance on the previous move. FEN
    /// stores the square it skipped instead.
    en_passant: Option<Square>,
}

impl Position {
    /// The initial position of a standard game.
    ///
    /// ```
    /// use kibitz::chess::position::Position;
    ///
    /// let starting_position = Position::starting();
    /// assert_eq!(
    ///     &starting_position.to_string(),
    ///     "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
    /// );
    /// ```
    #[must_use]
    pub fn starting() -> Self {
        Self {
            board: Board::starting(),
            castling: CastleRights::ALL,
            ..Self::empty()
        }
    }

    /// Creates an empty board to be filled by parser.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            board: Board::empty(),
            castling: CastleRights::empty(),
            side_to_move: Player::White,
            halfmove_clock: 0,
            fullmove_counter: NonZeroU16::MIN,
            en_passant: None,
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn side_to_move(&self) -> Player {
        self.side_to_move
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn castling(&self) -> CastleRights {
        self.castling
    }

    /// Square of the pawn that can be captured en passant.
    #[must_use]
    pub const fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn halfmove_clock(&self) -> u8 {
        self.halfmove_clock
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn fullmove_counter(&self) -> u16 {
        self.fullmove_counter.get()
    }

    pub(super) const fn us(&self) -> Player {
        self.side_to_move
    }

    pub(super) const fn they(&self) -> Player {
        self.us().opponent()
    }

    /// Reads a position in Forsyth-Edwards Notation. The four-part EPD form
    /// without move counters is accepted too.
    ///
    /// FEN ::=
    ///       Piece Placement
    ///   ' ' Side to move
    ///   ' ' Castling ability
    ///   ' ' En passant target square
    ///   ' ' Halfmove clock
    ///   ' ' Fullmove counter
    ///
    /// Missing counters are read as "0 1".
    ///
    /// Positions that can not occur in a game (see [`Position::validate`])
    /// are rejected.
    ///
    /// The input has to be exact: single spaces between the parts and nothing
    /// around them. [`Position::try_from`] trims user input first.
    pub fn from_fen(input: &str) -> anyhow::Result<Self> {
        let mut parts = input.split(' ');
        let mut result = Self::empty();
        result.board = match parts.next() {
            Some(placement) => Board::from_placement(placement)?,
            None => bail!("incorrect FEN: missing pieces placement"),
        };
        result.side_to_move = match parts.next() {
            Some(value) => value.try_into()?,
            None => bail!("incorrect FEN: missing side to move"),
        };
        result.castling = match parts.next() {
            Some(value) => value.try_into()?,
            None => bail!("incorrect FEN: missing castling rights"),
        };
        result.en_passant = match parts.next() {
            Some("-") => None,
            Some(value) => {
                let target = Square::try_from(value)?;
                let expected_rank = Rank::en_passant_capture(result.us());
                // The skipped square is one step behind the pushed pawn.
                match target.shift(result.they().push_direction()) {
                    Some(pawn) if pawn.rank() == expected_rank => Some(pawn),
                    _ => bail!("incorrect FEN: en passant square can not be {target}"),
                }
            },
            None => bail!("incorrect FEN: missing en passant square"),
        };
        let mut epd = false;
        match parts.next() {
            Some(value) => {
                if !value.bytes().all(|c| c.is_ascii_digit()) {
                    bail!("halfmove clock can not contain anything other than digits");
                }
                result.halfmove_clock = value.parse::<u8>().with_context(|| {
                    format!("incorrect FEN: halfmove clock can not be parsed {value}")
                })?;
            },
            // This is a correct EPD.
            None => epd = true,
        };
        if !epd {
            result.fullmove_counter = match parts.next() {
                Some(value) => {
                    if !value.bytes().all(|c| c.is_ascii_digit()) {
                        bail!("fullmove counter can not contain anything other than digits");
                    }
                    value.parse::<NonZeroU16>().with_context(|| {
                        format!("incorrect FEN: fullmove counter can not be parsed {value}")
                    })?
                },
                None => bail!("incorrect FEN: missing fullmove counter"),
            };
            if parts.next().is_some() {
                bail!("trailing symbols are not allowed in FEN");
            }
        }
        result.validate()?;
        Ok(result)
    }

    /// Checks that the position can be reached in a game of chess:
    ///
    /// - Each side has exactly one king.
    /// - Each side has at most 8 pawns and no pawns stand on the back ranks.
    /// - The side that just moved is not in check and the side to move is in
    ///   check from at most two pieces.
    /// - The pawn that could be captured en passant really made a two-square
    ///   advance: the squares it came through are empty and the position
    ///   before that move was legal too.
    pub fn validate(&self) -> anyhow::Result<()> {
        for player in [Player::White, Player::Black] {
            let kings = self.board.count(player, PieceKind::King);
            if kings != 1 {
                bail!("expected 1 {player:?} king, got {kings}");
            }
            let pawns = self.board.count(player, PieceKind::Pawn);
            if pawns > 8 {
                bail!("expected at most 8 {player:?} pawns, got {pawns}");
            }
        }
        if let Some((square, _)) = self.board.pieces().find(|(square, piece)| {
            piece.kind == PieceKind::Pawn
                && (square.rank() == Rank::One || square.rank() == Rank::Eight)
        }) {
            bail!("pawns can not stand on back ranks, found one on {square}");
        }
        if self.is_in_check(self.they()) {
            bail!("{:?} king can not be in check when {:?} is to move", self.they(), self.us());
        }
        let checkers = self.checkers(self.us()).len();
        if checkers > 2 {
            bail!("at most 2 pieces can give check, got {checkers}");
        }
        if let Some(pawn) = self.en_passant {
            if self.board.at(pawn) != Some(Piece::new(self.they(), PieceKind::Pawn)) {
                bail!("expected a pushed {:?} pawn on {pawn}", self.they());
            }
            let step = self.they().pawn_step();
            let (Some(skipped), Some(origin)) = (pawn.offset(0, -step), pawn.offset(0, -2 * step))
            else {
                bail!("en passant pawn on {pawn} could not advance two squares");
            };
            if self.board.at(skipped).is_some() || self.board.at(origin).is_some() {
                bail!("en passant pawn on {pawn} could not pass through occupied squares");
            }
            let mut before = self.board;
            let _ = before.relocate(pawn, origin);
            if before
                .king(self.us())
                .is_some_and(|king| attacks::is_square_threatened(&before, king, self.us()))
            {
                bail!("{:?} king was in check before the en passant pawn advanced", self.us());
            }
        }
        Ok(())
    }

    /// Returns true if [`Position::validate`] finds no problems.
    #[must_use]
    pub fn is_legal(&self) -> bool {
        self.validate().is_ok()
    }

    /// Destinations of the piece on `square` that follow its movement pattern,
    /// including castling and en passant, without regard to king safety.
    #[must_use]
    pub fn pseudo_legal_targets(&self, square: Square) -> Targets {
        movegen::pseudo_legal_targets(self, square)
    }

    /// Checks whether the piece on `from` can move to `to`: the move is
    /// pseudo-legal and does not leave the mover's king in check. The piece
    /// does not have to belong to the side to move.
    #[must_use]
    pub fn is_legal_move(&self, from: Square, to: Square) -> bool {
        let Some(piece) = self.board.at(from) else {
            return false;
        };
        if !self.pseudo_legal_targets(from).contains(&to) {
            return false;
        }
        // Any promotion is equally safe for the king.
        let Some(probe) = self.construct(from, to, Promotion::Queen) else {
            return false;
        };
        let mut scratch = self.board;
        play(&mut scratch, &probe);
        match scratch.king(piece.owner) {
            Some(king) => !attacks::is_square_threatened(&scratch, king, piece.owner),
            None => true,
        }
    }

    /// Destinations the piece on `square` can legally move to. Promotions to
    /// different pieces share the destination and are listed once.
    #[must_use]
    pub fn legal_targets(&self, square: Square) -> Vec<Square> {
        self.pseudo_legal_targets(square)
            .into_iter()
            .filter(|&to| self.is_legal_move(square, to))
            .collect()
    }

    /// All legal moves of the side to move, with promotions expanded into the
    /// four possible pieces.
    #[must_use]
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        for (from, piece) in self.board.player_pieces(self.us()) {
            for to in self.legal_targets(from) {
                if special::is_promotion_trigger(piece, from) {
                    moves.extend(
                        Promotion::iter().filter_map(|promotion| self.construct(from, to, promotion)),
                    );
                } else if let Some(next_move) = self.construct(from, to, Promotion::Queen) {
                    moves.push(next_move);
                }
            }
        }
        moves
    }

    /// Returns true if the king of `player` is attacked.
    #[must_use]
    pub fn is_in_check(&self, player: Player) -> bool {
        self.board
            .king(player)
            .is_some_and(|king| attacks::is_square_threatened(&self.board, king, player))
    }

    /// Returns true if the side to move is in check.
    #[must_use]
    pub fn in_check(&self) -> bool {
        self.is_in_check(self.us())
    }

    /// Square of the side to move king if it is in check.
    #[must_use]
    pub fn checked_king(&self) -> Option<Square> {
        self.board
            .king(self.us())
            .filter(|&king| attacks::is_square_threatened(&self.board, king, self.us()))
    }

    /// Squares of the pieces opposing `defender` that attack `square`.
    #[must_use]
    pub fn attackers(&self, square: Square, defender: Player) -> Vec<Square> {
        attacks::attackers(&self.board, square, defender).to_vec()
    }

    fn checkers(&self, player: Player) -> Vec<Square> {
        self.board
            .king(player)
            .map(|king| self.attackers(king, player))
            .unwrap_or_default()
    }

    /// Returns true if any piece of `player` has a legal destination.
    #[must_use]
    pub fn has_any_legal_move(&self, player: Player) -> bool {
        self.board
            .player_pieces(player)
            .any(|(from, _)| {
                self.pseudo_legal_targets(from)
                    .into_iter()
                    .any(|to| self.is_legal_move(from, to))
            })
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_checkmate(&self) -> bool {
        self.in_check() && !self.has_any_legal_move(self.us())
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_stalemate(&self) -> bool {
        !self.in_check() && !self.has_any_legal_move(self.us())
    }

    /// Detects positions where neither side can possibly checkmate:
    ///
    /// - Bare kings.
    /// - King and a single bishop or knight against the bare king.
    /// - King and two knights against the bare king.
    /// - Only bishops besides the kings, all on squares of the same color.
    #[must_use]
    pub fn has_insufficient_material(&self) -> bool {
        let others: Vec<(Square, Piece)> = self
            .board
            .pieces()
            .filter(|(_, piece)| piece.kind != PieceKind::King)
            .collect();
        match others.as_slice() {
            [] => true,
            [(_, piece)] => matches!(piece.kind, PieceKind::Bishop | PieceKind::Knight),
            [(_, first), (_, second)]
                if first.owner == second.owner
                    && first.kind == PieceKind::Knight
                    && second.kind == PieceKind::Knight =>
            {
                true
            },
            [(first, _), ..] => others.iter().all(|(square, piece)| {
                piece.kind == PieceKind::Bishop && square.is_light() == first.is_light()
            }),
        }
    }

    /// Checkmate takes precedence over stalemate, and both take precedence
    /// over insufficient material.
    #[must_use]
    pub fn status(&self) -> GameStatus {
        if !self.has_any_legal_move(self.us()) {
            if self.in_check() {
                GameStatus::Checkmate
            } else {
                GameStatus::Stalemate
            }
        } else if self.has_insufficient_material() {
            GameStatus::InsufficientMaterial
        } else {
            GameStatus::Ongoing
        }
    }

    /// Creates the move relocating a piece of the side to move from `from`
    /// to `to` if it is legal. `promotion` has to be provided for pawns
    /// reaching the last rank and only for them.
    #[must_use]
    pub fn build_move(&self, from: Square, to: Square, promotion: Option<Promotion>) -> Option<Move> {
        let piece = self.board.at(from)?;
        if piece.owner != self.us() || !self.is_legal_move(from, to) {
            return None;
        }
        match (special::is_promotion_trigger(piece, from), promotion) {
            (true, Some(promotion)) => self.construct(from, to, promotion),
            (false, None) => self.construct(from, to, Promotion::Queen),
            (true, None) | (false, Some(_)) => None,
        }
    }

    /// Classifies the move and fills in captured pieces. `promotion` is only
    /// used for promotions.
    fn construct(&self, from: Square, to: Square, promotion: Promotion) -> Option<Move> {
        let piece = self.board.at(from)?;
        let captured = self.board.at(to);
        Some(match special::classify_move(self, from, to)? {
            MoveType::Regular => Move::Regular { from, to, captured },
            MoveType::Promotion => Move::Promotion {
                from,
                to,
                promotion,
                captured,
            },
            MoveType::Castling => {
                let side = if to > from {
                    CastlingSide::Short
                } else {
                    CastlingSide::Long
                };
                let rook_to = side.destinations(piece.owner).1;
                Move::Castling {
                    king: PieceMove { from, to },
                    rook: PieceMove {
                        from: side.rook_square(piece.owner),
                        to: rook_to,
                    },
                }
            },
            MoveType::EnPassant => Move::EnPassant {
                from,
                to,
                captured_square: Square::new(to.file(), from.rank()),
            },
        })
    }

    /// Applies the move in a position. The move is expected to be legal, e.g.
    /// produced by [`Position::legal_moves`] or [`Position::build_move`].
    pub fn make_move(&mut self, next_move: &Move) {
        let moving = self.board.at(next_move.from());
        debug_assert!(
            moving.is_some_and(|piece| piece.owner == self.us()),
            "{next_move} does not move a piece of the side to move in {self}"
        );
        let pawn_move = moving.is_some_and(|piece| piece.kind == PieceKind::Pawn);

        play(&mut self.board, next_move);

        self.castling.remove(
            CastleRights::revoked_by(next_move.from()) | CastleRights::revoked_by(next_move.to()),
        );
        self.en_passant = match next_move {
            Move::Regular { from, to, .. }
                if pawn_move && (from.rank() as i8 - to.rank() as i8).abs() == 2 =>
            {
                Some(*to)
            },
            _ => None,
        };
        self.halfmove_clock = if pawn_move || next_move.is_capture() {
            0
        } else {
            self.halfmove_clock.saturating_add(1)
        };
        if self.us() == Player::Black {
            self.fullmove_counter = self.fullmove_counter.saturating_add(1);
        }
        self.side_to_move = self.they();
    }
}

/// Relocates the pieces touched by the move.
fn play(board: &mut Board, next_move: &Move) {
    match *next_move {
        Move::Regular { from, to, .. } => {
            let _ = board.relocate(from, to);
        },
        Move::Promotion {
            from, to, promotion, ..
        } => {
            if let Some(pawn) = board.set(from, None) {
                let _ = board.set(to, Some(Piece::new(pawn.owner, promotion.into())));
            }
        },
        Move::Castling { king, rook } => {
            let _ = board.relocate(king.from, king.to);
            let _ = board.relocate(rook.from, rook.to);
        },
        Move::EnPassant {
            from,
            to,
            captured_square,
        } => {
            let _ = board.relocate(from, to);
            let _ = board.set(captured_square, None);
        },
    }
}

impl TryFrom<&str> for Position {
    type Error = anyhow::Error;

    /// Trims the input and strips optional "fen " and "epd " prefixes before
    /// parsing it with [`Position::from_fen`].
    fn try_from(input: &str) -> anyhow::Result<Self> {
        let input = input.trim();
        for prefix in ["fen ", "epd "] {
            if let Some(stripped) = input.strip_prefix(prefix) {
                return Self::from_fen(stripped);
            }
        }
        Self::from_fen(input)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::starting()
    }
}

impl fmt::Display for Position {
    /// Prints board in Forsyth-Edwards Notation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", &self.board)?;
        write!(f, "{} ", &self.side_to_move)?;
        write!(f, "{} ", &self.castling)?;
        match self
            .en_passant
            .and_then(|pawn| pawn.shift(self.they().push_direction().opposite()))
        {
            Some(square) => write!(f, "{square} "),
            None => write!(f, "- "),
        }?;
        write!(f, "{} ", &self.halfmove_clock)?;
        write!(f, "{}", &self.fullmove_counter)?;
        Ok(())
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:?}", &self.board)?;
        writeln!(f, "Player to move: {:?}", &self.side_to_move)?;
        writeln!(f, "Fullmove counter: {:?}", &self.fullmove_counter)?;
        writeln!(f, "En Passant: {:?}", &self.en_passant)?;
        // bitflags' default fmt::Debug implementation is not very convenient:
        // dump FEN instead.
        writeln!(f, "Castling rights: {}", &self.castling)?;
        writeln!(f, "FEN: {self}")?;
        Ok(())
    }
}

/// Counts the leaf nodes of the legal move tree of given depth ([Perft]).
///
/// [Perft]: https://www.chessprogramming.org/Perft
#[must_use]
pub fn perft(position: &Position, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = position.legal_moves();
    if depth == 1 {
        return moves.len() as u64;
    }
    moves
        .iter()
        .map(|next_move| {
            let mut next = *position;
            next.make_move(next_move);
            perft(&next, depth - 1)
        })
        .sum()
}
