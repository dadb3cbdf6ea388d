use std::fs;

use kibitz::chess::position::{GameStatus, Position};
use kibitz::game::GameState;
use kibitz::notation::pgn::{self, Pgn, ReplayPolicy};
use kibitz::notation::{san, NotationError};
use pretty_assertions::assert_eq;

fn read_game() -> String {
    fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/data/fischer_spassky.pgn"
    ))
    .unwrap()
}

#[test]
fn fischer_spassky() {
    let pgn = Pgn::parse(&read_game()).unwrap();
    assert_eq!(pgn.tags.len(), 7);
    assert_eq!(pgn.tags["White"], "Fischer, Robert J.");
    assert_eq!(pgn.tags["Date"], "1992.11.04");
    assert_eq!(pgn.result.as_deref(), Some("1/2-1/2"));
    assert_eq!(pgn.moves.len(), 85);
    assert_eq!(pgn.moves.first().map(String::as_str), Some("e4"));
    assert_eq!(pgn.moves.last().map(String::as_str), Some("Re6"));

    let state = pgn.replay(ReplayPolicy::Abort).unwrap();
    assert_eq!(state.cursor(), 85);
    assert_eq!(state.status(), GameStatus::Ongoing);
    assert_eq!(
        state.position().to_string(),
        "8/8/4R1p1/2k3p1/1p4P1/1P1b1P2/3K1n2/8 b - - 2 43"
    );
    // Serializing the replayed moves reproduces the movetext.
    assert_eq!(state.san_moves(), pgn.moves);
}

#[test]
fn export_round_trip() {
    let state = pgn::import(&read_game()).unwrap();
    let exported = pgn::export_with_tags(
        &state,
        &[
            ("Event", "F/S Return Match"),
            ("White", "Fischer, Robert J."),
            ("Black", "Spassky, Boris V."),
            ("Result", "1/2-1/2"),
        ],
    );
    assert!(exported.starts_with("[Event \"F/S Return Match\"]\n[Site \"?\"]\n"));
    assert!(exported.lines().all(|line| line.len() <= 80));
    let movetext = exported
        .split("\n\n")
        .nth(1)
        .unwrap()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    assert!(movetext.starts_with("1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 4. Ba4 Nf6 5. O-O Be7"));
    assert!(movetext.contains(" 24. Bxf7+ Rxf7 25. Nxf7 Rxe1+ "));
    assert!(movetext.ends_with("42. g4 Bd3 43. Re6 1/2-1/2"));

    let reparsed = Pgn::parse(&exported).unwrap();
    assert_eq!(reparsed.tags["Black"], "Spassky, Boris V.");
    assert_eq!(reparsed.tags["Result"], "1/2-1/2");
    let replayed = reparsed.replay(ReplayPolicy::Abort).unwrap();
    assert_eq!(replayed.position(), state.position());
    assert_eq!(replayed.san_moves(), state.san_moves());
}

#[test]
fn export_follows_the_cursor() {
    let state = pgn::import("1. e4 e5 2. Nf3 Nc6 3. Bb5 a6").unwrap();
    let exported = state.jump_to(3).to_pgn();
    assert!(exported.ends_with("\n1. e4 e5 2. Nf3 *\n"));
    assert!(exported.contains("[Result \"*\"]"));
    // Nothing played yet.
    assert!(GameState::new().to_pgn().ends_with("\n\n*\n"));
}

#[test]
fn stalemate_game() {
    // Sam Loyd's ten-move stalemate.
    let state = pgn::import(
        "1. e3 a5 2. Qh5 Ra6 3. Qxa5 h5 4. h4 Rah6 5. Qxc7 f6 6. Qxd7+ Kf7 \
         7. Qxb7 Qd3 8. Qxb8 Qh7 9. Qxc8 Kg6 10. Qe6",
    )
    .unwrap();
    assert_eq!(state.status(), GameStatus::Stalemate);
    assert_eq!(pgn::result_token(&state), "1/2-1/2");
    assert!(state.to_pgn().ends_with("10. Qe6 1/2-1/2\n"));
}

#[test]
fn replay_errors() {
    let truncated = "1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 4. Bxc6 Bxc6";
    match pgn::import(truncated) {
        Err(NotationError::Replay { ply, token, reason }) => {
            assert_eq!(ply, 8);
            assert_eq!(token, "Bxc6");
            assert_eq!(*reason, NotationError::NoLegalMove("Bxc6".to_string()));
        },
        other => panic!("expected a replay error, got {other:?}"),
    }
    let skipped = Pgn::parse(truncated)
        .unwrap()
        .replay(ReplayPolicy::SkipInvalid)
        .unwrap();
    assert_eq!(skipped.cursor(), 7);

    assert!(matches!(
        pgn::import("[Event \"broken"),
        Err(NotationError::MalformedPgn(_))
    ));
    let error = pgn::import("[SetUp \"1\"]\n[FEN \"not a position\"]\n\n1. e4").unwrap_err();
    assert!(matches!(error, NotationError::InvalidFen { .. }));
    assert!(error.to_string().starts_with("invalid FEN 'not a position': "));
}

#[test]
fn san_for_every_legal_move() {
    // Every legal move has a unique SAN that resolves back to it.
    for fen in [
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1",
        "r2q1rk1/pP1p2pp/Q4n2/bbp1p3/Np6/1B3NBn/pPPP1PPP/R3K2R b KQ - 0 1",
    ] {
        let position = Position::try_from(fen).unwrap();
        let moves = position.legal_moves();
        let mut notations = Vec::new();
        for next_move in &moves {
            let notation = san::to_san(&position, next_move);
            assert_eq!(san::from_san(&position, &notation), Ok(*next_move), "{fen}: {notation}");
            notations.push(notation);
        }
        notations.sort();
        notations.dedup();
        assert_eq!(notations.len(), moves.len(), "{fen}");
    }
}
