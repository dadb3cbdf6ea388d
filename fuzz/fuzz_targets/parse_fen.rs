#![no_main]
use kibitz::chess::position::Position;
use libfuzzer_sys::fuzz_target;
use pretty_assertions::assert_eq;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(position) = Position::try_from(input) {
        let fen = position.to_string();
        let reparsed = Position::try_from(fen.as_str()).expect("printed FEN should be valid");
        assert_eq!(reparsed.to_string(), fen);
    }
});
