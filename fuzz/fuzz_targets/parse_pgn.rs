#![no_main]
use kibitz::notation::pgn::{self, Pgn, ReplayPolicy};
use libfuzzer_sys::fuzz_target;
use pretty_assertions::assert_eq;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(game) = Pgn::parse(input) else {
        return;
    };
    // Skipping never fails on the movetext, only on the starting position.
    if let Ok(state) = game.replay(ReplayPolicy::SkipInvalid) {
        let exported = pgn::export(&state);
        let replayed = pgn::import(&exported).expect("exported games should import");
        assert_eq!(replayed.position(), state.position());
    }
});
