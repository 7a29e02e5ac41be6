use rowpipe::{OffsetSequencer, OffsetToken};

#[test]
fn sequencer_starts_at_one() {
    let sequencer = OffsetSequencer::new();
    assert_eq!(sequencer.current(), OffsetToken::from_sequence(1));
    assert_eq!(sequencer.current_id(), 1);
}

#[test]
fn current_does_not_advance_the_counter() {
    let sequencer = OffsetSequencer::new();
    assert_eq!(sequencer.current().as_str(), "1");
    assert_eq!(sequencer.current().as_str(), "1");
}

#[test]
fn advance_is_explicit_and_strictly_increasing() {
    let mut sequencer = OffsetSequencer::new();
    let mut tokens = Vec::new();
    for _ in 0..5 {
        tokens.push(sequencer.current().as_str().to_string());
        sequencer.advance();
    }
    assert_eq!(tokens, vec!["1", "2", "3", "4", "5"]);
}

#[test]
fn reset_returns_to_one() {
    let mut sequencer = OffsetSequencer::new();
    sequencer.advance();
    sequencer.advance();
    assert_eq!(sequencer.current_id(), 3);
    sequencer.reset();
    assert_eq!(sequencer.current().as_str(), "1");
}
