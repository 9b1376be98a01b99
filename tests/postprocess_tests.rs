// Unit tests for the deterministic simple cleanup.

use voxsession::apply_simple;

#[test]
fn test_trims_surrounding_whitespace() {
    assert_eq!(apply_simple("  Hi there.  "), "Hi there.");
}

#[test]
fn test_collapses_inner_whitespace_runs() {
    assert_eq!(apply_simple("hello   world"), "Hello world.");
    assert_eq!(apply_simple("one\t two\nthree"), "One two three.");
}

#[test]
fn test_capitalizes_first_letter() {
    assert_eq!(apply_simple("hello"), "Hello.");
}

#[test]
fn test_appends_terminal_period_after_alphanumeric() {
    assert_eq!(apply_simple("it is 42"), "It is 42.");
}

#[test]
fn test_keeps_existing_terminal_punctuation() {
    assert_eq!(apply_simple("really?"), "Really?");
    assert_eq!(apply_simple("Stop!"), "Stop!");
}

#[test]
fn test_empty_and_blank_input() {
    assert_eq!(apply_simple(""), "");
    assert_eq!(apply_simple("   \t  "), "");
}

#[test]
fn test_never_loses_the_words() {
    let input = "  some   recognized words ";
    let cleaned = apply_simple(input);
    for word in input.split_whitespace() {
        assert!(
            cleaned.to_lowercase().contains(&word.to_lowercase()),
            "cleanup lost {:?} from {:?}",
            word,
            cleaned
        );
    }
}
