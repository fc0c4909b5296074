//! Turn scoring.
//!
//! Scores are percentages. The drawer earns the share of guessers who
//! found the word, rounded down. A guesser earns the share of guessers
//! who had not yet found it at the moment of their guess (themselves
//! included), rounded up, so earlier guesses pay more.

/// Drawer's score for a turn where `correct` of `total_guessers`
/// guessed the word.
pub fn drawer_score(correct: usize, total_guessers: usize) -> u32 {
    if total_guessers == 0 {
        return 0;
    }
    let correct = correct.min(total_guessers);
    (correct * 100 / total_guessers) as u32
}

/// Score for a correct guess made while `unguessed` of `total_guessers`
/// (including the guesser) still had not found the word.
pub fn guesser_score(unguessed: usize, total_guessers: usize) -> u32 {
    if total_guessers == 0 {
        return 0;
    }
    let unguessed = unguessed.min(total_guessers);
    (unguessed * 100).div_ceil(total_guessers) as u32
}

/// Whether the share of guessers still missing the word is at or below
/// `percent`. Integer arithmetic so exact boundaries (3 of 10 found is
/// exactly 70% unguessed) compare exactly.
pub fn unguessed_at_most(correct: usize, total_guessers: usize, percent: u32) -> bool {
    if total_guessers == 0 {
        return false;
    }
    let unguessed = total_guessers.saturating_sub(correct);
    unguessed * 100 <= percent as usize * total_guessers
}
