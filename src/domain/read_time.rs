//! Reading-time estimation over markup-stripped text.

/// Words per minute assumed by the estimate. Medium says they use 275 but
/// their rendered estimates match 265.
const WORDS_PER_MINUTE: u64 = 265;

/// Estimate a human-readable reading time such as `"4 min read"`.
///
/// Tokens are maximal runs of Unicode word characters; a run of CJK text with
/// no internal separators counts as a single token. The estimate is rounded
/// up to whole seconds, then to whole minutes, and floored at one minute, so
/// empty input still reads as `"1 min read"`.
pub fn read_time(text: &str) -> String {
    let words = word_count(text) as u64;
    let seconds = (words * 60).div_ceil(WORDS_PER_MINUTE);
    let minutes = seconds.div_ceil(60).max(1);
    format!("{minutes} min read")
}

fn word_count(text: &str) -> usize {
    let mut count = 0;
    let mut in_word = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            if !in_word {
                count += 1;
                in_word = true;
            }
        } else {
            in_word = false;
        }
    }
    count
}
