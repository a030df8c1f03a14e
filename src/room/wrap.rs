/// Width used for chat bubbles.
pub const DEFAULT_LINE_WIDTH: usize = 80;

/// Greedy word wrap for message display.
///
/// Words are runs of non-whitespace and are never split: a word longer than
/// `max_line_length` sits alone on its own line. Lengths count characters,
/// not bytes. Empty or blank input yields no lines.
pub fn wrap(text: &str, max_line_length: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    // Characters in `current`, trailing space included.
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current_len > 0 && current_len + word_len > max_line_length {
            lines.push(current.trim_end().to_string());
            current.clear();
            current_len = 0;
        }

        current.push_str(word);
        current.push(' ');
        current_len += word_len + 1;
    }

    let last = current.trim_end();
    if !last.is_empty() {
        lines.push(last.to_string());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_words(seed: u64, count: usize, max_len: usize) -> Vec<String> {
        let mut state = seed;
        (0..count)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let len = 1 + (state >> 33) as usize % max_len;
                let letter = (b'a' + (state >> 40) as u8 % 26) as char;
                letter.to_string().repeat(len)
            })
            .collect()
    }

    #[test]
    fn empty_input_has_no_lines() {
        assert!(wrap("", 80).is_empty());
        assert!(wrap("   \t\n ", 80).is_empty());
    }

    #[test]
    fn short_text_fits_on_one_line() {
        assert_eq!(wrap("a b c", 80), vec!["a b c"]);
    }

    #[test]
    fn overlong_word_stays_whole() {
        let word = "x".repeat(100);
        assert_eq!(wrap(&word, 80), vec![word.clone()]);

        let lines = wrap(&format!("hi {word} there"), 80);
        assert_eq!(lines, vec!["hi".to_string(), word, "there".to_string()]);
    }

    #[test]
    fn breaks_before_the_word_that_overflows() {
        assert_eq!(wrap("aaaa bbbb cccc", 9), vec!["aaaa bbbb", "cccc"]);
        assert_eq!(wrap("aaaa bbbb cccc", 8), vec!["aaaa", "bbbb", "cccc"]);
    }

    #[test]
    fn internal_whitespace_collapses_to_single_spaces() {
        assert_eq!(wrap("  one \t two\n\nthree  ", 80), vec!["one two three"]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(wrap("héllo wörld", 11), vec!["héllo wörld"]);
    }

    #[test]
    fn lines_respect_width_and_keep_words_in_order() {
        for seed in 0..64 {
            let width = 10 + (seed as usize % 70);
            let words = sample_words(seed, 1 + seed as usize * 3, width);
            let text = words.join(" ");
            let lines = wrap(&text, width);

            for line in &lines {
                assert!(!line.is_empty());
                assert!(line.chars().count() <= width, "{line:?} wider than {width}");
            }

            let rejoined = lines.join(" ");
            let round_trip: Vec<&str> = rejoined.split_whitespace().collect();
            assert_eq!(round_trip, words);
        }
    }
}
