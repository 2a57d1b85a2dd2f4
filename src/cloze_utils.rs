/// Splits an authored sentence into words on single spaces. Runs of spaces
/// produce empty words, so indices line up with what the author typed.
pub fn split_words(sentence: &str) -> Vec<&str> {
    sentence.split(' ').collect()
}

/// Parses a comma separated option list. Entries are trimmed but empty ones
/// are kept.
pub fn split_options(csv: &str) -> Vec<String> {
    csv.split(',').map(|option| option.trim().to_string()).collect()
}

/// Placeholder shown in place of a hidden word, at least three characters wide.
pub fn mask_word(word: &str) -> String {
    format!("[{}]", "_".repeat(word.chars().count().max(3)))
}

pub fn fill_word(answer: &str) -> String {
    format!("[{}]", answer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_words_keeps_positions() {
        assert_eq!(split_words("the cat sat"), vec!["the", "cat", "sat"]);
        assert_eq!(split_words("a  b"), vec!["a", "", "b"]);
        assert_eq!(split_words(""), vec![""]);
    }

    #[test]
    fn split_options_trims_and_keeps_empties() {
        assert_eq!(split_options("a, b ,c"), vec!["a", "b", "c"]);
        assert_eq!(split_options("a,b,"), vec!["a", "b", ""]);
    }

    #[test]
    fn mask_word_handles_unicode() {
        assert_eq!(mask_word("東京"), "[___]");
        assert_eq!(mask_word("elephant"), "[________]");
        assert_eq!(fill_word("cat"), "[cat]");
    }
}
