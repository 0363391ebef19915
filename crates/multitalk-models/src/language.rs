//! Published dataset partitions.

/// Languages for which annotation files are published.
pub const VALID_LANGUAGES: [&str; 20] = [
    "arabic",
    "catalan",
    "croatian",
    "czech",
    "dutch",
    "english",
    "french",
    "german",
    "greek",
    "hindi",
    "italian",
    "japanese",
    "mandarin",
    "polish",
    "portuguese",
    "russian",
    "spanish",
    "thai",
    "turkish",
    "ukrainian",
];

/// Check whether `language` names a published partition.
pub fn is_valid_language(language: &str) -> bool {
    VALID_LANGUAGES.contains(&language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_validation() {
        assert!(is_valid_language("english"));
        assert!(is_valid_language("ukrainian"));
        assert!(!is_valid_language("English"));
        assert!(!is_valid_language("klingon"));
    }
}
