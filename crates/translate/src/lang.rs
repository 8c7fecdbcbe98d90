//! Supported target languages.

const SUPPORTED: &[(&str, &str)] = &[
    ("vi", "Vietnamese"),
    ("en", "English"),
    ("ja", "Japanese"),
    ("id", "Indonesian"),
];

/// Normalize a language code, falling back to `vi` for anything unknown.
#[must_use]
pub fn norm_lang(code: &str) -> &'static str {
    let code = code.trim().to_ascii_lowercase();
    SUPPORTED
        .iter()
        .find(|(c, _)| *c == code)
        .map_or("vi", |(c, _)| c)
}

/// English name of the (normalized) language, used in the LLM prompt.
#[must_use]
pub fn lang_name(code: &str) -> &'static str {
    let code = norm_lang(code);
    SUPPORTED
        .iter()
        .find(|(c, _)| *c == code)
        .map_or("Vietnamese", |(_, n)| n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_known_codes() {
        assert_eq!(norm_lang("JA"), "ja");
        assert_eq!(norm_lang(" en "), "en");
    }

    #[test]
    fn unknown_codes_fall_back_to_vi() {
        assert_eq!(norm_lang("xx"), "vi");
        assert_eq!(norm_lang(""), "vi");
        assert_eq!(lang_name("zz"), "Vietnamese");
    }

    #[test]
    fn names_match_codes() {
        assert_eq!(lang_name("id"), "Indonesian");
        assert_eq!(lang_name("ja"), "Japanese");
    }
}
