//! Input sanitizer — bounds and filters raw user text before it reaches the
//! model or is echoed back.
//!
//! Legal drafting here is bilingual: the allow-list keeps Latin and Arabic
//! script plus ordinary punctuation, and drops everything else (control
//! characters, zero-width marks, emoji). Never fails — worst case is an
//! empty string.

/// Default cap on input length (characters).
pub const MAX_INPUT_CHARS: usize = 10_000;

/// Truncate `input` to `max_chars` characters, strip disallowed characters,
/// and trim the result.
pub fn sanitize(input: &str, max_chars: usize) -> String {
    input
        .chars()
        .take(max_chars)
        .filter(|c| allowed(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Sanitize with the default length cap.
pub fn sanitize_default(input: &str) -> String {
    sanitize(input, MAX_INPUT_CHARS)
}

fn allowed(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c.is_whitespace()
        // Latin-1 letters (accented names in contracts)
        || ('\u{00C0}'..='\u{00FF}').contains(&c)
        // Arabic script block, including Arabic punctuation and digits
        || ('\u{0600}'..='\u{06FF}').contains(&c)
        || matches!(
            c,
            '.' | ','
                | ';'
                | ':'
                | '!'
                | '?'
                | '\''
                | '"'
                | '('
                | ')'
                | '['
                | ']'
                | '{'
                | '}'
                | '-'
                | '_'
                | '/'
                | '\\'
                | '+'
                | '='
                | '%'
                | '&'
                | '*'
                | '#'
                | '@'
                | '§'
                | '«'
                | '»'
                | '\u{2018}'
                | '\u{2019}'
                | '\u{201C}'
                | '\u{201D}'
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_input_is_truncated_to_cap() {
        let input = "a".repeat(15_000);
        let out = sanitize_default(&input);
        assert_eq!(out.chars().count(), MAX_INPUT_CHARS);
    }

    #[test]
    fn arabic_and_latin_survive() {
        let input = "أريد صياغة عقد عمل for ACME Ltd. — البند 3";
        let out = sanitize_default(input);
        assert!(out.contains("عقد عمل"));
        assert!(out.contains("ACME Ltd."));
        // em-dash is not on the allow-list
        assert!(!out.contains('—'));
    }

    #[test]
    fn control_characters_are_stripped() {
        let out = sanitize_default("hello\u{0000}\u{0007} world\u{200B}!");
        assert_eq!(out, "hello world!");
    }

    #[test]
    fn arabic_punctuation_survives() {
        let out = sanitize_default("ما هو البند؟ أولاً، ثانياً؛");
        assert!(out.contains('؟'));
        assert!(out.contains('،'));
        assert!(out.contains('؛'));
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert_eq!(sanitize_default(""), "");
        assert_eq!(sanitize_default("   "), "");
        assert_eq!(sanitize_default("\u{0001}\u{0002}"), "");
    }
}
