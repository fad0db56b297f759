//! Wildcard pattern compilation.
//!
//! The pattern operator family (`matchesPattern`, `containsPattern`, ...)
//! uses a small wildcard language: `*` matches one or more characters, `?`
//! matches exactly one, and a backslash escapes the following character,
//! disabling any wildcard meaning it would have. Patterns are compiled to
//! [`regex::Regex`] with the anchoring appropriate to each operator.

use regex::Regex;

use crate::error::EvaluationError;

/// How a compiled wildcard pattern is anchored against the field text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternAnchor {
    /// The whole field text must match (`matchesPattern`).
    Full,
    /// The pattern may match anywhere (`containsPattern`).
    Contains,
    /// The pattern must match at the start (`startsWithPattern`).
    Prefix,
    /// The pattern must match at the end (`endsWithPattern`).
    Suffix,
}

/// The escape character. A backslash before any character makes that
/// character literal, including `*`, `?`, and backslash itself.
const ESCAPE: char = '\\';

/// Compiles a wildcard pattern into an anchored regular expression.
///
/// # Errors
///
/// Returns [`EvaluationError::InvalidPattern`] if the built expression fails
/// to compile (practically unreachable, since all user characters are
/// escaped, but propagated rather than unwrapped).
pub fn compile_wildcard(
    pattern: &str,
    anchor: PatternAnchor,
    case_insensitive: bool,
) -> Result<Regex, EvaluationError> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    if case_insensitive {
        expr.push_str("(?i)");
    }
    if matches!(anchor, PatternAnchor::Full | PatternAnchor::Prefix) {
        expr.push('^');
    }

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            ESCAPE => {
                // Escaped character is always literal; a trailing escape
                // stands for a literal backslash.
                let literal = chars.next().unwrap_or(ESCAPE);
                expr.push_str(&regex::escape(&literal.to_string()));
            }
            // One-or-more characters.
            '*' => expr.push_str(".+"),
            // Exactly one character.
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }

    if matches!(anchor, PatternAnchor::Full | PatternAnchor::Suffix) {
        expr.push('$');
    }

    Regex::new(&expr).map_err(|err| EvaluationError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, anchor: PatternAnchor, text: &str) -> bool {
        compile_wildcard(pattern, anchor, false).unwrap().is_match(text)
    }

    #[test]
    fn star_matches_one_or_more() {
        assert!(matches("foo*bar", PatternAnchor::Full, "foobazbar"));
        assert!(matches("foo*bar", PatternAnchor::Full, "fooXbar"));
        // One-or-more: zero characters do not satisfy '*'
        assert!(!matches("foo*bar", PatternAnchor::Full, "foobar"));
        assert!(!matches("foo*bar", PatternAnchor::Full, "barfoo"));
    }

    #[test]
    fn question_mark_matches_exactly_one() {
        assert!(matches("b?t", PatternAnchor::Full, "bat"));
        assert!(!matches("b?t", PatternAnchor::Full, "bt"));
        assert!(!matches("b?t", PatternAnchor::Full, "boat"));
    }

    #[test]
    fn escape_disables_wildcards() {
        assert!(matches("5\\*5", PatternAnchor::Full, "5*5"));
        assert!(!matches("5\\*5", PatternAnchor::Full, "525"));
        assert!(matches("a\\?b", PatternAnchor::Full, "a?b"));
        assert!(!matches("a\\?b", PatternAnchor::Full, "aXb"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        assert!(matches("a.b", PatternAnchor::Full, "a.b"));
        assert!(!matches("a.b", PatternAnchor::Full, "aXb"));
        assert!(matches("(x)", PatternAnchor::Full, "(x)"));
    }

    #[test]
    fn anchoring_modes() {
        assert!(matches("foo*", PatternAnchor::Prefix, "foobar extra"));
        assert!(!matches("foo*", PatternAnchor::Prefix, "xfoobar"));
        assert!(matches("*bar", PatternAnchor::Suffix, "xx foobar"));
        assert!(!matches("*bar", PatternAnchor::Suffix, "barfoo"));
        assert!(matches("o?b", PatternAnchor::Contains, "xxfoobarxx"));
    }

    #[test]
    fn case_insensitive_flag() {
        let re = compile_wildcard("Foo*", PatternAnchor::Full, true).unwrap();
        assert!(re.is_match("FOOBAR"));
        assert!(re.is_match("foox"));
    }
}
