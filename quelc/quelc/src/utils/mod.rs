//! Small helpers shared across the compiler.

use std::sync::OnceLock;

use regex::Regex;

/// Generates names for synthesized ranges: the upper-cased first letter of
/// the entity name plus a monotonic zero-padded counter, e.g. `P001`.
#[derive(Debug, Clone, Default)]
pub struct NameGenerator {
    next_id: usize,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name_for(&mut self, seed: &str) -> String {
        self.next_id += 1;
        let first = seed
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('R');
        format!("{first}{:03}", self.next_id)
    }
}

/// An identifier safe to interpolate into SQL, unquoted or between
/// backticks.
pub fn valid_ident(s: &str) -> bool {
    static VALID_IDENT: OnceLock<Regex> = OnceLock::new();
    let re = VALID_IDENT.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());
    re.is_match(s)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_name_generator() {
        let mut gen = NameGenerator::new();
        assert_eq!(gen.name_for("products"), "P001");
        assert_eq!(gen.name_for("categories"), "C002");
    }

    #[test]
    fn test_valid_ident() {
        assert!(valid_ident("users"));
        assert!(valid_ident("_private"));
        assert!(!valid_ident(""));
        assert!(!valid_ident("1abc"));
        assert!(!valid_ident("a`b"));
        assert!(!valid_ident("a b"));
    }
}
