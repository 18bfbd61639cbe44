//! Glob-style key patterns (`user:*`, `session:??`, `shard:[0-3]`) for the
//! local tier.
//!
//! Follows Redis `KEYS` syntax so a pattern deletes the same keys on either
//! tier: `*` matches any run of characters, `?` exactly one, `[...]` one
//! character from a set (`^` negates, `a-z` is a range) and `\` makes the
//! next character literal. A `[` without a closing `]` is literal.

use regex::Regex;

use crate::error::CacheResult;

#[derive(Debug, Clone)]
pub struct KeyPattern {
    regex: Regex,
}

impl KeyPattern {
    pub fn new(pattern: &str) -> CacheResult<Self> {
        let chars: Vec<char> = pattern.chars().collect();
        let mut expr = String::with_capacity(pattern.len() + 12);
        expr.push_str("(?s)^");

        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                '\\' if i + 1 < chars.len() => {
                    i += 1;
                    push_literal(&mut expr, chars[i]);
                }
                '[' => match char_class(&chars[i + 1..]) {
                    Some((class, consumed)) => {
                        expr.push_str(&class);
                        i += consumed;
                    }
                    None => push_literal(&mut expr, '['),
                },
                ch => push_literal(&mut expr, ch),
            }
            i += 1;
        }
        expr.push('$');

        Ok(Self {
            regex: Regex::new(&expr)?,
        })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}

fn push_literal(expr: &mut String, ch: char) {
    let mut buf = [0u8; 4];
    expr.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
}

/// Translate the body of a `[...]` set. `rest` starts right after the `[`;
/// returns the regex class and how many characters it used, including the
/// closing `]`.
fn char_class(rest: &[char]) -> Option<(String, usize)> {
    let negated = rest.first() == Some(&'^');
    let mut i = usize::from(negated);
    let mut members = String::new();

    loop {
        let ch = *rest.get(i)?;
        match ch {
            ']' => break,
            '\\' => {
                i += 1;
                push_literal(&mut members, *rest.get(i)?);
            }
            _ if rest.get(i + 1) == Some(&'-') && rest.get(i + 2).is_some_and(|c| *c != ']') => {
                // Redis accepts reversed ranges such as `[z-a]`
                let end = rest[i + 2];
                let (lo, hi) = if ch <= end { (ch, end) } else { (end, ch) };
                push_literal(&mut members, lo);
                members.push('-');
                push_literal(&mut members, hi);
                i += 2;
            }
            _ => push_literal(&mut members, ch),
        }
        i += 1;
    }

    if members.is_empty() {
        return None;
    }
    let class = format!("[{}{}]", if negated { "^" } else { "" }, members);
    Some((class, i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_wildcard() {
        let p = KeyPattern::new("user:*").unwrap();
        assert!(p.matches("user:1"));
        assert!(p.matches("user:"));
        assert!(p.matches("user:42:profile"));
        assert!(!p.matches("order:1"));
        assert!(!p.matches("xuser:1"));
    }

    #[test]
    fn test_single_char_wildcard() {
        let p = KeyPattern::new("session:??").unwrap();
        assert!(p.matches("session:ab"));
        assert!(!p.matches("session:abc"));
        assert!(!p.matches("session:a"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let p = KeyPattern::new("cache.v1(*)").unwrap();
        assert!(p.matches("cache.v1(items)"));
        assert!(!p.matches("cacheXv1(items)"));
    }

    #[test]
    fn test_no_wildcard_is_exact_match() {
        let p = KeyPattern::new("order:1").unwrap();
        assert!(p.matches("order:1"));
        assert!(!p.matches("order:10"));
    }

    #[test]
    fn test_character_set() {
        let p = KeyPattern::new("user:[12]").unwrap();
        assert!(p.matches("user:1"));
        assert!(p.matches("user:2"));
        assert!(!p.matches("user:3"));
        assert!(!p.matches("user:[12]"));
    }

    #[test]
    fn test_negated_set_and_range() {
        let negated = KeyPattern::new("h[^e]llo").unwrap();
        assert!(negated.matches("hallo"));
        assert!(!negated.matches("hello"));

        let range = KeyPattern::new("shard:[0-3]").unwrap();
        assert!(range.matches("shard:0"));
        assert!(range.matches("shard:3"));
        assert!(!range.matches("shard:4"));

        let reversed = KeyPattern::new("shard:[3-0]").unwrap();
        assert!(reversed.matches("shard:2"));
    }

    #[test]
    fn test_backslash_escapes() {
        let p = KeyPattern::new(r"literal\*star").unwrap();
        assert!(p.matches("literal*star"));
        assert!(!p.matches("literalXstar"));

        let in_set = KeyPattern::new(r"k[\]x]").unwrap();
        assert!(in_set.matches("k]"));
        assert!(in_set.matches("kx"));
    }

    #[test]
    fn test_unclosed_bracket_is_literal() {
        let p = KeyPattern::new("tag:[open").unwrap();
        assert!(p.matches("tag:[open"));
        assert!(!p.matches("tag:o"));
    }
}
