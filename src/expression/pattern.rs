//! `LIKE` pattern evaluation: `%` matches any run, `_` one character, and
//! `\` escapes the next character.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use regex::{Regex, RegexBuilder};

use crate::core::{DataError, Result};

lazy_static::lazy_static! {
    static ref PATTERN_CACHE: Mutex<LruCache<String, Arc<Regex>>> =
        Mutex::new(LruCache::new(NonZeroUsize::new(256).unwrap_or(NonZeroUsize::MIN)));
}

fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => regex.push_str(&regex::escape(&escaped.to_string())),
                None => regex.push_str(r"\\"),
            },
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
    }

    regex.push('$');
    regex
}

/// Answers patterns with a single leading and/or trailing `%` and no other
/// wildcard without compiling a regex.
fn fast_path(text: &str, pattern: &str, case_sensitive: bool) -> Option<bool> {
    if pattern.contains(['_', '\\']) {
        return None;
    }
    let leading = pattern.starts_with('%');
    let trailing = pattern.len() > usize::from(leading) && pattern.ends_with('%');
    let start = usize::from(leading);
    let end = pattern.len() - usize::from(trailing);
    let needle = &pattern[start..end.max(start)];
    if needle.contains('%') {
        return None;
    }

    let (text, needle) = if case_sensitive {
        (text.to_string(), needle.to_string())
    } else {
        (text.to_lowercase(), needle.to_lowercase())
    };
    Some(match (leading, trailing) {
        (false, false) => text == needle,
        (false, true) => text.starts_with(&needle),
        (true, false) => text.ends_with(&needle),
        (true, true) => text.contains(&needle),
    })
}

fn compiled(pattern: &str, case_sensitive: bool) -> Result<Arc<Regex>> {
    let key = format!("{}:{pattern}", if case_sensitive { 's' } else { 'i' });
    if let Some(regex) = PATTERN_CACHE.lock()?.get(&key) {
        return Ok(Arc::clone(regex));
    }

    let regex = RegexBuilder::new(&like_to_regex(pattern))
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|err| DataError::Backend(format!("invalid LIKE pattern '{pattern}': {err}")))?;
    let regex = Arc::new(regex);
    PATTERN_CACHE.lock()?.put(key, Arc::clone(&regex));
    Ok(regex)
}

/// Does `text` match the `LIKE` pattern?
pub fn eval_like(text: &str, pattern: &str, case_sensitive: bool) -> Result<bool> {
    if let Some(matched) = fast_path(text, pattern, case_sensitive) {
        return Ok(matched);
    }
    Ok(compiled(pattern, case_sensitive)?.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_shapes_skip_the_regex() {
        assert_eq!(fast_path("Dune", "Du%", true), Some(true));
        assert_eq!(fast_path("Dune", "%NE", false), Some(true));
        assert_eq!(fast_path("Dune", "%un%", true), Some(true));
        assert_eq!(fast_path("Dune", "dune", true), Some(false));
        assert_eq!(fast_path("Dune", "D%n%", true), None);
        assert_eq!(fast_path("anything", "%", true), Some(true));
    }

    #[test]
    fn wildcards_and_escapes() {
        assert!(eval_like("Dune", "D_n_", true).unwrap());
        assert!(eval_like("Dune Messiah", "D%e%h", true).unwrap());
        assert!(!eval_like("Dune", "d_n_", true).unwrap());
        assert!(eval_like("dUNE", "d_n_", false).unwrap());
        assert!(eval_like("100%", r"100\%", true).unwrap());
        assert!(!eval_like("1000", r"100\%", true).unwrap());
        assert!(eval_like("a.b", "a.b", true).unwrap());
        assert!(!eval_like("axb", "a.b", true).unwrap());
    }
}
