//! Terminal matchers for the comment-line grammar.
//!
//! Most terminals are plain regular expressions and are compiled once into a
//! [`Grammar`]. Three terminals — the double-, curly- and square-quoted
//! string forms — use a PCRE negative lookbehind (`(?<!\\)`) or a
//! backreference in their original definition to find an unescaped closing
//! delimiter; the `regex` crate supports neither lookaround nor
//! backreferences, so those three are hand-written scanners instead
//! (`scan_*` below) that walk the bytes directly and track escaping.
use regex::Regex;

use crate::error::{Error, ErrorKind};

/// The compiled set of regex terminals used by the header parser.
///
/// Build once with [`Grammar::compile`] and reuse across every record: none
/// of its fields are mutated after construction, so a `Grammar` may be
/// shared across threads.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub(crate) barestring: Regex,
    pub(crate) integer: Regex,
    pub(crate) float: Regex,
    pub(crate) bool_true: Regex,
    pub(crate) bool_false: Regex,
    pub(crate) properties_val_str: Regex,
    pub(crate) properties_keyword: Regex,
}

impl Grammar {
    /// Compile every regex terminal. Only fails if a pattern is malformed,
    /// which cannot happen with the patterns baked into this function.
    pub fn compile() -> Result<Self, Error> {
        let compile = |pat: &str| -> Result<Regex, Error> {
            Regex::new(pat).map_err(|e| {
                Error::new(
                    ErrorKind::InternalError(format!("bad grammar regex: {}", e)),
                    "failed to compile built-in grammar",
                )
            })
        };

        Ok(Grammar {
            barestring: compile(r#"^(?:[^\s=",\}\{\]\[\\]|(?:\\[\s=",\}\{\]\[\\]))+"#)?,
            integer: compile(r"^[+-]?(?:0|[1-9][0-9]*)\b")?,
            float: compile(
                r"^[+-]?(?:(?:(?:0|[1-9][0-9]*)\.|\.)[0-9]*(?:[dDeE][+-]?[0-9]+)?|(?:0|[1-9][0-9]*)(?:[dDeE][+-]?[0-9]+)?|(?:0|[1-9][0-9]*))\b",
            )?,
            bool_true: compile(r"^\b(?:[tT]rue|TRUE|T)\b")?,
            bool_false: compile(r"^\b(?:[fF]alse|FALSE|F)\b")?,
            properties_val_str: compile(
                r"^(?:[a-zA-Z_][a-zA-Z_0-9]*):([RILS]):([0-9]+)(?::[a-zA-Z_][a-zA-Z_0-9]*:[RILS]:[0-9]+)*",
            )?,
            properties_keyword: compile(r"(?i)^Properties\b")?,
        })
    }

    /// Length in bytes of the longest match of `r_string` at the start of
    /// `s` (the most-greedy choice of barestring / dq / cb / sb quoted
    /// forms), or `None` if none match.
    pub fn match_string(&self, s: &str) -> Option<usize> {
        let mut best = self.barestring.find(s).map(|m| m.end());
        if let Some(len) = scan_dq_quotedstring(s) {
            if best.map_or(true, |b| len > b) {
                best = Some(len);
            }
        }
        if let Some(len) = scan_cb_quotedstring(s) {
            if best.map_or(true, |b| len > b) {
                best = Some(len);
            }
        }
        if let Some(len) = scan_sb_quotedstring(s) {
            if best.map_or(true, |b| len > b) {
                best = Some(len);
            }
        }
        best
    }
}

/// Scan a `"..."` double-quoted string starting at byte 0 of `s`, honoring
/// `\"` as an escaped quote. Returns the byte length of the match including
/// both quotes, or `None` if `s` doesn't start with `"` or has no closing
/// quote.
pub fn scan_dq_quotedstring(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'"') {
        return None;
    }
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => i += 2,
            b'"' => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// Scan a `{...}` quoted string starting at byte 0 of `s`, stopping at the
/// first unescaped `}`. Returns the byte length of the match including both
/// braces, or `None`.
pub fn scan_cb_quotedstring(s: &str) -> Option<usize> {
    scan_delimited(s, b'{', b'}')
}

/// Scan a `[...]` quoted string starting at byte 0 of `s`, stopping at the
/// first unescaped `]`. Returns the byte length of the match including both
/// brackets, or `None`.
pub fn scan_sb_quotedstring(s: &str) -> Option<usize> {
    scan_delimited(s, b'[', b']')
}

fn scan_delimited(s: &str, open: u8, close: u8) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&open) {
        return None;
    }
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => i += 2,
            c if c == close => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// Remove the surrounding quote characters (if any) and unescape `\n`,
/// `\\` and a passthrough of any other escaped character, matching the
/// original format's `unquote` semantics: `\n` becomes a newline, `\\`
/// becomes a single backslash and any other `\x` just becomes `x`.
pub fn unquote(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let (body, is_quoted) = if bytes.len() >= 2
        && matches!(bytes[0], b'"' | b'{' | b'[')
        && matches!(bytes[bytes.len() - 1], b'"' | b'}' | b']')
    {
        (&raw[1..raw.len() - 1], true)
    } else {
        (raw, false)
    };
    if !is_quoted && !body.contains('\\') {
        return body.to_string();
    }
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('\\') => out.push('\\'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_dq_quotedstring() {
        assert_eq!(scan_dq_quotedstring(r#""hello""#), Some(7));
        assert_eq!(scan_dq_quotedstring(r#""he said \"hi\"""#), Some(16));
        assert_eq!(scan_dq_quotedstring("no quote"), None);
    }

    #[test]
    fn test_scan_cb_quotedstring() {
        assert_eq!(scan_cb_quotedstring("{1 2 3}"), Some(7));
        assert_eq!(scan_cb_quotedstring(r"{a\}b}"), Some(6));
    }

    #[test]
    fn test_scan_sb_quotedstring() {
        assert_eq!(scan_sb_quotedstring("[1 0 0]"), Some(7));
        assert_eq!(scan_sb_quotedstring("[1 0 0] trailing"), Some(7));
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote(r#""line one\nline two""#), "line one\nline two");
        assert_eq!(unquote(r"{a\\b}"), "a\\b");
        assert_eq!(unquote("plain"), "plain");
    }

    #[test]
    fn test_grammar_terminals() {
        let g = Grammar::compile().unwrap();
        assert_eq!(g.integer.find("42 rest").unwrap().as_str(), "42");
        assert_eq!(g.float.find("-1.5e10 rest").unwrap().as_str(), "-1.5e10");
        assert!(g.bool_true.is_match("T rest"));
        assert!(g.bool_false.is_match("FALSE rest"));
    }

    #[test]
    fn test_match_string_picks_longest() {
        let g = Grammar::compile().unwrap();
        assert_eq!(g.match_string("bare_word rest"), Some(9));
        assert_eq!(g.match_string(r#""a quoted value" rest"#), Some(16));
    }
}
