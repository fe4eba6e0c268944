//! Recursive-descent parser for the comment line, built on top of the
//! terminal matchers in [`crate::grammar`].
//!
//! `all_kv_pair` tries `properties_kv_pair` before falling back to the
//! general `kv_pair` (first match wins); every other choice point in the
//! grammar (the value alternatives inside a `kv_pair`) is most-greedy: every
//! alternative that matches at the current position is tried and the one
//! consuming the most bytes is kept.
use crate::error::{Error, ErrorKind};
use crate::grammar::{unquote, Grammar};
use crate::tree::{Header, KvPair, ValueNode};
use crate::value::Value;

/// Parse an entire comment line into a [`Header`] of `key=value` pairs.
///
/// # Errors
/// Returns `ErrorKind::HeaderParseFailed` with the byte offset of the first
/// unparseable key if the line isn't entirely consumed by `key=value` pairs.
pub fn parse_header(line: &str, grammar: &Grammar) -> Result<Header, Error> {
    let (header, fail_pos) = parse_header_partial(line, grammar);
    match fail_pos {
        None => Ok(header),
        Some(pos) => Err(Error::new(
            ErrorKind::HeaderParseFailed(pos),
            format!("could not parse key=value pair at byte {}", pos),
        )),
    }
}

/// Parse as many `key=value` pairs as possible out of `line`, stopping at
/// the first position that can't be matched instead of failing outright.
///
/// Returns the pairs parsed so far and, if the line wasn't fully consumed,
/// the byte offset at which matching stopped. The caller decides whether an
/// incomplete parse is fatal by inspecting the already-parsed pairs.
pub fn parse_header_partial(line: &str, grammar: &Grammar) -> (Header, Option<usize>) {
    let mut pairs = Vec::new();
    let mut pos = 0;
    loop {
        pos += skip_ws(&line[pos..]);
        if pos >= line.len() {
            return (Header { pairs }, None);
        }
        match parse_kv_pair(&line[pos..], grammar) {
            Some((pair, consumed)) => {
                pairs.push(pair);
                pos += consumed;
            }
            None => return (Header { pairs }, Some(pos)),
        }
    }
}

fn skip_ws(s: &str) -> usize {
    s.bytes().take_while(|b| b.is_ascii_whitespace()).count()
}

/// `all_kv_pair`: `properties_kv_pair` first, else the general `kv_pair`.
fn parse_kv_pair(s: &str, grammar: &Grammar) -> Option<(KvPair, usize)> {
    if let Some(result) = parse_properties_kv_pair(s, grammar) {
        return Some(result);
    }
    parse_generic_kv_pair(s, grammar)
}

fn parse_properties_kv_pair(s: &str, grammar: &Grammar) -> Option<(KvPair, usize)> {
    let kw_len = grammar.properties_keyword.find(s)?.end();
    let mut pos = kw_len;
    pos += skip_ws(&s[pos..]);
    if s.as_bytes().get(pos) != Some(&b'=') {
        return None;
    }
    pos += 1;
    let val_match = grammar.properties_val_str.find(&s[pos..])?;
    let value_text = val_match.as_str().to_string();
    pos += val_match.end();
    pos += skip_ws(&s[pos..]);
    Some((
        KvPair {
            key: "Properties".to_string(),
            value: ValueNode::Scalar(Value::String(value_text)),
            is_legacy: false,
        },
        pos,
    ))
}

fn parse_generic_kv_pair(s: &str, grammar: &Grammar) -> Option<(KvPair, usize)> {
    let key_len = grammar.match_string(s)?;
    let key = unquote(&s[..key_len]);
    let mut pos = key_len;
    if s.as_bytes().get(pos) != Some(&b'=') {
        return None;
    }
    pos += 1;
    let (value, is_legacy, val_len) = parse_val_item(&s[pos..], grammar)?;
    pos += val_len;
    pos += skip_ws(&s[pos..]);
    Some((
        KvPair {
            key,
            value,
            is_legacy,
        },
        pos,
    ))
}

/// `val_item`: try every alternative that can match at this position and
/// keep the one with the longest match. The string terminal is tried
/// unconditionally alongside the others, not just when nothing else
/// matched, so that a token such as `1.2.3` loses to the bare-string
/// alternative (which consumes all five bytes) rather than being cut short
/// by the float terminal matching only its `1.2` prefix.
fn parse_val_item(s: &str, grammar: &Grammar) -> Option<(ValueNode, bool, usize)> {
    let mut best: Option<(ValueNode, bool, usize)> = None;
    let mut consider = |candidate: Option<(ValueNode, bool, usize)>| {
        if let Some((_, _, len)) = &candidate {
            if best.as_ref().map_or(true, |(_, _, blen)| len > blen) {
                best = candidate;
            }
        }
    };

    consider(parse_scalar_terminal(s, grammar).map(|(v, len)| (v, false, len)));
    consider(parse_legacy_array(s).map(|(v, len)| (v, true, len)));
    consider(parse_bracket_value(s).map(|(v, len)| (v, false, len)));
    consider(
        grammar
            .match_string(s)
            .map(|len| (ValueNode::Scalar(Value::String(unquote(&s[..len]))), false, len)),
    );
    best
}

/// `r_integer | r_float | r_true | r_false`.
fn parse_scalar_terminal(s: &str, grammar: &Grammar) -> Option<(ValueNode, usize)> {
    let int_len = grammar.integer.find(s).map(|m| m.end());
    let float_len = grammar.float.find(s).map(|m| m.end());
    if let (Some(il), Some(fl)) = (int_len, float_len) {
        if il >= fl {
            return parse_int_token(&s[..il]).map(|v| (ValueNode::Scalar(v), il));
        }
        return parse_float_token(&s[..fl]).map(|v| (ValueNode::Scalar(v), fl));
    }
    if let Some(il) = int_len {
        return parse_int_token(&s[..il]).map(|v| (ValueNode::Scalar(v), il));
    }
    if let Some(fl) = float_len {
        return parse_float_token(&s[..fl]).map(|v| (ValueNode::Scalar(v), fl));
    }
    if let Some(m) = grammar.bool_true.find(s) {
        return Some((ValueNode::Scalar(Value::Bool(true)), m.end()));
    }
    if let Some(m) = grammar.bool_false.find(s) {
        return Some((ValueNode::Scalar(Value::Bool(false)), m.end()));
    }
    None
}

fn parse_int_token(tok: &str) -> Option<Value> {
    tok.parse::<i64>().ok().map(Value::Int)
}

/// Handle the original format's `d`/`D` FORTRAN exponent marker by rewriting
/// it to `e` before handing the token to the standard float parser.
fn parse_float_token(tok: &str) -> Option<Value> {
    let rewritten: String = tok
        .chars()
        .map(|c| if c == 'd' || c == 'D' { 'e' } else { c })
        .collect();
    rewritten.parse::<f64>().ok().map(Value::Float)
}

fn parse_token(tok: &str) -> Value {
    if let Some(v) = parse_int_token(tok) {
        return v;
    }
    if let Some(v) = parse_float_token(tok) {
        if tok.contains('.') || tok.contains('d') || tok.contains('D') || tok.contains('e') || tok.contains('E') {
            return v;
        }
    }
    match tok {
        "T" | "True" | "true" | "TRUE" => return Value::Bool(true),
        "F" | "False" | "false" | "FALSE" => return Value::Bool(false),
        _ => {}
    }
    if tok.len() >= 2 && tok.starts_with('"') && tok.ends_with('"') {
        return Value::String(unquote(tok));
    }
    Value::String(tok.to_string())
}

/// `old_one_d_array`: a `"..."` or `{...}` legacy quoted list, tokens
/// separated by commas or whitespace.
fn parse_legacy_array(s: &str) -> Option<(ValueNode, usize)> {
    let (close, allow_strings) = match s.as_bytes().first()? {
        b'"' => (b'"', false),
        b'{' => (b'}', true),
        _ => return None,
    };
    let bytes = s.as_bytes();
    let mut i = 1;
    let end = loop {
        if i >= bytes.len() {
            return None;
        }
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => i += 2,
            c if c == close => break i,
            _ => i += 1,
        }
    };
    let inner = &s[1..end];
    let tokens: Vec<&str> = inner.split(|c: char| c == ',' || c.is_whitespace()).filter(|t| !t.is_empty()).collect();
    if tokens.is_empty() {
        return None;
    }
    let values: Vec<ValueNode> = tokens
        .iter()
        .map(|t| {
            if !allow_strings {
                ValueNode::Scalar(match parse_token(t) {
                    Value::String(s) => Value::String(s),
                    other => other,
                })
            } else {
                ValueNode::Scalar(parse_token(t))
            }
        })
        .collect();
    Some((ValueNode::Sequence(values), end + 1))
}

/// `two_d_array | one_d_array_{i,f,b,s}`: a `[...]` literal, either a flat
/// list of scalars or a comma-separated list of bracketed rows.
fn parse_bracket_value(s: &str) -> Option<(ValueNode, usize)> {
    if s.as_bytes().first() != Some(&b'[') {
        return None;
    }
    let end = find_matching_bracket(s, 0)?;
    let inner = &s[1..end];
    let node = if inner.contains('[') {
        let rows = split_top_level(inner, ',');
        let mut parsed_rows = Vec::with_capacity(rows.len());
        for row in rows {
            let row = row.trim();
            if row.as_bytes().first() != Some(&b'[') || row.as_bytes().last() != Some(&b']') {
                return None;
            }
            let row_inner = &row[1..row.len() - 1];
            let tokens = split_top_level(row_inner, ',');
            parsed_rows.push(ValueNode::Sequence(
                tokens.iter().map(|t| ValueNode::Scalar(parse_token(t.trim()))).collect(),
            ));
        }
        ValueNode::Sequence(parsed_rows)
    } else {
        let tokens = split_top_level(inner, ',');
        ValueNode::Sequence(tokens.iter().map(|t| ValueNode::Scalar(parse_token(t.trim()))).collect())
    };
    Some((node, end + 1))
}

fn find_matching_bracket(s: &str, open_pos: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut i = open_pos;
    while i < bytes.len() {
        match bytes[i] {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth -= 1,
            c if c == sep && depth == 0 => {
                out.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < s.len() {
        out.push(&s[start..]);
    }
    out.into_iter().filter(|t| !t.trim().is_empty()).collect()
}
