//! Action code is carried as opaque text.  The only thing understood about it is its
//! placeholders: `$$` stands for the value of the left-hand side, and `$1` .. `$n` for the
//! values of the right-hand side symbols.

use crate::errors::Error;
use crate::grammar::Grammar;
use crate::RuleId;
use std::collections::BTreeSet;

/// What an empty action resolves to.
pub const EMPTY_ACTION: &str = ";";

enum Piece<'a> {
    Text(&'a str),
    Lhs,
    /// `$n`, with the literal text kept for when `n` is out of range.
    Position(usize, &'a str),
}

/// Splits `code` into text and placeholders.  A position takes every digit after the `$`, so
/// `$12` is always position 12 and never position 1 followed by `2`.
fn pieces(code: &str) -> Vec<Piece<'_>> {
    let bytes = code.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        if i + 1 < bytes.len() && bytes[i + 1] == b'$' {
            out.push(Piece::Text(&code[start..i]));
            out.push(Piece::Lhs);
            i += 2;
            start = i;
            continue;
        }
        let digits_end = bytes[i + 1..]
            .iter()
            .position(|b| !b.is_ascii_digit())
            .map_or(bytes.len(), |n| i + 1 + n);
        if digits_end == i + 1 {
            i += 1;
            continue;
        }
        out.push(Piece::Text(&code[start..i]));
        let literal = &code[i..digits_end];
        // A run of digits too long for usize can never be a valid position.
        let n = literal[1..].parse::<usize>().unwrap_or(usize::MAX);
        out.push(Piece::Position(n, literal));
        i = digits_end;
        start = i;
    }
    out.push(Piece::Text(&code[start..]));
    out
}

/// The right-hand side positions (1-based, at most `rhs_len`) that `code` refers to.
pub fn used_positions(code: &str, rhs_len: usize) -> BTreeSet<usize> {
    pieces(code)
        .into_iter()
        .filter_map(|p| match p {
            Piece::Position(n, _) if n >= 1 && n <= rhs_len => Some(n),
            _ => None,
        })
        .collect()
}

/// Substitutes `lvalue` for `$$` and `names[n - 1]` for `$n`.  Placeholders with no name are
/// left as they are.  Returns `None` when non-empty code never assigns `$$`.
pub fn resolve(code: &str, lvalue: &str, names: &[Option<String>]) -> Option<String> {
    if code.trim().is_empty() {
        return Some(EMPTY_ACTION.to_string());
    }

    let mut has_lhs = false;
    let mut out = String::with_capacity(code.len());
    for piece in pieces(code) {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Lhs => {
                has_lhs = true;
                out.push_str(lvalue);
            }
            Piece::Position(n, literal) => {
                match n.checked_sub(1).and_then(|i| names.get(i)) {
                    Some(Some(name)) => out.push_str(name),
                    _ => out.push_str(literal),
                }
            }
        }
    }

    if has_lhs {
        Some(out)
    } else {
        None
    }
}

/// Resolves the action code of `rule`.
pub fn resolve_rule_code(
    gram: &Grammar,
    rule: RuleId,
    lvalue: &str,
    names: &[Option<String>],
) -> Result<String, Error> {
    let code = gram.rule(rule).code.as_deref().unwrap_or("");
    resolve(code, lvalue, names).ok_or_else(|| Error::MissingLhsAssignment {
        rule: gram.rule_to_str(rule),
    })
}
