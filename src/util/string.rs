//! String utilities
//!
//! Allocation-returning helpers used by the parser and by string values.
//! Offsets are counted in chars, not bytes. Formatted construction is
//! `format!`.
//!
//! The two group-aware splitters treat quoted substrings and balanced
//! `(...)` / `[...]` groups as atomic: they never split inside them.

use thiserror::Error;

/// String layer errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrError {
    #[error("range {start}..{end} out of bounds for length {len}")]
    OutOfRange {
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("unterminated {0}")]
    Unterminated(String),

    #[error("unexpected '{0}'")]
    Unbalanced(char),

    #[error("expected '{expected}' but found '{found}'")]
    Mismatched { expected: char, found: char },
}

/// Full copy
pub fn duplicate(s: &str) -> String {
    s.to_string()
}

/// Copy of at most the first `n` chars
pub fn nduplicate(
    s: &str,
    n: usize,
) -> String {
    s.chars().take(n).collect()
}

/// Chars in `[start, end)`. Fails unless `start <= end <= len`.
pub fn sub(
    s: &str,
    start: usize,
    end: usize,
) -> Result<String, StrError> {
    let len = s.chars().count();
    if start > end || end > len {
        return Err(StrError::OutOfRange { start, end, len });
    }
    Ok(s.chars().skip(start).take(end - start).collect())
}

/// New string holding `a` followed by `b`
pub fn concat(
    a: &str,
    b: &str,
) -> String {
    let mut out = String::with_capacity(a.len() + b.len());
    out.push_str(a);
    out.push_str(b);
    out
}

/// Char offset of the first occurrence of `needle`
pub fn find(
    haystack: &str,
    needle: &str,
) -> Option<usize> {
    haystack
        .find(needle)
        .map(|byte| haystack[..byte].chars().count())
}

/// Replace the first occurrence of `from`
pub fn replace(
    s: &str,
    from: &str,
    to: &str,
) -> String {
    s.replacen(from, to, 1)
}

/// Replace every occurrence of `from`
pub fn replace_all(
    s: &str,
    from: &str,
    to: &str,
) -> String {
    if from.is_empty() {
        return s.to_string();
    }
    s.replace(from, to)
}

/// Plain split on a string delimiter; empty pieces are kept
pub fn split(
    s: &str,
    delim: &str,
) -> Vec<String> {
    if delim.is_empty() {
        return vec![s.to_string()];
    }
    s.split(delim).map(str::to_string).collect()
}

/// Plain split on a single char; empty pieces are kept
pub fn split_char(
    s: &str,
    delim: char,
) -> Vec<String> {
    s.split(delim).map(str::to_string).collect()
}

/// Split on whitespace outside quotes and bracket groups.
///
/// A group or quoted string at top level is always its own token, so
/// `add(1 2)"x"` yields `add`, `(1 2)` and `"x"`.
pub fn special_space_split(s: &str) -> Result<Vec<String>, StrError> {
    split_outside_groups(s, char::is_whitespace, true)
}

/// Split on `delim` outside quotes and bracket groups. Pieces are trimmed and
/// empty pieces dropped.
pub fn special_split(
    s: &str,
    delim: char,
) -> Result<Vec<String>, StrError> {
    Ok(split_outside_groups(s, |c| c == delim, false)?
        .into_iter()
        .map(|piece| piece.trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect())
}

fn closer_for(open: char) -> char {
    match open {
        '(' => ')',
        _ => ']',
    }
}

fn split_outside_groups<F>(
    s: &str,
    is_separator: F,
    groups_are_tokens: bool,
) -> Result<Vec<String>, StrError>
where
    F: Fn(char) -> bool,
{
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut closers: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;

    let flush = |tokens: &mut Vec<String>, current: &mut String| {
        if !current.is_empty() {
            tokens.push(std::mem::take(current));
        }
    };

    for c in s.chars() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                quote = None;
                if closers.is_empty() && groups_are_tokens {
                    flush(&mut tokens, &mut current);
                }
            }
            continue;
        }

        match c {
            '"' | '\'' | '(' | '[' => {
                if closers.is_empty() && groups_are_tokens {
                    flush(&mut tokens, &mut current);
                }
                current.push(c);
                if c == '(' || c == '[' {
                    closers.push(closer_for(c));
                } else {
                    quote = Some(c);
                }
            }
            ')' | ']' => match closers.pop() {
                Some(expected) if expected == c => {
                    current.push(c);
                    if closers.is_empty() && groups_are_tokens {
                        flush(&mut tokens, &mut current);
                    }
                }
                Some(expected) => return Err(StrError::Mismatched { expected, found: c }),
                None => return Err(StrError::Unbalanced(c)),
            },
            _ if closers.is_empty() && is_separator(c) => {
                if groups_are_tokens {
                    flush(&mut tokens, &mut current);
                } else {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if let Some(q) = quote {
        return Err(StrError::Unterminated(format!("string starting with {}", q)));
    }
    if let Some(expected) = closers.last() {
        return Err(StrError::Unterminated(format!(
            "group, expected '{}'",
            expected
        )));
    }
    if groups_are_tokens {
        flush(&mut tokens, &mut current);
    } else {
        tokens.push(current);
    }
    Ok(tokens)
}
