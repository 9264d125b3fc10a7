//! Unicode Escape Codec
//!
//! Properties-style escaping for persisted state records. Printable ASCII
//! passes through; `\`, `=`, newlines and tabs get two-character escapes;
//! everything else becomes `\uXXXX` per UTF-16 code unit, with supplementary
//! characters emitted as surrogate pairs. `unicode_unescape` is the exact
//! inverse.

use std::fmt::Write;

use crate::error::{Error, Result};

/// Escape a key or value for one `key=value` state record.
///
/// Boundary spaces and a leading `#` are `\u`-escaped as well: the reader
/// trims each side of the separator and skips comment lines, so leaving them
/// raw would not survive the trip back.
pub fn unicode_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let last = input.chars().count().saturating_sub(1);
    for (idx, c) in input.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '=' => out.push_str("\\="),
            ' ' if idx == 0 || idx == last => out.push_str("\\u0020"),
            '#' if idx == 0 => out.push_str("\\u0023"),
            ' '..='~' => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    // Writing to a String cannot fail
                    let _ = write!(out, "\\u{:04x}", unit);
                }
            }
        }
    }
    out
}

/// Invert [`unicode_escape`], reassembling surrogate pairs
pub fn unicode_unescape(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('=') => out.push('='),
            Some('u') => {
                let unit = read_code_unit(&mut chars)?;
                if (0xD800..=0xDBFF).contains(&unit) {
                    if chars.next() != Some('\\') || chars.next() != Some('u') {
                        return Err(malformed("high surrogate without a pair"));
                    }
                    let low = read_code_unit(&mut chars)?;
                    let decoded = String::from_utf16(&[unit, low])
                        .map_err(|_| malformed("invalid surrogate pair"))?;
                    out.push_str(&decoded);
                } else {
                    let decoded = char::from_u32(unit as u32)
                        .ok_or_else(|| malformed("lone low surrogate"))?;
                    out.push(decoded);
                }
            }
            Some(other) => {
                return Err(malformed(&format!("unknown escape '\\{}'", other)));
            }
            None => return Err(malformed("dangling backslash")),
        }
    }
    Ok(out)
}

fn read_code_unit(chars: &mut std::str::Chars<'_>) -> Result<u16> {
    let digits: String = chars.take(4).collect();
    if digits.len() != 4 {
        return Err(malformed("truncated \\u escape"));
    }
    u16::from_str_radix(&digits, 16).map_err(|_| malformed(&format!("bad hex '{}'", digits)))
}

fn malformed(detail: &str) -> Error {
    Error::Internal(format!("malformed unicode escape: {}", detail))
}
