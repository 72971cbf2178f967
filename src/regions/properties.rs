//! Flat `key=value` property files
//!
//! Follows the usual properties conventions: `#` and `!` start comments,
//! keys end at the first unescaped `=`, `:` or whitespace, a trailing
//! backslash continues the line, and `\t`, `\n`, `\r`, `\f`, `\uXXXX` escapes
//! are decoded. A key given twice keeps its last value.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

use crate::traits::ResolverError;

/// Parse property file content
pub fn parse_properties(content: &str) -> Result<BTreeMap<String, String>, String> {
    let mut properties = BTreeMap::new();
    let mut lines = content.lines().enumerate();

    while let Some((number, line)) = lines.next() {
        let mut logical = line.trim_start().to_string();
        if logical.is_empty() || logical.starts_with('#') || logical.starts_with('!') {
            continue;
        }

        while continues(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        let key = unescape(key).map_err(|e| format!("line {}: {}", number + 1, e))?;
        let value = unescape(value).map_err(|e| format!("line {}: {}", number + 1, e))?;
        properties.insert(key, value);
    }

    Ok(properties)
}

/// Load a property file; a missing file yields `None`
pub fn load_properties(path: &Path) -> Result<Option<BTreeMap<String, String>>, ResolverError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Property file {:?} not found", path);
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    parse_properties(&content)
        .map(Some)
        .map_err(|reason| ResolverError::InvalidMembership {
            file: path.to_path_buf(),
            reason,
        })
}

/// Split a comma separated value into trimmed, non-empty items
pub fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Odd number of trailing backslashes
fn continues(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\u{c}' => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let rest = line[key_end..].trim_start_matches([' ', '\t', '\u{c}']);
    let rest = rest
        .strip_prefix('=')
        .or_else(|| rest.strip_prefix(':'))
        .unwrap_or(rest);
    (key, rest.trim_start_matches([' ', '\t', '\u{c}']))
}

fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("malformed \\u escape: \\u{}", hex))?;
                out.push(code);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}
