//! Request parsing utilities: query strings, cookies and parameterized headers.

use std::borrow::Cow;
use std::collections::HashMap;

use encoding_rs::Encoding;
use percent_encoding::percent_decode;

use super::query::QueryDict;

/// Decode one `application/x-www-form-urlencoded` component.
///
/// `+` becomes a space, percent escapes are decoded, and the resulting bytes
/// are interpreted with `encoding` (malformed sequences are replaced).
#[inline]
pub fn decode_component(raw: &[u8], encoding: &'static Encoding) -> String {
    let spaced: Cow<'_, [u8]> = if raw.contains(&b'+') {
        Cow::Owned(
            raw.iter()
                .map(|&b| if b == b'+' { b' ' } else { b })
                .collect(),
        )
    } else {
        Cow::Borrowed(raw)
    };

    let decoded: Cow<'_, [u8]> = percent_decode(&spaced).into();

    let (text, _) = encoding.decode_without_bom_handling(&decoded);
    text.into_owned()
}

/// Parse a query string (or urlencoded body) into a [`QueryDict`].
///
/// Blank values are kept; pairs with an empty name are dropped.
pub fn parse_query_string(raw: &[u8], encoding: &'static Encoding) -> QueryDict {
    let mut params = QueryDict::new();

    for pair in raw.split(|&b| b == b'&') {
        if pair.is_empty() {
            continue;
        }

        let (key, value) = match pair.iter().position(|&b| b == b'=') {
            Some(pos) => (&pair[..pos], &pair[pos + 1..]),
            None => (pair, &b""[..]),
        };

        if !key.is_empty() {
            params.push(decode_component(key, encoding), decode_component(value, encoding));
        }
    }

    params
}

/// Parse a `Cookie` header into a name-value mapping.
///
/// Chunks without `=` are stored under the empty name. Later duplicates win.
pub fn parse_cookies(cookie_header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();

    for chunk in cookie_header.split(';') {
        let (name, value) = match chunk.find('=') {
            Some(pos) => (chunk[..pos].trim(), chunk[pos + 1..].trim()),
            None => ("", chunk.trim()),
        };

        if !name.is_empty() || !value.is_empty() {
            cookies.insert(name.to_string(), unquote_cookie(value));
        }
    }

    cookies
}

/// Strip surrounding double quotes and backslash escapes from a cookie value.
fn unquote_cookie(value: &str) -> String {
    let inner = match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => inner,
        None => return value.to_string(),
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Parse a parameterized header such as `Content-Type`.
///
/// Returns the bare value and a map of lowercased parameter names to values.
/// Quoted parameter values are unquoted. Parameters without `=` are ignored.
pub fn parse_header(line: &str) -> (String, HashMap<String, String>) {
    let mut parts = split_params(line).into_iter();
    let key = parts.next().map(|p| p.trim().to_string()).unwrap_or_default();

    let mut params = HashMap::new();
    for part in parts {
        let Some(pos) = part.find('=') else {
            continue;
        };
        let name = part[..pos].trim().to_ascii_lowercase();
        let mut value = part[pos + 1..].trim().to_string();
        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            value = value[1..value.len() - 1]
                .replace("\\\\", "\\")
                .replace("\\\"", "\"");
        }
        params.insert(name, value);
    }

    (key, params)
}

/// Split on `;` outside of double-quoted strings.
fn split_params(line: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                parts.push(&line[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&line[start..]);
    parts
}
