//! Template scanner
//!
//! Splits template text into text runs and tags in a single pass. Anything
//! between `{{` and `}}` is opaque, so `<` or quotes inside an expression
//! never start a tag or end an attribute value. `style`/`script` bodies are
//! passed through as raw text.

use crate::error::CompileError;
use crate::host::RAW_TEXT_ELEMENTS;

/// Attribute as written
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawAttr {
    pub name: String,
    pub value: Option<String>,
}

/// Scanned piece of template
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Piece {
    Text {
        text: String,
        position: usize,
        raw: bool,
    },
    Open {
        name: String,
        attrs: Vec<RawAttr>,
        self_closing: bool,
        position: usize,
    },
    Close {
        name: String,
        position: usize,
    },
}

/// Remove `<!-- ... -->` comments
pub(crate) fn strip_comments(src: &str) -> Result<String, CompileError> {
    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    let mut offset = 0;
    while let Some(start) = rest.find("<!--") {
        out.push_str(&rest[..start]);
        let Some(len) = rest[start + 4..].find("-->") else {
            return Err(CompileError::UnclosedComment(offset + start));
        };
        let end = start + 4 + len + 3;
        offset += end;
        rest = &rest[end..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Scan template text into pieces
pub(crate) fn scan(src: &str) -> Result<Vec<Piece>, CompileError> {
    let bytes = src.as_bytes();
    let mut pieces = Vec::new();
    let mut i = 0;
    let mut text_start = 0;

    while i < bytes.len() {
        if bytes[i..].starts_with(b"{{") {
            i = skip_expression(src, i)?;
            continue;
        }
        if bytes[i] != b'<' || !is_tag_start(&bytes[i + 1..]) {
            i += 1;
            continue;
        }

        push_text(&mut pieces, src, text_start, i, false);
        let (piece, end) = scan_tag(src, i)?;
        i = end;

        let raw_name = match &piece {
            Piece::Open {
                name,
                self_closing: false,
                ..
            } if RAW_TEXT_ELEMENTS.contains(&name.to_ascii_lowercase().as_str()) => Some(name.clone()),
            _ => None,
        };
        pieces.push(piece);

        if let Some(name) = raw_name {
            let close = find_ignore_case(src, i, &format!("</{name}"))
                .ok_or_else(|| CompileError::UnclosedTag(name.clone()))?;
            push_text(&mut pieces, src, i, close, true);
            let (piece, end) = scan_tag(src, close)?;
            pieces.push(piece);
            i = end;
        }
        text_start = i;
    }
    push_text(&mut pieces, src, text_start, bytes.len(), false);
    Ok(pieces)
}

fn push_text(pieces: &mut Vec<Piece>, src: &str, start: usize, end: usize, raw: bool) {
    if start < end {
        pieces.push(Piece::Text {
            text: src[start..end].to_string(),
            position: start,
            raw,
        });
    }
}

fn is_tag_start(rest: &[u8]) -> bool {
    match rest {
        [b'/', c, ..] => c.is_ascii_alphabetic(),
        [c, ..] => c.is_ascii_alphabetic(),
        [] => false,
    }
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.')
}

/// Position just past the `}}` closing the expression at `start`
fn skip_expression(src: &str, start: usize) -> Result<usize, CompileError> {
    src[start + 2..]
        .find("}}")
        .map(|len| start + 2 + len + 2)
        .ok_or(CompileError::UnclosedExpression(start))
}

fn find_ignore_case(src: &str, from: usize, needle: &str) -> Option<usize> {
    let haystack = src.as_bytes();
    let needle = needle.as_bytes();
    (from..=haystack.len().checked_sub(needle.len())?)
        .find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Scan one tag starting at the `<` at `start`; returns the piece and the
/// position after `>`
fn scan_tag(src: &str, start: usize) -> Result<(Piece, usize), CompileError> {
    let bytes = src.as_bytes();
    let malformed = CompileError::MalformedTag(start);
    let mut i = start + 1;

    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }
    let name_start = i;
    while i < bytes.len() && is_name_char(bytes[i]) {
        i += 1;
    }
    let name = src[name_start..i].to_string();
    if name.is_empty() {
        return Err(malformed);
    }

    if closing {
        i = skip_whitespace(bytes, i);
        if bytes.get(i) != Some(&b'>') {
            return Err(malformed);
        }
        return Ok((Piece::Close { name, position: start }, i + 1));
    }

    let mut attrs = Vec::new();
    let self_closing = loop {
        i = skip_whitespace(bytes, i);
        match bytes.get(i) {
            None => return Err(malformed),
            Some(b'>') => {
                i += 1;
                break false;
            }
            Some(b'/') if bytes.get(i + 1) == Some(&b'>') => {
                i += 2;
                break true;
            }
            Some(_) => {}
        }

        let attr_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && bytes[i] != b'='
            && bytes[i] != b'>'
            && !bytes[i..].starts_with(b"/>")
        {
            i += 1;
        }
        if i == attr_start {
            return Err(malformed);
        }
        let attr_name = src[attr_start..i].to_string();

        let after_name = skip_whitespace(bytes, i);
        let value = if bytes.get(after_name) == Some(&b'=') {
            let (value, end) = scan_value(src, skip_whitespace(bytes, after_name + 1), start)?;
            i = end;
            Some(value)
        } else {
            None
        };
        attrs.push(RawAttr {
            name: attr_name,
            value,
        });
    };

    Ok((
        Piece::Open {
            name,
            attrs,
            self_closing,
            position: start,
        },
        i,
    ))
}

/// Attribute value at `i`, quoted or bare
fn scan_value(src: &str, mut i: usize, tag_start: usize) -> Result<(String, usize), CompileError> {
    let bytes = src.as_bytes();
    match bytes.get(i) {
        Some(&quote) if quote == b'"' || quote == b'\'' => {
            i += 1;
            let value_start = i;
            loop {
                match bytes.get(i) {
                    None => return Err(CompileError::MalformedTag(tag_start)),
                    Some(_) if bytes[i..].starts_with(b"{{") => i = skip_expression(src, i)?,
                    Some(&b) if b == quote => break,
                    Some(_) => i += 1,
                }
            }
            Ok((src[value_start..i].to_string(), i + 1))
        }
        Some(_) => {
            let value_start = i;
            while i < bytes.len()
                && !bytes[i].is_ascii_whitespace()
                && bytes[i] != b'>'
                && !bytes[i..].starts_with(b"/>")
            {
                if bytes[i..].starts_with(b"{{") {
                    i = skip_expression(src, i)?;
                } else {
                    i += 1;
                }
            }
            Ok((src[value_start..i].to_string(), i))
        }
        None => Err(CompileError::MalformedTag(tag_start)),
    }
}

/// Decode the common HTML entities in literal text
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let c = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
