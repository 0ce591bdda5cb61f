//! Text and XML helpers shared by the reader and the emitter.

use std::borrow::Cow;

/// Decode bytes to a string, handling various encodings.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding (from `<?xml encoding="..."?>`)
/// 3. Falls back to Windows-1252 (older ILIAS installations export Latin-1)
///
/// Uses `Cow<str>` to avoid allocation when the input is valid UTF-8.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    // Try UTF-8 first (handles BOM automatically)
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Extract the `encoding="..."` label from an XML declaration, if present.
pub fn xml_encoding_hint(bytes: &[u8]) -> Option<&str> {
    let head = &bytes[..bytes.len().min(200)];
    let head = std::str::from_utf8(head).ok().or_else(|| {
        // Declaration is ASCII; cut at the first non-ASCII byte.
        let end = head.iter().position(|b| !b.is_ascii()).unwrap_or(head.len());
        std::str::from_utf8(&head[..end]).ok()
    })?;
    if !head.starts_with("<?xml") {
        return None;
    }
    let decl_end = head.find("?>")?;
    let decl = &head[..decl_end];
    let start = decl.find("encoding=")? + "encoding=".len();
    let quote = decl[start..].chars().next()?;
    let rest = &decl[start + 1..];
    let end = rest.find(quote)?;
    Some(&rest[..end])
}

/// Strip a UTF-8 byte order mark.
pub fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}

/// Strip a namespace prefix from an XML name (`exp:Export` → `Export`).
pub fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|&b| b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// Escape special XML characters for element text and attribute values.
pub fn escape_xml(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Whether a character is allowed in an XML 1.0 document.
pub fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Return the first character of `s` that XML 1.0 cannot carry.
pub fn first_invalid_xml_char(s: &str) -> Option<char> {
    s.chars().find(|&c| !is_xml_char(c))
}

/// Remove characters XML 1.0 cannot carry.
pub fn sanitize_xml_text(s: &str) -> Cow<'_, str> {
    if first_invalid_xml_char(s).is_none() {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.chars().filter(|&c| is_xml_char(c)).collect())
}

/// Resolve the name inside a general entity reference (`amp`, `#228`, `#xE4`).
pub fn resolve_entity(name: &str) -> Option<Cow<'static, str>> {
    let predefined = match name {
        "amp" => Some("&"),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "quot" => Some("\""),
        "apos" => Some("'"),
        "nbsp" => Some("\u{a0}"),
        _ => None,
    };
    if let Some(s) = predefined {
        return Some(Cow::Borrowed(s));
    }
    let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()?
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse().ok()?
    } else {
        return None;
    };
    char::from_u32(code).map(|c| Cow::Owned(c.to_string()))
}

/// Lowercase ASCII slug used for archive file names.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_dash = true;
    for c in s.chars() {
        let mapped = match c {
            'ä' | 'Ä' => Some("ae"),
            'ö' | 'Ö' => Some("oe"),
            'ü' | 'Ü' => Some("ue"),
            'ß' => Some("ss"),
            _ => None,
        };
        if let Some(m) = mapped {
            out.push_str(m);
            last_dash = false;
        } else if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("course");
    }
    out
}
