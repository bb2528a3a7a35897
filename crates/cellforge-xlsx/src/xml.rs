//! Small XML text helpers shared by the reader and writer

use std::borrow::Cow;

/// Escape text for use in element content or attribute values
///
/// Control characters XML 1.0 cannot carry are written as Excel's
/// `_xHHHH_` escapes.
pub(crate) fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if needs_escape(c) => out.push_str(&format!("_x{:04X}_", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Escape cell text that the reader passes through [`decode_excel_escapes`]
///
/// A literal `_xHHHH_` run gets its leading underscore written as
/// `_x005F_`, so it reads back verbatim instead of as the escaped character.
pub(crate) fn escape_cell_text(s: &str) -> String {
    if !s.contains("_x") {
        return escape_xml(s);
    }

    let mut protected = String::with_capacity(s.len() + 7);
    let mut rest = s;
    while let Some(pos) = rest.find("_x") {
        protected.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        // A control character right after the hex digits is itself escaped
        // to something starting with `_`
        let closes = match candidate.get(6..).and_then(|t| t.chars().next()) {
            Some('_') => true,
            Some(c) => needs_escape(c),
            None => false,
        };
        let hex = candidate
            .as_bytes()
            .get(2..6)
            .is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit));
        if hex && closes {
            protected.push_str("_x005F_");
        } else {
            protected.push('_');
        }
        rest = &candidate[1..];
    }
    protected.push_str(rest);
    escape_xml(&protected)
}

/// Control characters XML 1.0 cannot carry
fn needs_escape(c: char) -> bool {
    (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r')
}

/// Whether `s` starts with a well-formed `_xHHHH_` run
fn is_excel_escape(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 7
        && bytes.starts_with(b"_x")
        && bytes[2..6].iter().all(u8::is_ascii_hexdigit)
        && bytes[6] == b'_'
}

/// Decode Excel's `_xHHHH_` escapes (`_x000D_` is a carriage return)
pub(crate) fn decode_excel_escapes(s: &str) -> Cow<'_, str> {
    if !s.contains("_x") {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find("_x") {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        let decoded = Some(candidate)
            .filter(|c| is_excel_escape(c))
            .and_then(|c| u32::from_str_radix(&c[2..6], 16).ok())
            .and_then(char::from_u32);

        match decoded {
            Some(c) => {
                out.push(c);
                rest = &candidate[7..];
            }
            None => {
                out.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}
