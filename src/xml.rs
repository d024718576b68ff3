//! Text hygiene for emitted SVG: instruction kinds and location names come
//! straight from the dump and may hold anything.

/// Characters allowed by XML 1.0
fn is_valid_xml_char(c: char) -> bool {
    matches!(
        c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF
    )
}

pub fn sanitize_xml_text(text: &str) -> String {
    text.chars().filter(|&c| is_valid_xml_char(c)).collect()
}

/// Append `text` to `out` as character data or an attribute value.
pub fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars().filter(|&c| is_valid_xml_char(c)) {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
}

pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    push_escaped(&mut escaped, text);
    escaped
}

/// Wrap `text` in a CDATA section, splitting any `]]>` it contains.
pub fn cdata(text: &str) -> String {
    let body = sanitize_xml_text(text).replace("]]>", "]]]]><![CDATA[>");
    format!("<![CDATA[{}]]>", body)
}
