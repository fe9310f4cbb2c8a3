//! Content classifier — extracts the structural tag a generation model
//! embeds at the end of a text unit (`[CH]`, `[CB]`, `[CF]`) and strips it
//! from the visible content.
//!
//! Pure functions, no I/O. Unknown tags are left in place and the fragment
//! degrades to plain text — a classification anomaly never fails a stream.

use mizan_core::types::SectionType;

/// Classify a text fragment and return `(section_type, clean_text)`.
///
/// The tag is looked for at the end of the trimmed string first; if absent
/// there, anywhere in the string (tags can arrive mid-stream before the
/// trailing context is seen). Idempotent: already-clean text comes back as
/// `(Text, text)` unchanged.
pub fn classify(text: &str) -> (SectionType, String) {
    let trimmed = text.trim();

    if let Some((section, clean)) = strip_trailing_tag(trimmed) {
        return (section, clean);
    }
    if let Some((section, clean)) = strip_inner_tag(trimmed) {
        return (section, clean);
    }

    (SectionType::Text, trimmed.to_string())
}

/// Match a known `[XX]` tag anchored at the end of the trimmed string.
fn strip_trailing_tag(trimmed: &str) -> Option<(SectionType, String)> {
    let rest = trimmed.strip_suffix(']')?;
    // tag body is exactly two chars; everything is ASCII so byte math is safe
    if rest.len() < 3 || !rest.is_char_boundary(rest.len() - 3) {
        return None;
    }
    let (before, tag) = rest.split_at(rest.len() - 3);
    let tag = tag.strip_prefix('[')?;
    let section = known_tag(tag)?;
    Some((section, before.trim_end().to_string()))
}

/// Match the first known `[XX]` tag anywhere in the string and splice it out.
fn strip_inner_tag(trimmed: &str) -> Option<(SectionType, String)> {
    let bytes = trimmed.as_bytes();
    for start in 0..bytes.len().saturating_sub(3) {
        if bytes[start] != b'['
            || bytes[start + 3] != b']'
            || !bytes[start + 1].is_ascii_uppercase()
            || !bytes[start + 2].is_ascii_uppercase()
        {
            continue;
        }
        let tag = &trimmed[start + 1..start + 3];
        if let Some(section) = known_tag(tag) {
            let before = trimmed[..start].trim_end();
            let after = trimmed[start + 4..].trim_start();
            let clean = if before.is_empty() {
                after.to_string()
            } else if after.is_empty() {
                before.to_string()
            } else {
                format!("{before} {after}")
            };
            return Some((section, clean));
        }
    }
    None
}

fn known_tag(tag: &str) -> Option<SectionType> {
    if tag.len() == 2 && tag.bytes().all(|b| b.is_ascii_uppercase()) {
        SectionType::from_tag(tag)
    } else {
        None
    }
}
