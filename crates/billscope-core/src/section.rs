//! Human-readable section labels for cited chunks.
//!
//! Bills open their operative paragraphs with a heading that names the
//! provision. The label shown next to a citation is taken from that heading
//! when one is present, otherwise from the chunk's position.
//!
//! # Recognised headings
//!
//! - `SEC. 12.`, `Sec. 12A`, `SECTION 12`, `Section 12(a)` → `Section 12`, `Section 12A`, `Section 12(a)`
//! - `§ 12` / `§12.3` → `Section 12` / `Section 12.3`
//! - `TITLE IV` / `Title 4` → `Title IV` / `Title 4`
//! - anything else → `Paragraph <ordinal>`

use std::sync::LazyLock;

use regex::Regex;

use crate::Chunk;

static SECTION_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:sec(?:tion)?\.?|§+)\s*(\d+[A-Za-z]*(?:\.\d+)*(?:\([0-9A-Za-z]+\))*)")
        .expect("section heading regex is valid")
});

static TITLE_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?i:title)\s+([IVXLC]+|\d+)\b").expect("title heading regex is valid")
});

/// Derive the display label for a chunk.
///
/// `position` is the chunk's 0-based index in its run and is used only when
/// neither the heading nor the chunk id yields a label.
pub fn section_label(chunk: &Chunk, position: usize) -> String {
    let content = chunk.content.as_str();

    if let Some(caps) = SECTION_HEADING.captures(content) {
        let number = caps[1].trim_end_matches('.');
        return format!("Section {}", uppercase_suffix(number));
    }

    if let Some(caps) = TITLE_HEADING.captures(content) {
        return format!("Title {}", &caps[1]);
    }

    let ordinal = chunk.ordinal().unwrap_or(position + 1);
    format!("Paragraph {ordinal}")
}

/// Uppercase the letter suffix of a provision number outside parentheses:
/// `12a(b)` → `12A(b)`.
fn uppercase_suffix(number: &str) -> String {
    let split = number.find('(').unwrap_or(number.len());
    let (head, tail) = number.split_at(split);
    format!("{}{}", head.to_ascii_uppercase(), tail)
}
