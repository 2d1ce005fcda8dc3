//! Paragraph chunking for legislative text.
//!
//! A bill is split on line breaks into addressable chunks. Each chunk carries
//! a sequential id (`p-1`, `p-2`, ...) that the analysis stages use to cite
//! the passage a finding came from.

use serde::{Deserialize, Serialize};

/// Prefix for chunk ids. Ids are `p-<ordinal>` with a 1-based ordinal.
pub const CHUNK_ID_PREFIX: &str = "p-";

/// A legislative document as supplied by the document store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub text: String,
}

impl Document {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }

    /// True when the text holds nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// An addressable unit of document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub content: String,
}

impl Chunk {
    /// 1-based position of the chunk within its run, parsed from the id.
    pub fn ordinal(&self) -> Option<usize> {
        self.id.strip_prefix(CHUNK_ID_PREFIX)?.parse().ok()
    }
}

/// Split a document into paragraph chunks.
///
/// Paragraph boundaries are runs of one or more line breaks. Paragraphs that
/// are empty after trimming are dropped, so a blank document yields an empty
/// vector rather than an error.
pub fn chunk_document(document: &Document) -> Vec<Chunk> {
    chunk_text(&document.text)
}

/// Split raw text into paragraph chunks. See [`chunk_document`].
pub fn chunk_text(text: &str) -> Vec<Chunk> {
    text.split(['\n', '\r'])
        .map(str::trim)
        .filter(|para| !para.is_empty())
        .enumerate()
        .map(|(i, para)| Chunk {
            id: format!("{CHUNK_ID_PREFIX}{}", i + 1),
            content: para.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn normalize_ws(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn splits_on_blank_lines() {
        let chunks = chunk_text("SEC. 1. Short title.\n\nSEC. 2. Definitions.\n\n\nSEC. 3. Credit.");
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].id, "p-1");
        assert_eq!(chunks[2].id, "p-3");
        assert_eq!(chunks[1].content, "SEC. 2. Definitions.");
    }

    #[test]
    fn single_line_breaks_are_boundaries() {
        let chunks = chunk_text("first\nsecond\r\nthird");
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn whitespace_only_paragraphs_dropped() {
        let chunks = chunk_text("  \n\t\nreal text\n   \n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "p-1");
        assert_eq!(chunks[0].content, "real text");
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_text("").is_empty());
        assert!(chunk_document(&Document::new("Blank", "   \n\n  ")).is_empty());
    }

    #[test]
    fn join_reproduces_text_modulo_whitespace() {
        let text = "TITLE I\n\n  SEC. 101. Findings.  \nCongress finds the following:\n\n\n(1) Costs rose.\n";
        let chunks = chunk_text(text);
        let joined = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(normalize_ws(&joined), normalize_ws(text));
        assert!(chunks.iter().all(|c| !c.content.trim().is_empty()));
    }

    #[test]
    fn deterministic() {
        let text = "a\n\nb\n\nc";
        assert_eq!(chunk_text(text), chunk_text(text));
    }

    #[test]
    fn ordinal_from_id() {
        let chunks = chunk_text("a\nb");
        assert_eq!(chunks[1].ordinal(), Some(2));
        let odd = Chunk {
            id: "x-9".into(),
            content: "z".into(),
        };
        assert_eq!(odd.ordinal(), None);
    }

    proptest! {
        #[test]
        fn property_join_reproduces_text_modulo_whitespace(text in "(\\PC|\n|\r|\t){0,300}") {
            let chunks = chunk_text(&text);
            let joined = chunks
                .iter()
                .map(|c| c.content.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            prop_assert_eq!(normalize_ws(&joined), normalize_ws(&text));
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert!(!chunk.content.trim().is_empty());
                prop_assert_eq!(&chunk.id, &format!("p-{}", i + 1));
            }
            prop_assert_eq!(chunk_text(&text), chunks);
        }
    }
}
