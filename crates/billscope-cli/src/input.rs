//! Reading the bill text and reader profile from disk.

use std::path::Path;

use anyhow::{Context, Result};
use billscope_core::{Document, ReaderProfile};

/// Load a reader profile from a JSON file. Missing fields stay unknown.
pub fn load_profile(path: &Path) -> Result<ReaderProfile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read profile: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("invalid profile JSON: {}", path.display()))
}

/// Load the bill text. The title defaults to the file stem.
pub fn load_document(path: &Path, title: Option<&str>) -> Result<Document> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read document: {}", path.display()))?;
    let title = match title {
        Some(t) => t.to_string(),
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    Ok(Document::new(title, text))
}
