//! Attach source passages to findings.

use std::collections::HashMap;

use tracing::debug;

use crate::{Chunk, Citation, ImpactFinding, section_label};

/// Resolve each finding's `source_chunk_id` against the run's chunks.
///
/// A matching chunk sets `citation` to the chunk's literal text and derived
/// section label. Missing or dangling ids leave the finding uncited; this
/// never fails.
pub fn resolve_citations(mut findings: Vec<ImpactFinding>, chunks: &[Chunk]) -> Vec<ImpactFinding> {
    let by_id: HashMap<&str, (usize, &Chunk)> = chunks
        .iter()
        .enumerate()
        .map(|(pos, chunk)| (chunk.id.as_str(), (pos, chunk)))
        .collect();

    for finding in &mut findings {
        let resolved = finding
            .source_chunk_id
            .as_deref()
            .and_then(|id| by_id.get(id.trim()));

        finding.citation = match resolved {
            Some(&(pos, chunk)) => Some(Citation {
                text: chunk.content.clone(),
                section_label: section_label(chunk, pos),
            }),
            None => {
                if let Some(id) = &finding.source_chunk_id {
                    debug!(chunk_id = %id, title = %finding.title, "citation target not found");
                }
                None
            }
        };
    }

    findings
}
