pub mod chunk;
pub mod citation;
pub mod finding;
pub mod profile;
pub mod rank;
pub mod section;

pub use chunk::{Chunk, Document, chunk_document};
pub use citation::resolve_citations;
pub use finding::{Citation, ImpactDirection, ImpactFinding, Severity};
pub use profile::ReaderProfile;
pub use rank::{DEFAULT_MAX_FINDINGS, rank_findings};
pub use section::section_label;
