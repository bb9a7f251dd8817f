//! Domain types shared by the QC pipeline.
//!
//! - [`edge`]: the subject–predicate–object edges read from the corpus
//! - [`entity`]: payloads returned by the normalizer, synonym and lookup services
//! - [`classification`]: the three QC buckets and the per-edge debug trace

pub mod classification;
pub mod edge;
pub mod entity;

pub use classification::{
    AmbiguityKind, Classification, ClassifiedEdge, DebugTrace, QC_PHASE, Role, RoleTrace,
};
pub use edge::{Edge, Node};
pub use entity::{Identifier, LookupResult, NormalizedEntity, SynonymSet, exact_matches};

/// A compact URI (`prefix:local_id`). Opaque apart from prefix matching.
pub type Curie = String;

/// Return the prefix of a CURIE (`"NCBIGene"` for `"NCBIGene:8788"`).
pub fn curie_prefix(curie: &str) -> &str {
    curie.split_once(':').map_or(curie, |(prefix, _)| prefix)
}
