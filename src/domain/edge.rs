//! Corpus records: edges and nodes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sentinel used by the text-mining provider for "no sentence".
const NO_TEXT_SENTINEL: &str = "NA";

/// Separator between individual supporting sentences.
const SENTENCE_SEPARATOR: char = '|';

/// A text-mined knowledge graph edge.
///
/// Fields not needed by QC (publications, qualifiers, confidence scores, …)
/// are carried through untouched in `provenance` and written back out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub subject: String,
    pub object: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentences: Option<String>,
    #[serde(flatten)]
    pub provenance: Map<String, Value>,
}

impl Edge {
    /// Build an edge with only the fields QC looks at.
    pub fn new(
        subject: impl Into<String>,
        object: impl Into<String>,
        sentences: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
            predicate: None,
            sentences: Some(sentences.into()),
            provenance: Map::new(),
        }
    }

    /// Raw `sentences` value, `"NA"` when absent.
    pub fn raw_text(&self) -> &str {
        self.sentences.as_deref().unwrap_or(NO_TEXT_SENTINEL)
    }

    /// Whether the edge carries any usable supporting text.
    pub fn has_supporting_text(&self) -> bool {
        self.supporting_text().is_some()
    }

    /// Supporting sentences with sentinels removed, one sentence per line.
    ///
    /// Returns `None` when nothing remains (missing, blank, or only `NA`).
    pub fn supporting_text(&self) -> Option<String> {
        let raw = self.sentences.as_deref()?;
        let sentences: Vec<&str> = raw
            .split(SENTENCE_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != NO_TEXT_SENTINEL)
            .collect();

        if sentences.is_empty() {
            None
        } else {
            Some(sentences.join("\n"))
        }
    }
}

/// A corpus node. Only the display name is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}
