//! Entity payloads returned by the external normalization and name services.

use serde::{Deserialize, Serialize};

/// Prefix carried by Biolink category names.
pub const BIOLINK_PREFIX: &str = "biolink:";

/// Synonyms kept per candidate when it is recorded in a debug trace.
const TRACE_SYNONYM_LIMIT: usize = 10;

/// Types kept per candidate when it is recorded in a debug trace.
const TRACE_TYPE_LIMIT: usize = 3;

/// An identifier with its optional label, as used by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Normalizer answer for one input CURIE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEntity {
    /// Preferred identifier and label of the equivalence clique.
    pub id: Identifier,
    #[serde(default)]
    pub equivalent_identifiers: Vec<Identifier>,
    /// Semantic types, most specific first.
    #[serde(default, rename = "type")]
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub information_content: Option<f64>,
}

impl NormalizedEntity {
    pub fn preferred_id(&self) -> &str {
        &self.id.identifier
    }

    pub fn preferred_label(&self) -> Option<&str> {
        self.id.label.as_deref()
    }

    /// Whether `curie` belongs to this entity's equivalence clique.
    pub fn is_equivalent(&self, curie: &str) -> bool {
        self.id.identifier == curie
            || self
                .equivalent_identifiers
                .iter()
                .any(|eq| eq.identifier == curie)
    }
}

/// Synonym service answer for one preferred identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynonymSet {
    #[serde(default)]
    pub curie: Option<String>,
    #[serde(default)]
    pub preferred_name: Option<String>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub taxa: Vec<String>,
}

impl SynonymSet {
    /// Most specific semantic type, always `biolink:`-prefixed.
    pub fn primary_type(&self) -> Option<String> {
        self.types.first().map(|t| with_biolink_prefix(t))
    }

    pub fn is_empty(&self) -> bool {
        self.names.iter().all(|n| n.trim().is_empty())
    }
}

/// One candidate returned by reverse name lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    pub curie: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub taxa: Vec<String>,
}

impl LookupResult {
    /// Case-insensitive equality of `query` with the preferred label.
    pub fn label_matches(&self, query: &str) -> bool {
        eq_ignore_case(&self.label, query)
    }

    /// Case-insensitive equality of `query` with one of the synonyms.
    pub fn synonym_matches(&self, query: &str) -> bool {
        self.synonyms.iter().any(|s| eq_ignore_case(s, query))
    }

    /// Exact match on either the label or a synonym.
    pub fn is_exact_match(&self, query: &str) -> bool {
        self.label_matches(query) || self.synonym_matches(query)
    }

    /// Copy trimmed for storage in a debug trace.
    #[must_use]
    pub fn summarized(&self) -> Self {
        Self {
            curie: self.curie.clone(),
            label: self.label.clone(),
            synonyms: self
                .synonyms
                .iter()
                .take(TRACE_SYNONYM_LIMIT)
                .cloned()
                .collect(),
            score: self.score,
            types: self
                .types
                .iter()
                .map(|t| t.trim_start_matches(BIOLINK_PREFIX).to_string())
                .take(TRACE_TYPE_LIMIT)
                .collect(),
            taxa: self.taxa.clone(),
        }
    }
}

/// Keep only candidates that carry `query` verbatim (case-insensitive).
pub fn exact_matches(query: &str, results: Vec<LookupResult>) -> Vec<LookupResult> {
    results
        .into_iter()
        .filter(|r| r.is_exact_match(query))
        .collect()
}

pub fn with_biolink_prefix(category: &str) -> String {
    if category.starts_with(BIOLINK_PREFIX) {
        category.to_string()
    } else {
        format!("{BIOLINK_PREFIX}{category}")
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
