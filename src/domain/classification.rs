//! QC outcome types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Edge, LookupResult};

/// Phase tag stamped on every output row.
pub const QC_PHASE: &str = "phase1_entity_identification";

/// The three QC buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Both entities found in text and resolved to the expected identifiers.
    Passed,
    /// One or both entities not evidenced in text.
    Unresolved,
    /// A mention resolves to several distinct entities; needs a human.
    Ambiguous,
}

impl Classification {
    pub const ALL: [Self; 3] = [Self::Passed, Self::Unresolved, Self::Ambiguous];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Unresolved => "unresolved",
            Self::Ambiguous => "ambiguous",
        }
    }

    /// Output file name for this bucket.
    pub fn file_name(self) -> String {
        format!("{}_edges.jsonl", self.as_str())
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "passed" => Ok(Self::Passed),
            "unresolved" => Ok(Self::Unresolved),
            "ambiguous" => Ok(Self::Ambiguous),
            other => Err(format!("unknown classification: {other}")),
        }
    }
}

/// Which end of the edge an entity sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Subject,
    Object,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::Object => "object",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Subject => "Subject",
            Self::Object => "Object",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subject" => Ok(Self::Subject),
            "object" => Ok(Self::Object),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Why a synonym could not be pinned to one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityKind {
    /// Several candidates carry the synonym as their preferred label.
    MultiplePreferredLabels,
    /// No candidate uses it as a label and several list it as a synonym.
    MultipleRegularSynonyms,
}

impl AmbiguityKind {
    /// Human-readable explanation naming the offending synonym.
    pub fn describe(self, synonym: &str) -> String {
        match self {
            Self::MultiplePreferredLabels => {
                format!("Multiple entities have \"{synonym}\" as preferred label")
            }
            Self::MultipleRegularSynonyms => format!(
                "Multiple entities have \"{synonym}\" as regular synonym (no preferred label)"
            ),
        }
    }
}

/// Per-role evidence collected while classifying an edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleTrace {
    /// Synonyms of the expected entity found in the supporting text.
    pub synonyms_found: Vec<String>,
    pub ambiguous: bool,
    /// Candidates per found synonym; narrowed to the winner when there is one.
    pub lookup_data: BTreeMap<String, Vec<LookupResult>>,
}

/// Reproducible record of how an edge was classified.
///
/// Missing fields read back as empty, so hand-edited output rows still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugTrace {
    pub subject_curie: String,
    pub object_curie: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_preferred: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_preferred: Option<String>,
    pub edge_text: String,
    pub subject: RoleTrace,
    pub object: RoleTrace,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DebugTrace {
    pub fn for_edge(edge: &Edge) -> Self {
        Self {
            subject_curie: edge.subject.clone(),
            object_curie: edge.object.clone(),
            edge_text: edge.raw_text().to_string(),
            ..Self::default()
        }
    }

    pub fn role(&self, role: Role) -> &RoleTrace {
        match role {
            Role::Subject => &self.subject,
            Role::Object => &self.object,
        }
    }

    pub fn role_mut(&mut self, role: Role) -> &mut RoleTrace {
        match role {
            Role::Subject => &mut self.subject,
            Role::Object => &mut self.object,
        }
    }
}

/// An output row: the original edge plus the QC annotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedEdge {
    #[serde(flatten)]
    pub edge: Edge,
    pub edge_id: String,
    pub subject_name: String,
    pub object_name: String,
    pub qc_classification: Classification,
    pub qc_phase: String,
    pub qc_debug: DebugTrace,
}
