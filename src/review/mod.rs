//! Read-only access to classified output for human review.

pub mod routes;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::{Classification, DebugTrace, LookupResult, Role};

pub use routes::build_router;

/// Row counts per classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewSummary {
    pub passed: usize,
    pub unresolved: usize,
    pub ambiguous: usize,
    pub total: usize,
}

/// Classified rows held in memory, one list per bucket.
#[derive(Debug, Clone, Default)]
pub struct EdgeReviewer {
    output_dir: PathBuf,
    rows: BTreeMap<Classification, Vec<Value>>,
}

impl EdgeReviewer {
    pub async fn load(output_dir: &Path) -> Result<Self> {
        let mut reviewer = Self {
            output_dir: output_dir.to_path_buf(),
            rows: BTreeMap::new(),
        };
        reviewer.reload().await?;
        Ok(reviewer)
    }

    /// Re-read every output file. Missing files count as empty.
    pub async fn reload(&mut self) -> Result<ReviewSummary> {
        let mut rows = BTreeMap::new();
        for classification in Classification::ALL {
            let path = self.output_dir.join(classification.file_name());
            rows.insert(classification, read_rows(&path).await?);
        }
        self.rows = rows;

        let summary = self.summary();
        info!(
            name: "review.output.loaded",
            dir = %self.output_dir.display(),
            passed = summary.passed,
            unresolved = summary.unresolved,
            ambiguous = summary.ambiguous,
            "Loaded classified edges"
        );
        Ok(summary)
    }

    pub fn count(&self, classification: Classification) -> usize {
        self.rows.get(&classification).map_or(0, Vec::len)
    }

    pub fn summary(&self) -> ReviewSummary {
        let passed = self.count(Classification::Passed);
        let unresolved = self.count(Classification::Unresolved);
        let ambiguous = self.count(Classification::Ambiguous);
        ReviewSummary {
            passed,
            unresolved,
            ambiguous,
            total: passed + unresolved + ambiguous,
        }
    }

    pub fn edge(&self, classification: Classification, index: usize) -> Option<&Value> {
        self.rows.get(&classification)?.get(index)
    }

    /// Every candidate recorded for `role` in the edge's trace, one per
    /// identifier, highest score first.
    pub fn candidates(
        &self,
        classification: Classification,
        index: usize,
        role: Role,
    ) -> Option<Vec<LookupResult>> {
        let edge = self.edge(classification, index)?;
        let trace: DebugTrace = edge
            .get("qc_debug")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let mut candidates: Vec<LookupResult> = trace
            .role(role)
            .lookup_data
            .values()
            .flatten()
            .cloned()
            .collect();
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        let mut seen = HashSet::new();
        candidates.retain(|c| seen.insert(c.curie.clone()));
        Some(candidates)
    }
}

async fn read_rows(path: &Path) -> Result<Vec<Value>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
    };

    let mut rows = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(row) => rows.push(row),
            Err(e) => warn!(
                path = %path.display(),
                line = line_no + 1,
                error = %e,
                "Skipping malformed output row"
            ),
        }
    }
    Ok(rows)
}
