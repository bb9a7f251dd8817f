//! Streaming readers for the JSON-lines corpora.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, info};

use crate::domain::{Curie, Edge, Node};

/// Map node id to display name. Nodes without a name are skipped.
pub async fn load_node_names(path: &Path) -> Result<HashMap<Curie, String>> {
    let file = File::open(path)
        .await
        .with_context(|| format!("failed to open nodes file {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();
    let mut names = HashMap::new();
    let mut line_no = 0usize;

    while let Some(line) = lines
        .next_line()
        .await
        .with_context(|| format!("failed to read {}", path.display()))?
    {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let node: Node = serde_json::from_str(&line)
            .with_context(|| format!("malformed node at {}:{line_no}", path.display()))?;
        if let Some(name) = node.name.filter(|n| !n.trim().is_empty()) {
            names.insert(node.id, name);
        }
    }

    info!(
        name: "corpus.nodes.loaded",
        path = %path.display(),
        nodes = names.len(),
        "Loaded node names"
    );
    Ok(names)
}

/// Sequential reader over an edges file, optionally capped.
#[derive(Debug)]
pub struct EdgeReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
    remaining: Option<usize>,
}

impl EdgeReader {
    pub async fn open(path: &Path, max_edges: Option<usize>) -> Result<Self> {
        let file = File::open(path)
            .await
            .with_context(|| format!("failed to open edges file {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
            remaining: max_edges,
        })
    }

    /// Next edge, or `None` at end of file or once the cap is reached.
    pub async fn next_edge(&mut self) -> Result<Option<Edge>> {
        if self.remaining == Some(0) {
            return Ok(None);
        }

        while let Some(line) = self
            .lines
            .next_line()
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?
        {
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let edge: Edge = serde_json::from_str(&line).with_context(|| {
                format!("malformed edge at {}:{}", self.path.display(), self.line_no)
            })?;
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
            }
            return Ok(Some(edge));
        }
        Ok(None)
    }

    /// Up to `size` edges; empty once the input is exhausted.
    pub async fn next_batch(&mut self, size: usize) -> Result<Vec<Edge>> {
        let mut batch = Vec::with_capacity(size);
        while batch.len() < size {
            match self.next_edge().await? {
                Some(edge) => batch.push(edge),
                None => break,
            }
        }
        Ok(batch)
    }
}

/// Every subject and object CURIE referenced by the (capped) edge stream,
/// with the number of edges seen.
pub async fn collect_entities(
    path: &Path,
    max_edges: Option<usize>,
) -> Result<(BTreeSet<Curie>, usize)> {
    let mut reader = EdgeReader::open(path, max_edges).await?;
    let mut curies = BTreeSet::new();
    let mut edges = 0usize;

    while let Some(edge) = reader.next_edge().await? {
        edges += 1;
        curies.insert(edge.subject);
        curies.insert(edge.object);
        if edges % 100_000 == 0 {
            debug!(edges, entities = curies.len(), "Collecting entities");
        }
    }
    Ok((curies, edges))
}
