//! Per-classification JSON-lines output.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::domain::{Classification, ClassifiedEdge};

/// One append-only file per classification, truncated on creation.
#[derive(Debug)]
pub struct ClassifiedWriter {
    dir: PathBuf,
    files: BTreeMap<Classification, File>,
    written: BTreeMap<Classification, usize>,
}

impl ClassifiedWriter {
    pub async fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;

        let mut files = BTreeMap::new();
        for classification in Classification::ALL {
            let path = dir.join(classification.file_name());
            let file = File::create(&path)
                .await
                .with_context(|| format!("failed to create {}", path.display()))?;
            files.insert(classification, file);
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            written: BTreeMap::new(),
        })
    }

    pub fn path(&self, classification: Classification) -> PathBuf {
        self.dir.join(classification.file_name())
    }

    /// Append one row and flush it so progress is visible during long runs.
    pub async fn write(&mut self, row: &ClassifiedEdge) -> Result<()> {
        let classification = row.qc_classification;
        let mut line = serde_json::to_vec(row).context("failed to serialize classified edge")?;
        line.push(b'\n');

        let path = self.path(classification);
        let file = self
            .files
            .get_mut(&classification)
            .with_context(|| format!("no output file open for {classification}"))?;
        file.write_all(&line)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("failed to flush {}", path.display()))?;

        *self.written.entry(classification).or_default() += 1;
        Ok(())
    }

    pub fn written(&self, classification: Classification) -> usize {
        self.written.get(&classification).copied().unwrap_or(0)
    }
}
