// ============================================================
// Layer 6 — CSV Report Writer
// ============================================================
// Writes one CSV row per serialisable record, header first.
// Used by `verify --report` for the per-entry outcomes of the
// dual-path equivalence check:
//
//   index,title,question,left_answer,right_answer,matched
//   0,Super_Bowl_50,Which NFL team ...?,Denver Broncos,Denver Broncos,true
//   ...
//
// Empty answers (the engine found nothing) are empty fields.

use anyhow::{Context, Result};
use serde::Serialize;
use std::{fs, path::{Path, PathBuf}};

pub struct CsvReport {
    path: PathBuf,
}

impl CsvReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the report with `rows`.
    pub fn write<T: Serialize>(&self, rows: &[T]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }

        let mut writer = csv::Writer::from_path(&self.path)
            .with_context(|| format!("Cannot create report '{}'", self.path.display()))?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        tracing::debug!("Wrote {} report rows to '{}'", rows.len(), self.path.display());
        Ok(())
    }
}
