//! Catalog import: pull motor records from remote catalog services into a
//! local catalog file.

use std::collections::HashSet;
use std::path::Path;

use mechsel_core::MotorRecord;
use tracing::info;

use crate::catalog::{CatalogError, HttpCatalog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub fetched: usize,
    pub written: usize,
    pub duplicates: usize,
}

/// Merge records by id, first occurrence wins, source order preserved.
pub fn merge(batches: Vec<Vec<MotorRecord>>) -> (Vec<MotorRecord>, usize) {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    let mut duplicates = 0;
    for motor in batches.into_iter().flatten() {
        if seen.insert(motor.id.clone()) {
            merged.push(motor);
        } else {
            duplicates += 1;
        }
    }
    (merged, duplicates)
}

/// Fetch every source, merge, and atomically write the catalog file. Nothing
/// is written if any source fails.
pub async fn import_catalog(
    client: &reqwest::Client,
    sources: &[String],
    out: &Path,
) -> Result<ImportSummary, CatalogError> {
    let mut batches = Vec::with_capacity(sources.len());
    for url in sources {
        let motors = HttpCatalog::new(client.clone(), url.clone()).fetch_all().await?;
        info!(%url, count = motors.len(), "source fetched");
        batches.push(motors);
    }

    let fetched = batches.iter().map(Vec::len).sum();
    let (merged, duplicates) = merge(batches);
    mechsel_core::write_catalog(out, &merged)?;
    info!(path = %out.display(), written = merged.len(), duplicates, "catalog written");

    Ok(ImportSummary {
        fetched,
        written: merged.len(),
        duplicates,
    })
}
