//! Fold completed jobs into the variant matrix.
//!
//! A row is seeded by the first job seen for its variant. After that a cell
//! only changes when it has no success yet and the incoming job succeeded,
//! so successes are sticky and non-success values keep their first sighting.
use crate::error::CrawlError;
use crate::registry::Registry;
use crate::types::{Cell, Entry, JobResult, Matrix, ProwJob, Variant};
use std::collections::BTreeMap;

/// The matrix plus the jobs that could not be placed in it.
#[derive(Debug, Default)]
pub struct Aggregation {
    pub matrix: Matrix,
    pub unknown_jobs: Vec<String>,
}

pub fn aggregate(jobs: &[ProwJob], registry: &Registry) -> Aggregation {
    let mut aggregation = Aggregation::default();
    for job in jobs {
        let Some(variant) = registry.lookup(&job.name) else {
            let err = CrawlError::UnknownVariant {
                job: job.name.clone(),
            };
            tracing::warn!(url = %job.job_page_url, "{err}");
            aggregation.unknown_jobs.push(job.name.clone());
            continue;
        };
        apply(&mut aggregation.matrix, variant, job);
    }
    aggregation
}

/// Seed or merge one job into its variant's row.
pub fn apply(matrix: &mut Matrix, variant: &Variant, job: &ProwJob) {
    match matrix.get_mut(&variant.name) {
        Some(entry) => merge_entry(entry, variant, job),
        None => {
            matrix.insert(variant.name.clone(), new_entry(variant, job));
        }
    }
}

pub fn new_entry(variant: &Variant, job: &ProwJob) -> Entry {
    let cells: BTreeMap<_, _> = variant
        .enabled_dimensions()
        .map(|dimension| (dimension, job_cell(job)))
        .collect();
    Entry {
        variant: variant.name.clone(),
        install_success: Cell::new(job.install_status_url.clone(), job.install_status),
        cells,
    }
}

pub fn merge_entry(entry: &mut Entry, variant: &Variant, job: &ProwJob) {
    entry.install_success.latch(Cell::new(
        job.install_status_url.clone(),
        job.install_status,
    ));
    for dimension in variant.enabled_dimensions() {
        match entry.cells.get_mut(&dimension) {
            Some(cell) => {
                cell.latch(job_cell(job));
            }
            None => {
                entry.cells.insert(dimension, job_cell(job));
            }
        }
    }
}

fn job_cell(job: &ProwJob) -> Cell<JobResult> {
    Cell::new(Some(job.job_page_url.clone()), job.result.clone())
}
