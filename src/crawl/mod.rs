//! The crawl pipeline: comments → payload runs → jobs → artifacts → results.
//!
//! Each stage finishes all of its fetches before the next stage derives its
//! URL set from the job store. Only the comment fetch and an empty job set
//! end the run; every other failure stays with the job it belongs to.
pub mod artifacts;
pub mod comments;
pub mod payload;
pub mod results;
pub mod store;

use crate::cli::PullRequestRef;
use crate::error::CrawlError;
use crate::fetch::Fetch;
use crate::types::ProwJob;
use std::time::Instant;
use store::JobStore;

/// Crawl one pull request and return every job with its results filled in.
pub fn run<F: Fetch + ?Sized>(
    fetcher: &F,
    pr: &PullRequestRef,
    workers: usize,
) -> Result<Vec<ProwJob>, CrawlError> {
    let start = Instant::now();

    let run_urls: Vec<String> =
        comments::discover_payload_runs(fetcher, &pr.org, &pr.repo, pr.number)?
            .into_iter()
            .collect();
    tracing::info!(pr = %pr, payload_runs = run_urls.len(), "payload runs discovered");

    let mut store = JobStore::new();
    payload::collect_jobs(fetcher, &run_urls, workers, &mut store);
    tracing::info!(jobs = store.len(), "jobs discovered");
    if store.is_empty() {
        return Err(CrawlError::EmptyResult("no jobs discovered"));
    }

    let resolved = artifacts::resolve_install_status_urls(fetcher, &mut store, workers);
    tracing::info!(with_install_status = resolved, "job pages resolved");

    results::correlate_install_statuses(fetcher, &mut store, workers);
    results::correlate_results(fetcher, &mut store, workers);

    tracing::info!(
        jobs = store.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "crawl complete"
    );
    Ok(store.into_jobs())
}
