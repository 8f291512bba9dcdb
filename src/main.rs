use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod cli;
mod crawl;
mod error;
mod fetch;
mod matrix;
mod registry;
mod report;
mod templates;
mod types;
mod urls;
mod util;

use cli::{ReportFormat, RootArgs};
use error::CrawlError;
use fetch::{CachedFetcher, Fetch, HttpFetcher};

const TOKEN_ENV: &str = "GITHUB_TOKEN";

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);
    run(args)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: RootArgs) -> Result<()> {
    let registry = registry::load(args.variants.as_deref(), args.release.as_deref())?;

    let http = HttpFetcher::new(
        Duration::from_secs(args.timeout_secs),
        std::env::var(TOKEN_ENV).ok(),
    );
    let fetcher: Box<dyn Fetch> = match &args.cache_dir {
        Some(dir) => Box::new(CachedFetcher::new(http, dir.clone())?),
        None => Box::new(http),
    };

    let jobs = crawl::run(fetcher.as_ref(), &args.pr, usize::from(args.jobs))
        .with_context(|| format!("crawl {}", args.pr))?;

    let aggregation = matrix::aggregate(&jobs, &registry);
    if !aggregation.unknown_jobs.is_empty() {
        tracing::warn!(
            skipped = aggregation.unknown_jobs.len(),
            "jobs without a known variant were left out of the report"
        );
    }
    if aggregation.matrix.is_empty() {
        return Err(CrawlError::EmptyResult("no job matched a known variant").into());
    }

    let context = report::ReportContext::new(&args.pr);
    let contents = match args.format {
        ReportFormat::Html => report::render_html(&context, &aggregation.matrix),
        ReportFormat::Json => report::render_json(&context, &aggregation.matrix)?,
    };
    report::write_report(&args.out, &contents)?;

    tracing::info!(
        variants = aggregation.matrix.len(),
        jobs = jobs.len(),
        path = %args.out.display(),
        "report written"
    );
    Ok(())
}
