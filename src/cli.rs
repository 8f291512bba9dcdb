//! CLI argument parsing.
//!
//! Everything here is validated before the crawl touches the network.
use crate::error::CrawlError;
use clap::{Parser, ValueEnum};
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

pub const DEFAULT_REPORT_PATH: &str = "report.html";

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "payload-matrix",
    version,
    about = "Fold a pull request's payload runs into a per-variant pass/fail matrix",
    after_help = "Examples:\n  payload-matrix --pr openshift/installer#7001\n  payload-matrix --pr openshift/installer#7001 --release 4.15 --cache-dir /tmp/payload-cache\n  GITHUB_TOKEN=... payload-matrix --pr openshift/kubernetes#1800 --format json --out matrix.json"
)]
pub struct RootArgs {
    /// Pull request in the form org/repo#number
    #[arg(long, value_name = "ORG/REPO#N")]
    pub pr: PullRequestRef,

    /// Path of the rendered report
    #[arg(long, value_name = "PATH", default_value = DEFAULT_REPORT_PATH)]
    pub out: PathBuf,

    /// Release the variant registry entries must match (e.g. 4.15)
    #[arg(long, value_name = "VERSION")]
    pub release: Option<String>,

    /// Directory for the on-disk response cache
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Variant registry TSV replacing the built-in one
    #[arg(long, value_name = "PATH")]
    pub variants: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Html)]
    pub format: ReportFormat,

    /// Concurrent fetches per stage
    #[arg(
        long,
        value_name = "N",
        default_value_t = 8,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub jobs: u16,

    /// Per-request timeout in seconds
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,

    /// Log every request and extraction step
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Html,
    Json,
}

/// A pull request reference such as `openshift/installer#7001`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub org: String,
    pub repo: String,
    pub number: u64,
}

fn pr_ref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([\w.-]+)/([\w.-]+)#(\d+)$").expect("pr ref regex"))
}

impl FromStr for PullRequestRef {
    type Err = CrawlError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            CrawlError::InputValidation(format!(
                "expected 'org/repo#number', got {input:?}"
            ))
        };
        let captures = pr_ref_regex().captures(input.trim()).ok_or_else(invalid)?;
        let number: u64 = captures[3].parse().map_err(|_| invalid())?;
        if number == 0 {
            return Err(CrawlError::InputValidation(
                "pull request number must be positive".to_string(),
            ));
        }
        Ok(Self {
            org: captures[1].to_string(),
            repo: captures[2].to_string(),
            number,
        })
    }
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.org, self.repo, self.number)
    }
}
