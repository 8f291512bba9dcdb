//! Error taxonomy for the crawl.
//!
//! Only the comment fetch and the final empty-matrix check are fatal; every
//! other variant is scoped to the record that produced it and is logged by
//! the stage that detected it.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlError {
    /// Malformed user input, reported before any network activity.
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// Network or HTTP failure (including timeouts).
    #[error("fetch {url} failed: {detail}")]
    Fetch { url: String, detail: String },

    /// URL outside the crawl's host allow-list; refused without any I/O.
    #[error("host not allowed for {url}")]
    HostNotAllowed { url: String },

    /// Malformed JSON, HTML or script payload.
    #[error("parse {what} from {url}: {detail}")]
    Parse {
        what: &'static str,
        url: String,
        detail: String,
    },

    /// Job name missing from the variant registry.
    #[error("job {job:?} does not have a known variant")]
    UnknownVariant { job: String },

    /// Nothing to report.
    #[error("no results to report: {0}")]
    EmptyResult(&'static str),
}

impl CrawlError {
    pub fn fetch(url: &str, detail: impl ToString) -> Self {
        CrawlError::Fetch {
            url: url.to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn parse(what: &'static str, url: &str, detail: impl ToString) -> Self {
        CrawlError::Parse {
            what,
            url: url.to_string(),
            detail: detail.to_string(),
        }
    }
}
