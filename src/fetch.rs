//! Read-only GET access for the crawl.
//!
//! Stages talk to the network through [`Fetch`] so extraction and
//! correlation can be exercised against in-memory pages. [`fetch_all`] is the
//! only place that runs requests in parallel; it hands results back to the
//! calling stage, which stays the single writer of the job store.
use crate::error::CrawlError;
use crate::urls;
use crate::util::sha256_hex;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use ureq::ResponseExt;

const USER_AGENT: &str = concat!("payload-matrix/", env!("CARGO_PKG_VERSION"));

/// A blocking GET that returns the response body as text.
pub trait Fetch: Sync {
    fn get(&self, url: &str) -> Result<String, CrawlError>;
}

/// Network fetcher restricted to the crawl's host allow-list.
pub struct HttpFetcher {
    agent: ureq::Agent,
    token: Option<String>,
}

impl HttpFetcher {
    /// `token` is only ever sent to the review API host.
    pub fn new(timeout: Duration, token: Option<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            token: token.filter(|value| !value.trim().is_empty()),
        }
    }
}

impl Fetch for HttpFetcher {
    fn get(&self, url: &str) -> Result<String, CrawlError> {
        ensure_allowed(url)?;

        tracing::debug!(url, "visiting");
        let start = Instant::now();
        let mut request = self.agent.get(url).header("User-Agent", USER_AGENT);
        if let Some(token) = &self.token {
            if urls::host_of(url).as_deref() == Some(urls::REVIEW_API_HOST) {
                request = request
                    .header("Authorization", format!("Bearer {token}"))
                    .header("Accept", "application/vnd.github+json");
            }
        }
        let mut response = request.call().map_err(|err| CrawlError::fetch(url, err))?;
        // Redirects are followed by the agent; the final hop must stay on the list too.
        let landed = response.get_uri().to_string();
        if landed != url {
            tracing::debug!(url, landed = %landed, "redirected");
            ensure_allowed(&landed)?;
        }
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|err| CrawlError::fetch(url, err))?;

        tracing::debug!(
            url,
            elapsed_ms = start.elapsed().as_millis() as u64,
            response_bytes = body.len(),
            "fetch complete"
        );
        Ok(body)
    }
}

fn ensure_allowed(url: &str) -> Result<(), CrawlError> {
    if urls::is_allowed(url) {
        Ok(())
    } else {
        Err(CrawlError::HostNotAllowed {
            url: url.to_string(),
        })
    }
}

/// On-disk response cache keyed by request URL.
///
/// Only artifact files are cached; review comments and dashboard pages change
/// while a payload run progresses and are always fetched live. Only
/// successful bodies are stored. Cache I/O failures never fail a fetch.
pub struct CachedFetcher<F> {
    inner: F,
    dir: PathBuf,
}

impl<F: Fetch> CachedFetcher<F> {
    pub fn new(inner: F, dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create cache dir {}", dir.display()))?;
        Ok(Self { inner, dir })
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        self.dir.join(sha256_hex(url.as_bytes()))
    }
}

/// Whether a response for `url` may be served from the cache.
pub fn is_cacheable(url: &str) -> bool {
    urls::host_of(url).as_deref() == Some(urls::ARTIFACTS_HOST)
}

impl<F: Fetch> Fetch for CachedFetcher<F> {
    fn get(&self, url: &str) -> Result<String, CrawlError> {
        if !is_cacheable(url) {
            return self.inner.get(url);
        }
        let path = self.entry_path(url);
        if let Ok(body) = std::fs::read_to_string(&path) {
            tracing::debug!(url, "cache hit");
            return Ok(body);
        }
        let body = self.inner.get(url)?;
        if let Err(err) = std::fs::write(&path, body.as_bytes()) {
            tracing::warn!(url, path = %path.display(), error = %err, "cache write failed");
        }
        Ok(body)
    }
}

/// Outcome of one fetch inside a stage.
#[derive(Debug)]
pub struct Fetched {
    pub url: String,
    pub body: Result<String, CrawlError>,
}

/// Fetch every URL with up to `workers` threads. Results come back in the
/// order of `urls`; the call returns only once all of them are done.
pub fn fetch_all<F: Fetch + ?Sized>(
    fetcher: &F,
    urls: &[String],
    workers: usize,
) -> Vec<Fetched> {
    let total = urls.len();
    if total == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, total);
    let next_index = AtomicUsize::new(0);
    let mut ordered: Vec<Option<Result<String, CrawlError>>> =
        (0..total).map(|_| None).collect();

    let (tx, rx) = mpsc::channel::<(usize, Result<String, CrawlError>)>();
    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let next_index = &next_index;
            scope.spawn(move || loop {
                let index = next_index.fetch_add(1, Ordering::Relaxed);
                if index >= total {
                    break;
                }
                let body = fetcher.get(&urls[index]);
                if tx.send((index, body)).is_err() {
                    break;
                }
            });
        }
        drop(tx);
        for (index, body) in rx {
            ordered[index] = Some(body);
        }
    });

    let mut fetched = Vec::with_capacity(total);
    for (url, body) in urls.iter().zip(ordered) {
        let body =
            body.unwrap_or_else(|| Err(CrawlError::fetch(url, "fetch worker exited early")));
        fetched.push(Fetched {
            url: url.clone(),
            body,
        });
    }
    fetched
}
