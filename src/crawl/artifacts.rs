//! Install-status discovery from job dashboard pages.
//!
//! The dashboard embeds its artifact manifest as a script-local
//! `var lensArtifacts = {...};` assignment mapping lens indexes to artifact
//! paths. [`extract_lens_artifacts`] is the only code that knows this shape.
use super::store::JobStore;
use crate::error::CrawlError;
use crate::fetch::{fetch_all, Fetch};
use crate::urls;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Lens artifacts keyed by lens index.
pub type LensArtifacts = BTreeMap<String, Vec<String>>;

pub const INSTALL_LENS: &str = "0";
pub const INSTALLER_RESULT_SUFFIX: &str = "gather-must-gather/finished.json";
const INSTALLER_RESULT_FILE: &str = "finished.json";
const INSTALL_STATUS_FILE: &str = "artifacts/install-status.txt";

fn lens_assignment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bvar\s+lensArtifacts\s*=\s*").expect("lens regex"))
}

/// Pull the lens manifest out of a dashboard page.
///
/// `Ok(None)` means the page has no manifest; a manifest that is present but
/// not valid JSON is a parse error.
pub fn extract_lens_artifacts(
    url: &str,
    html: &str,
) -> Result<Option<LensArtifacts>, CrawlError> {
    let Some(found) = lens_assignment_regex().find(html) else {
        return Ok(None);
    };
    let rest = &html[found.end()..];
    // Parse exactly one value; whatever follows the object is ignored.
    let mut de = serde_json::Deserializer::from_str(rest);
    LensArtifacts::deserialize(&mut de)
        .map(Some)
        .map_err(|err| CrawlError::parse("lens artifacts", url, err))
}

/// Relative path of the install-status artifact, if the installer lens
/// lists the installer's result file.
pub fn install_status_path(manifest: &LensArtifacts) -> Option<String> {
    let paths = manifest.get(INSTALL_LENS)?;
    let installer = paths
        .iter()
        .find(|path| path.ends_with(INSTALLER_RESULT_SUFFIX))?;
    let dir = installer.strip_suffix(INSTALLER_RESULT_FILE)?;
    Some(format!("{dir}{INSTALL_STATUS_FILE}"))
}

/// Resolve the install-status URL for one dashboard page.
pub fn resolve_install_status_url(
    page_url: &str,
    html: &str,
) -> Result<Option<String>, CrawlError> {
    let Some(manifest) = extract_lens_artifacts(page_url, html)? else {
        return Ok(None);
    };
    let Some(path) = install_status_path(&manifest) else {
        return Ok(None);
    };
    let base = urls::rewrite_to_artifacts(page_url)?;
    urls::join_path(&base, &path).map(Some)
}

/// Fetch every job's dashboard page and attach install-status URLs.
/// Returns how many jobs gained one.
pub fn resolve_install_status_urls<F: Fetch + ?Sized>(
    fetcher: &F,
    store: &mut JobStore,
    workers: usize,
) -> usize {
    let mut resolved = 0;
    for fetched in fetch_all(fetcher, &store.page_urls(), workers) {
        let html = match fetched.body {
            Ok(html) => html,
            Err(err) => {
                tracing::warn!(error = %err, "job page unavailable; install status stays unknown");
                continue;
            }
        };
        match resolve_install_status_url(&fetched.url, &html) {
            Ok(Some(status_url)) => {
                if store.set_install_status_url(&fetched.url, status_url) {
                    resolved += 1;
                }
            }
            Ok(None) => tracing::debug!(url = %fetched.url, "no installer artifacts"),
            Err(err) => {
                tracing::warn!(error = %err, "job page unreadable; install status stays unknown");
            }
        }
    }
    resolved
}
