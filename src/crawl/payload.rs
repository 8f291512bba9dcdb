//! Job records from payload-run pages.
//!
//! A payload-run page lists one `<li>` per job; inside it a `<tt>` holds the
//! job name in a `<span>` and a link to the job dashboard in an `<a>`.
//! Extraction scans within those blocks only and ignores the rest of the page.
use super::store::JobStore;
use crate::error::CrawlError;
use crate::fetch::{fetch_all, Fetch};
use crate::types::ProwJob;
use crate::urls;
use crate::util::unescape_html;
use regex::Regex;
use std::sync::OnceLock;

pub const FINISHED_FILE: &str = "finished.json";

/// One job line as it appears on the page, before any URL derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEntry {
    pub name: String,
    pub href: String,
}

fn list_item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<li\b[^>]*>(.*?)</li>").expect("list item regex"))
}

fn teletype_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<tt\b[^>]*>(.*?)</tt>").expect("tt regex"))
}

fn span_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<span\b[^>]*>(.*?)</span>").expect("span regex"))
}

fn href_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']*)["']"#).expect("href regex")
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex"))
}

fn inner_text(fragment: &str) -> String {
    let stripped = tag_regex().replace_all(fragment, "");
    unescape_html(stripped.trim())
}

/// Every `(name, link)` pair found in list items of a payload-run page.
pub fn extract_entries(html: &str) -> Vec<PayloadEntry> {
    let mut entries = Vec::new();
    for item in list_item_regex().captures_iter(html) {
        for tt in teletype_regex().captures_iter(&item[1]) {
            let block = &tt[1];
            let name = span_regex()
                .captures(block)
                .map(|span| inner_text(&span[1]))
                .unwrap_or_default();
            let href = href_regex()
                .captures(block)
                .map(|link| unescape_html(link[1].trim()))
                .unwrap_or_default();
            entries.push(PayloadEntry { name, href });
        }
    }
    entries
}

/// Derive the `finished.json` URL for a job-dashboard link.
pub fn finished_url(job_page_url: &str) -> Result<String, CrawlError> {
    let base = urls::rewrite_to_artifacts(job_page_url)?;
    urls::join_path(&base, FINISHED_FILE)
}

/// Turn a page into job records. Entries linking anywhere but the job
/// dashboard are skipped; entries whose URLs cannot be derived are dropped
/// with a warning and do not affect the rest of the page.
pub fn parse_payload_run(page_url: &str, html: &str) -> Vec<ProwJob> {
    let mut jobs = Vec::new();
    for entry in extract_entries(html) {
        if !entry.href.starts_with(urls::JOB_DASHBOARD_PREFIX) {
            tracing::debug!(page_url, href = %entry.href, "skipping non-job link");
            continue;
        }
        if entry.name.is_empty() {
            let detail = format!("no name for {}", entry.href);
            let err = CrawlError::parse("job name", page_url, detail);
            tracing::warn!(error = %err, "dropping payload entry");
            continue;
        }
        match finished_url(&entry.href) {
            Ok(result_url) => jobs.push(ProwJob::new(entry.name, entry.href, result_url)),
            Err(err) => {
                tracing::warn!(page_url, job = %entry.name, error = %err, "dropping payload entry");
            }
        }
    }
    jobs
}

/// Fetch every payload-run page and record the jobs it lists.
pub fn collect_jobs<F: Fetch + ?Sized>(
    fetcher: &F,
    run_urls: &[String],
    workers: usize,
    store: &mut JobStore,
) {
    for fetched in fetch_all(fetcher, run_urls, workers) {
        let html = match fetched.body {
            Ok(html) => html,
            Err(err) => {
                tracing::warn!(error = %err, "skipping payload run");
                continue;
            }
        };
        let jobs = parse_payload_run(&fetched.url, &html);
        let listed = jobs.len();
        let added = jobs
            .into_iter()
            .map(|job| store.insert(job))
            .filter(|inserted| *inserted)
            .count();
        tracing::debug!(url = %fetched.url, listed, added, "payload run parsed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::MemoryFetcher;

    const PAYLOAD_RUN_HTML: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/payload_run.html"
    ));

    #[test]
    fn extracts_every_tt_entry() {
        let entries = extract_entries(PAYLOAD_RUN_HTML);
        assert_eq!(entries.len(), 4);
        assert_eq!(
            entries[0].name,
            "periodic-ci-openshift-release-master-nightly-4.15-e2e-aws-ovn-serial"
        );
        assert!(entries[2].href.starts_with("https://testgrid.k8s.io/"));
    }

    #[test]
    fn keeps_only_dashboard_view_links() {
        let jobs = parse_payload_run(
            "https://pr-payload-tests.ci.openshift.org/runs/ci/x",
            PAYLOAD_RUN_HTML,
        );
        assert_eq!(jobs.len(), 2);

        assert_eq!(
            jobs[0].job_page_url,
            "https://prow.ci.openshift.org/view/gs/test-platform-results/logs/openshift-installer-7001-ci-4.15-e2e-aws-ovn-serial/1708000000000000001"
        );
        assert_eq!(
            jobs[0].result_url,
            "https://gcsweb-ci.apps.ci.l2s4.p1.openshiftapps.com/gcs/test-platform-results/logs/openshift-installer-7001-ci-4.15-e2e-aws-ovn-serial/1708000000000000001/finished.json"
        );
        // trailing slash on the link must not produce a doubled separator
        assert_eq!(
            jobs[1].result_url,
            "https://gcsweb-ci.apps.ci.l2s4.p1.openshiftapps.com/gcs/test-platform-results/logs/openshift-installer-7001-ci-4.15-e2e-gcp-ovn/1708000000000000002/finished.json"
        );
        assert_eq!(jobs[1].name, "periodic-ci-openshift-release-master-nightly-4.15-e2e-gcp-ovn");
    }

    #[test]
    fn malformed_entry_is_dropped_without_losing_the_page() {
        let html = r#"<ul>
            <li><tt><span>job-bad</span> <a href="https://prow.ci.openshift.org/view/gs/a b">x</a></tt></li>
            <li><tt><span>job-empty</span> <a href="https://prow.ci.openshift.org/view/gs/">x</a></tt></li>
            <li><tt><span></span> <a href="https://prow.ci.openshift.org/view/gs/logs/nameless/1">x</a></tt></li>
            <li><tt><span>job-good</span> <a href="https://prow.ci.openshift.org/view/gs/logs/job-good/2">x</a></tt></li>
        </ul>"#;
        let jobs = parse_payload_run("https://pr-payload-tests.ci.openshift.org/runs/ci/y", html);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "job-good");
    }

    #[test]
    fn entity_encoded_names_and_links_are_decoded() {
        let html = r#"<li><tt><span><b>job&amp;co</b></span><a href="https://prow.ci.openshift.org/view/gs/logs/j/1?a=1&amp;b=2">x</a></tt></li>"#;
        let entries = extract_entries(html);
        assert_eq!(entries[0].name, "job&co");
        assert_eq!(entries[0].href, "https://prow.ci.openshift.org/view/gs/logs/j/1?a=1&b=2");
    }

    #[test]
    fn collect_jobs_skips_failed_pages_and_dedupes_jobs() {
        let run_a = "https://pr-payload-tests.ci.openshift.org/runs/ci/a".to_string();
        let run_b = "https://pr-payload-tests.ci.openshift.org/runs/ci/b".to_string();
        let run_c = "https://pr-payload-tests.ci.openshift.org/runs/ci/c".to_string();
        let fetcher = MemoryFetcher::default()
            .page(&run_a, PAYLOAD_RUN_HTML)
            .page(&run_b, PAYLOAD_RUN_HTML)
            .failing(&run_c, "connection reset");

        let mut store = JobStore::new();
        collect_jobs(&fetcher, &[run_a, run_b, run_c], 2, &mut store);
        assert_eq!(store.len(), 2);
    }
}
