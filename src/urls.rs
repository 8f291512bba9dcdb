//! Hosts, prefixes and URL derivation shared by the crawl stages.
//!
//! Every derived URL in the crawl goes through [`rewrite_to_artifacts`] and
//! [`join_path`], so the join keys produced by one stage match exactly what
//! a later stage fetches.
use crate::error::CrawlError;
use url::Url;

pub const REVIEW_API_HOST: &str = "api.github.com";
pub const JOB_DASHBOARD_HOST: &str = "prow.ci.openshift.org";
pub const PAYLOAD_RUNS_HOST: &str = "pr-payload-tests.ci.openshift.org";
pub const ARTIFACTS_HOST: &str = "gcsweb-ci.apps.ci.l2s4.p1.openshiftapps.com";

/// The only hosts the crawl may contact.
pub const ALLOWED_HOSTS: [&str; 4] = [
    REVIEW_API_HOST,
    JOB_DASHBOARD_HOST,
    PAYLOAD_RUNS_HOST,
    ARTIFACTS_HOST,
];

pub const JOB_DASHBOARD_PREFIX: &str = "https://prow.ci.openshift.org/";
pub const JOB_VIEW_PREFIX: &str = "https://prow.ci.openshift.org/view/gs/";
pub const ARTIFACTS_PREFIX: &str = "https://gcsweb-ci.apps.ci.l2s4.p1.openshiftapps.com/gcs/";
pub const PAYLOAD_RUN_PREFIX: &str = "https://pr-payload-tests.ci.openshift.org/runs/ci/";

/// Issue-comments endpoint for one page of a pull request's comments.
pub fn comments_url(org: &str, repo: &str, pr: u64, per_page: usize, page: usize) -> String {
    format!(
        "https://{REVIEW_API_HOST}/repos/{org}/{repo}/issues/{pr}/comments?per_page={per_page}&page={page}"
    )
}

/// Human-facing pull request page, used only as a report link.
pub fn pull_request_url(org: &str, repo: &str, pr: u64) -> String {
    format!("https://github.com/{org}/{repo}/pull/{pr}")
}

/// Lowercased host of an absolute http(s) URL.
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    parsed.host_str().map(str::to_ascii_lowercase)
}

pub fn is_allowed(url: &str) -> bool {
    host_of(url).is_some_and(|host| ALLOWED_HOSTS.contains(&host.as_str()))
}

/// Rewrite a job-dashboard view URL to the artifact browser.
pub fn rewrite_to_artifacts(url: &str) -> Result<String, CrawlError> {
    match url.strip_prefix(JOB_VIEW_PREFIX) {
        Some(rest) if rest.chars().any(char::is_whitespace) => Err(CrawlError::parse(
            "artifact url",
            url,
            "contains whitespace",
        )),
        Some(rest) if !rest.trim_matches('/').is_empty() => {
            Ok(format!("{ARTIFACTS_PREFIX}{rest}"))
        }
        _ => Err(CrawlError::parse(
            "artifact url",
            url,
            "not a job dashboard view url",
        )),
    }
}

/// Append the `/`-separated `segment` to the path of `base`.
///
/// Empty components are dropped and `.`/`..` are resolved, so the result has
/// exactly one separator between components. Query and fragment of `base`
/// are preserved.
pub fn join_path(base: &str, segment: &str) -> Result<String, CrawlError> {
    let mut url = Url::parse(base).map_err(|err| CrawlError::parse("url", base, err))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CrawlError::parse("url", base, "unsupported scheme"));
    }
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|()| CrawlError::parse("url", base, "cannot be a base"))?;
        path.pop_if_empty();
        for part in segment.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    path.pop();
                }
                other => {
                    path.push(other);
                }
            }
        }
    }
    Ok(url.into())
}
