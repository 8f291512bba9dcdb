//! Payload-run discovery from pull request comments.
//!
//! Links are found by pattern search over each comment body rather than by
//! parsing the markdown, so bots that wrap the link in prose or tables are
//! handled the same way.
use crate::error::CrawlError;
use crate::fetch::Fetch;
use crate::urls;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::OnceLock;

pub const COMMENTS_PER_PAGE: usize = 100;
pub const MAX_COMMENT_PAGES: usize = 30;

#[derive(Debug, Deserialize)]
struct Comment {
    #[serde(default)]
    body: Option<String>,
}

fn payload_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"https://pr-payload-tests\.ci\.openshift\.org/runs/ci/[^\s<>()\[\]"'`]+"#)
            .expect("payload run regex")
    })
}

/// All payload-run links in one comment body, in order of appearance.
pub fn extract_payload_links(body: &str) -> Vec<String> {
    payload_run_regex()
        .find_iter(body)
        .map(|found| {
            found
                .as_str()
                .trim_end_matches(['.', ',', ';', ':', '!', '?'])
                .to_string()
        })
        .filter(|link| link.len() > urls::PAYLOAD_RUN_PREFIX.len())
        .collect()
}

/// Parse one page of the issue-comments API. Returns the number of comments
/// on the page and adds every payload-run link to `links`.
pub fn collect_links_from_page(
    url: &str,
    body: &str,
    links: &mut BTreeSet<String>,
) -> Result<usize, CrawlError> {
    let comments: Vec<Comment> =
        serde_json::from_str(body).map_err(|err| CrawlError::parse("comments", url, err))?;
    for comment in &comments {
        if let Some(text) = comment.body.as_deref() {
            links.extend(extract_payload_links(text));
        }
    }
    Ok(comments.len())
}

/// Walk every comment page of a pull request and return the distinct
/// payload-run links. Any failure here is fatal for the run.
pub fn discover_payload_runs<F: Fetch + ?Sized>(
    fetcher: &F,
    org: &str,
    repo: &str,
    pr: u64,
) -> Result<BTreeSet<String>, CrawlError> {
    let mut links = BTreeSet::new();
    for page in 1..=MAX_COMMENT_PAGES {
        let url = urls::comments_url(org, repo, pr, COMMENTS_PER_PAGE, page);
        let body = fetcher.get(&url)?;
        let count = collect_links_from_page(&url, &body, &mut links)?;
        tracing::debug!(page, comments = count, links = links.len(), "comment page parsed");
        if count < COMMENTS_PER_PAGE {
            return Ok(links);
        }
    }
    tracing::warn!(
        max_pages = MAX_COMMENT_PAGES,
        "comment pagination limit reached; later comments were not scanned"
    );
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::MemoryFetcher;

    const RUN_A: &str = "https://pr-payload-tests.ci.openshift.org/runs/ci/aaaa-0";
    const RUN_B: &str = "https://pr-payload-tests.ci.openshift.org/runs/ci/bbbb-0";

    #[test]
    fn extracts_links_wrapped_in_markdown() {
        let body = format!(
            "@bot: trigger 2 jobs\nSee details on [{RUN_A}]({RUN_A}).\n<a href=\"{RUN_B}\">run</a>"
        );
        assert_eq!(
            extract_payload_links(&body),
            vec![RUN_A.to_string(), RUN_A.to_string(), RUN_B.to_string()]
        );
    }

    #[test]
    fn ignores_other_hosts_and_bare_prefix() {
        let body = "https://example.org/runs/ci/x https://pr-payload-tests.ci.openshift.org/runs/ci/ done";
        assert!(extract_payload_links(body).is_empty());
    }

    #[test]
    fn dedupes_links_across_comments() {
        let body = serde_json::json!([
            { "body": format!("first {RUN_A}") },
            { "body": format!("again {RUN_A} and {RUN_B}") },
            { "body": null },
            { "user": "no body field" }
        ])
        .to_string();
        let mut links = BTreeSet::new();
        let count = collect_links_from_page("https://api.github.com/x", &body, &mut links)
            .expect("parse comments");
        assert_eq!(count, 4);
        assert_eq!(
            links.into_iter().collect::<Vec<_>>(),
            vec![RUN_A.to_string(), RUN_B.to_string()]
        );
    }

    #[test]
    fn malformed_comment_payload_is_a_parse_error() {
        let mut links = BTreeSet::new();
        let err = collect_links_from_page("https://api.github.com/x", "{not json", &mut links)
            .expect_err("must fail");
        assert!(matches!(err, CrawlError::Parse { what: "comments", .. }));
    }

    #[test]
    fn follows_pagination_until_a_short_page() {
        let full_page: Vec<serde_json::Value> = (0..COMMENTS_PER_PAGE)
            .map(|i| serde_json::json!({ "body": format!("comment {i}") }))
            .collect();
        let mut full_page = full_page;
        full_page[0] = serde_json::json!({ "body": RUN_A });
        let last_page = serde_json::json!([{ "body": RUN_B }]);

        let fetcher = MemoryFetcher::default()
            .page(
                &urls::comments_url("org", "repo", 7, COMMENTS_PER_PAGE, 1),
                &serde_json::Value::Array(full_page).to_string(),
            )
            .page(
                &urls::comments_url("org", "repo", 7, COMMENTS_PER_PAGE, 2),
                &last_page.to_string(),
            );

        let links = discover_payload_runs(&fetcher, "org", "repo", 7).expect("discover");
        assert_eq!(links.len(), 2);
        assert_eq!(fetcher.requests.lock().expect("requests").len(), 2);
    }

    #[test]
    fn comment_fetch_failure_is_fatal() {
        let fetcher = MemoryFetcher::default();
        let err = discover_payload_runs(&fetcher, "org", "repo", 7).expect_err("must fail");
        assert!(matches!(err, CrawlError::Fetch { .. }));
    }
}
