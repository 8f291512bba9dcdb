//! Final results and install statuses, written back onto jobs by URL.
use super::store::JobStore;
use crate::error::CrawlError;
use crate::fetch::{fetch_all, Fetch};
use crate::types::{InstallStatus, JobResult};
use crate::util::truncate_string;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Finished {
    result: Option<String>,
}

/// Read the `result` field of a `finished.json` body.
pub fn parse_finished(url: &str, body: &str) -> Result<JobResult, CrawlError> {
    let finished: Finished =
        serde_json::from_str(body).map_err(|err| CrawlError::parse("finished.json", url, err))?;
    let label = finished
        .result
        .ok_or_else(|| CrawlError::parse("finished.json", url, "missing result field"))?;
    Ok(JobResult::from_label(&label))
}

/// Fetch every finished-result artifact and record each job's result.
/// Unreadable artifacts leave the affected jobs unknown.
pub fn correlate_results<F: Fetch + ?Sized>(fetcher: &F, store: &mut JobStore, workers: usize) {
    for fetched in fetch_all(fetcher, &store.result_urls(), workers) {
        let result = match fetched.body.and_then(|body| parse_finished(&fetched.url, &body)) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(error = %err, "job result stays unknown");
                JobResult::Unknown
            }
        };
        let updated = store.set_result(&fetched.url, &result);
        tracing::debug!(url = %fetched.url, %result, updated, "result recorded");
    }
}

/// Fetch every install-status artifact and record each job's status.
pub fn correlate_install_statuses<F: Fetch + ?Sized>(
    fetcher: &F,
    store: &mut JobStore,
    workers: usize,
) {
    for fetched in fetch_all(fetcher, &store.install_status_urls(), workers) {
        let status = match fetched.body {
            Ok(body) => {
                let status = InstallStatus::from_status_text(&body);
                if status == InstallStatus::Unknown {
                    tracing::debug!(
                        url = %fetched.url,
                        body = %truncate_string(body.trim(), 64),
                        "install status is not an exit code"
                    );
                }
                status
            }
            Err(err) => {
                tracing::warn!(error = %err, "install status stays unknown");
                InstallStatus::Unknown
            }
        };
        let updated = store.set_install_status(&fetched.url, status);
        tracing::debug!(url = %fetched.url, %status, updated, "install status recorded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::MemoryFetcher;
    use crate::types::ProwJob;

    const FINISHED_JSON: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/finished.json"
    ));

    #[test]
    fn parses_and_lowercases_result() {
        assert_eq!(
            parse_finished("u", FINISHED_JSON).expect("parse"),
            JobResult::Success
        );
        assert_eq!(
            parse_finished("u", r#"{"result":"ABORTED"}"#).expect("parse"),
            JobResult::Other("aborted".to_string())
        );
    }

    #[test]
    fn malformed_or_incomplete_artifacts_are_parse_errors() {
        assert!(matches!(
            parse_finished("u", "<html>404</html>"),
            Err(CrawlError::Parse { .. })
        ));
        assert!(matches!(
            parse_finished("u", r#"{"passed":false}"#),
            Err(CrawlError::Parse { .. })
        ));
        assert!(matches!(
            parse_finished("u", r#"{"result":42}"#),
            Err(CrawlError::Parse { .. })
        ));
    }

    #[test]
    fn one_bad_artifact_does_not_stop_the_others() {
        let mut store = JobStore::new();
        store.insert(ProwJob::new("a".into(), "https://p/a".into(), "https://r/a".into()));
        store.insert(ProwJob::new("b".into(), "https://p/b".into(), "https://r/b".into()));
        store.insert(ProwJob::new("c".into(), "https://p/c".into(), "https://r/c".into()));
        let fetcher = MemoryFetcher::default()
            .page("https://r/a", "{broken")
            .page("https://r/b", r#"{"result":"FAILURE"}"#)
            .failing("https://r/c", "timed out");

        correlate_results(&fetcher, &mut store, 2);
        let results: Vec<_> = store.jobs().iter().map(|job| job.result.clone()).collect();
        assert_eq!(
            results,
            vec![JobResult::Unknown, JobResult::Failure, JobResult::Unknown]
        );
    }

    #[test]
    fn install_statuses_follow_the_status_file() {
        let mut store = JobStore::new();
        for name in ["a", "b", "c", "d"] {
            store.insert(ProwJob::new(
                name.into(),
                format!("https://p/{name}"),
                format!("https://r/{name}"),
            ));
            store.set_install_status_url(&format!("https://p/{name}"), format!("https://s/{name}"));
        }
        store.insert(ProwJob::new("e".into(), "https://p/e".into(), "https://r/e".into()));
        let fetcher = MemoryFetcher::default()
            .page("https://s/a", "0\n")
            .page("https://s/b", "137")
            .page("https://s/c", "")
            .failing("https://s/d", "timed out");

        correlate_install_statuses(&fetcher, &mut store, 4);
        let statuses: Vec<_> = store.jobs().iter().map(|job| job.install_status).collect();
        assert_eq!(
            statuses,
            vec![
                InstallStatus::Success,
                InstallStatus::Failure,
                InstallStatus::Unknown,
                InstallStatus::Unknown,
                InstallStatus::Unknown,
            ]
        );
        assert_eq!(fetcher.requests.lock().expect("requests").len(), 4);
    }
}
