//! Job records plus the URL indexes used to route fetch results back to them.
use crate::types::{InstallStatus, JobResult, ProwJob};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct JobStore {
    jobs: Vec<ProwJob>,
    by_page: HashMap<String, usize>,
    by_result: HashMap<String, Vec<usize>>,
    by_install_status: HashMap<String, Vec<usize>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job; a second job with the same page URL is ignored.
    /// Returns whether the job was new.
    pub fn insert(&mut self, job: ProwJob) -> bool {
        if self.by_page.contains_key(&job.job_page_url) {
            return false;
        }
        let index = self.jobs.len();
        self.by_page.insert(job.job_page_url.clone(), index);
        self.by_result
            .entry(job.result_url.clone())
            .or_default()
            .push(index);
        if let Some(url) = &job.install_status_url {
            self.by_install_status
                .entry(url.clone())
                .or_default()
                .push(index);
        }
        self.jobs.push(job);
        true
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    #[cfg(test)]
    pub fn jobs(&self) -> &[ProwJob] {
        &self.jobs
    }

    pub fn into_jobs(self) -> Vec<ProwJob> {
        self.jobs
    }

    #[cfg(test)]
    pub fn by_page_url(&self, url: &str) -> Option<&ProwJob> {
        self.by_page.get(url).map(|index| &self.jobs[*index])
    }

    pub fn page_urls(&self) -> Vec<String> {
        self.jobs.iter().map(|job| job.job_page_url.clone()).collect()
    }

    /// Distinct finished-result URLs in discovery order.
    pub fn result_urls(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.jobs
            .iter()
            .filter(|job| seen.insert(job.result_url.as_str()))
            .map(|job| job.result_url.clone())
            .collect()
    }

    /// Distinct install-status URLs in discovery order.
    pub fn install_status_urls(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.jobs
            .iter()
            .filter_map(|job| job.install_status_url.as_deref())
            .filter(|url| seen.insert(*url))
            .map(str::to_string)
            .collect()
    }

    /// Attach an install-status URL to the job with this page URL.
    pub fn set_install_status_url(&mut self, page_url: &str, status_url: String) -> bool {
        let Some(&index) = self.by_page.get(page_url) else {
            return false;
        };
        let job = &mut self.jobs[index];
        if let Some(previous) = job.install_status_url.take() {
            if let Some(indexes) = self.by_install_status.get_mut(&previous) {
                indexes.retain(|candidate| *candidate != index);
            }
        }
        self.by_install_status
            .entry(status_url.clone())
            .or_default()
            .push(index);
        job.install_status_url = Some(status_url);
        true
    }

    /// Set the result on every job sharing this finished-result URL.
    /// Returns how many jobs were updated.
    pub fn set_result(&mut self, result_url: &str, result: &JobResult) -> usize {
        let Some(indexes) = self.by_result.get(result_url) else {
            return 0;
        };
        for index in indexes {
            self.jobs[*index].result = result.clone();
        }
        indexes.len()
    }

    /// Set the install status on every job sharing this status URL.
    pub fn set_install_status(&mut self, status_url: &str, status: InstallStatus) -> usize {
        let Some(indexes) = self.by_install_status.get(status_url) else {
            return 0;
        };
        for index in indexes {
            self.jobs[*index].install_status = status;
        }
        indexes.len()
    }
}
