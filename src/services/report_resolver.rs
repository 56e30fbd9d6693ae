//! Report Retrieval Resolver
//!
//! Finds the newest rendered file for a request by rebuilding the worker's
//! file name pattern. "Not found" covers both a report that is still being
//! generated and one that was never requested (or whose render failed);
//! the two cannot be told apart from the directory alone.

use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::models::report::ReportRequest;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("report is not ready yet")]
    NotFound,

    #[error("failed to read reports directory: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReport {
    pub path: PathBuf,
    pub file_name: String,
}

#[derive(Debug, Clone)]
pub struct ReportResolver {
    reports_dir: PathBuf,
}

impl ReportResolver {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    /// Lexically last match wins; the timestamp suffix makes that the newest render
    pub async fn resolve(&self, request: &ReportRequest) -> Result<ResolvedReport, ResolveError> {
        let mut entries = match tokio::fs::read_dir(&self.reports_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(ResolveError::NotFound),
            Err(e) => return Err(e.into()),
        };

        let mut latest: Option<String> = None;
        let mut matches = 0usize;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };

            if !request.matches_file_name(name) {
                continue;
            }

            matches += 1;
            if latest.as_deref().is_none_or(|current| name > current) {
                latest = Some(name.to_string());
            }
        }

        let file_name = latest.ok_or(ResolveError::NotFound)?;
        debug!(file_name = %file_name, matches, "Resolved report file");

        Ok(ResolvedReport {
            path: self.reports_dir.join(&file_name),
            file_name,
        })
    }
}
