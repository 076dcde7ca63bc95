//! Batch orchestration.
//!
//! [`BatchOrchestrator::start_batch`] walks the selected files one at a time
//! in input order: fetch, analyze, record. A file's failure is written to its
//! own [`FileReport`] and never stops the batch. Progress is published as
//! [`BatchEvent`]s so a presentation layer can follow along without touching
//! the reports.

pub mod progress;

pub use progress::{BatchProgress, estimate_remaining, format_eta};

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::analyzer::Analyzer;
use crate::config::DEFAULT_ASSUMED_SECONDS_PER_FILE;
use crate::credentials::CredentialProvider;
use crate::errors::{Result, ReviewError};
use crate::findings::{FileReport, FileStatus, Finding, IssueDraft};
use crate::github::{CandidateFile, ForgeClient, IssueHandle, RepoContext};

const EMPTY_CONTENT: &str = "File content is empty or could not be fetched.";

/// Everything that only makes sense under a signed-in credential.
#[derive(Debug, Default)]
pub struct Session {
    credentials: Option<CredentialProvider>,
    repo: Option<RepoContext>,
    reports: Vec<FileReport>,
    progress: Option<BatchProgress>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: CredentialProvider) -> Self {
        Self {
            credentials: Some(credentials),
            ..Self::default()
        }
    }

    pub fn set_credentials(&mut self, credentials: CredentialProvider) {
        self.credentials = Some(credentials);
    }

    pub fn credentials(&self) -> Option<&CredentialProvider> {
        self.credentials.as_ref()
    }

    /// The token every forge call uses, if signed in.
    pub fn token(&self) -> Option<&str> {
        self.credentials.as_ref().and_then(|c| c.current_token())
    }

    /// Select a repository. Reports from a previous repository are dropped.
    pub fn set_repo(&mut self, repo: RepoContext) {
        if self.repo.as_ref() != Some(&repo) {
            self.reports.clear();
            self.progress = None;
        }
        self.repo = Some(repo);
    }

    pub fn repo(&self) -> Option<&RepoContext> {
        self.repo.as_ref()
    }

    /// Reports of the current (or last) batch, in input order.
    pub fn reports(&self) -> &[FileReport] {
        &self.reports
    }

    pub fn progress(&self) -> Option<&BatchProgress> {
        self.progress.as_ref()
    }

    /// All findings of the current batch, in report order.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.reports.iter().flat_map(|r| r.findings().iter())
    }

    /// Discard the credential and everything that depended on it.
    ///
    /// Returns the credential so the caller can revoke it.
    pub fn sign_out(&mut self) -> Option<CredentialProvider> {
        self.repo = None;
        self.reports.clear();
        self.progress = None;
        self.credentials.take()
    }
}

/// Published while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// Informational message that is not tied to a file.
    Notice(String),
    Started(BatchProgress),
    FileStarted {
        index: usize,
        path: String,
    },
    FileFinished {
        index: usize,
        report: FileReport,
        progress: BatchProgress,
    },
    Completed(BatchSummary),
}

/// Outcome counts of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub processed: usize,
    pub analyzed: usize,
    pub failed: usize,
    pub total_findings: usize,
    pub elapsed: Duration,
}

impl BatchSummary {
    fn from_reports(reports: &[FileReport], elapsed: Duration) -> Self {
        let count = |status| reports.iter().filter(|r| r.status() == status).count();
        Self {
            processed: reports.len(),
            analyzed: count(FileStatus::Analyzed),
            failed: count(FileStatus::Failed),
            total_findings: reports.iter().map(|r| r.findings().len()).sum(),
            elapsed,
        }
    }
}

/// Runs analysis batches against a forge and an analyzer.
pub struct BatchOrchestrator<F, A> {
    forge: F,
    analyzer: A,
    assumed_secs_per_file: u64,
    events: Option<UnboundedSender<BatchEvent>>,
}

impl<F: ForgeClient, A: Analyzer> BatchOrchestrator<F, A> {
    pub fn new(forge: F, analyzer: A) -> Self {
        Self {
            forge,
            analyzer,
            assumed_secs_per_file: DEFAULT_ASSUMED_SECONDS_PER_FILE,
            events: None,
        }
    }

    /// Per-file duration assumed for the estimate before any file completes.
    pub fn with_assumed_seconds_per_file(mut self, secs: u64) -> Self {
        self.assumed_secs_per_file = secs;
        self
    }

    /// Publish [`BatchEvent`]s to `tx`.
    pub fn with_events(mut self, tx: UnboundedSender<BatchEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn forge(&self) -> &F {
        &self.forge
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody is watching.
            let _ = tx.send(event);
        }
    }

    /// Analyze `files` serially, in order, recording one report per file in
    /// `session`.
    ///
    /// `shared_context` lists every selected path; it is handed to the
    /// analyzer only when the batch has more than one file. An empty `files`
    /// is a no-op that emits a [`BatchEvent::Notice`].
    pub async fn start_batch(
        &self,
        session: &mut Session,
        files: &[CandidateFile],
        shared_context: &[String],
    ) -> Result<BatchSummary> {
        let token = session
            .token()
            .ok_or_else(|| {
                ReviewError::Auth("Not signed in. Provide a GitHub token or log in.".to_string())
            })?
            .to_string();
        let repo = session
            .repo()
            .cloned()
            .ok_or_else(|| ReviewError::Validation("No repository selected.".to_string()))?;
        self.analyzer.ensure_ready()?;

        if files.is_empty() {
            self.emit(BatchEvent::Notice(
                "No files selected for analysis.".to_string(),
            ));
            return Ok(BatchSummary::default());
        }
        // Reports are keyed by path.
        let mut seen = HashSet::with_capacity(files.len());
        if let Some(dup) = files.iter().find(|f| !seen.insert(f.path.as_str())) {
            return Err(ReviewError::Validation(format!(
                "Duplicate file in batch: {}",
                dup.path
            )));
        }

        let started = Instant::now();
        session.reports = files.iter().map(|f| FileReport::pending(&f.path)).collect();
        let mut progress = BatchProgress::start(files.len(), self.assumed_secs_per_file);
        session.progress = Some(progress.clone());

        info!(repo = %repo, files = files.len(), "starting analysis batch");
        self.emit(BatchEvent::Started(progress.clone()));

        let siblings = (files.len() > 1).then_some(shared_context);

        for (index, file) in files.iter().enumerate() {
            session.reports[index].mark_analyzing()?;
            self.emit(BatchEvent::FileStarted {
                index,
                path: file.path.clone(),
            });

            self.process_file(&mut session.reports[index], &repo, &token, siblings)
                .await?;

            progress.record_completion(self.assumed_secs_per_file);
            session.progress = Some(progress.clone());
            self.emit(BatchEvent::FileFinished {
                index,
                report: session.reports[index].clone(),
                progress: progress.clone(),
            });
        }

        let summary = BatchSummary::from_reports(&session.reports, started.elapsed());
        info!(
            analyzed = summary.analyzed,
            failed = summary.failed,
            findings = summary.total_findings,
            "analysis batch complete"
        );
        self.emit(BatchEvent::Completed(summary.clone()));
        Ok(summary)
    }

    /// Fetch and analyze one file, leaving `report` in a terminal state.
    ///
    /// Only an illegal status transition escapes as an error.
    async fn process_file(
        &self,
        report: &mut FileReport,
        repo: &RepoContext,
        token: &str,
        siblings: Option<&[String]>,
    ) -> Result<()> {
        let path = report.file_path().to_string();

        let content = match self
            .forge
            .fetch_content(repo, &path, token, Some(&repo.branch))
            .await
        {
            Ok(content) if content.trim().is_empty() => {
                warn!(file = %path, "empty file content");
                return report.mark_failed(EMPTY_CONTENT, Vec::new());
            }
            Ok(content) => content,
            Err(e) => {
                warn!(file = %path, error = %e, "failed to fetch file");
                return report.mark_failed(e.to_string(), Vec::new());
            }
        };

        match self.analyzer.analyze(&content, &path, siblings).await {
            Ok(findings) => {
                debug!(file = %path, findings = findings.len(), "file analyzed");
                report.mark_analyzed(findings)
            }
            Err(e) => {
                warn!(file = %path, error = %e, "analysis failed");
                let synthetic = Finding::analysis_failure(&path, &e);
                report.mark_failed(e.to_string(), vec![synthetic])
            }
        }
    }

    /// File a forge issue for `finding` in the session's repository.
    ///
    /// Independent of batch state.
    pub async fn create_issue(&self, session: &Session, finding: &Finding) -> Result<IssueHandle> {
        let token = session.token().ok_or_else(|| {
            ReviewError::Auth("Not signed in. Provide a GitHub token or log in.".to_string())
        })?;
        let repo = session
            .repo()
            .ok_or_else(|| ReviewError::Validation("No repository selected.".to_string()))?;

        let draft = IssueDraft::from_finding(finding);
        let handle = self
            .forge
            .create_issue(repo, token, &draft.title, &draft.body, &draft.labels)
            .await?;
        info!(issue = handle.number, title = %handle.title, "issue created");
        Ok(handle)
    }
}
