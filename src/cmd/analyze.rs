//! Batch analysis - `repolens analyze`.

use anyhow::{Context, Result, bail};
use console::style;
use dialoguer::{MultiSelect, theme::ColorfulTheme};
use tokio::sync::mpsc;

use repolens::analyzer::{Analyzer, GeminiAnalyzer};
use repolens::config::Config;
use repolens::credentials::CredentialProvider;
use repolens::findings::{FileStatus, Finding, Severity};
use repolens::github::{CandidateFile, ForgeClient, GitHubClient, RepoContext};
use repolens::orchestrator::{BatchOrchestrator, Session};
use repolens::selection::{filter_by_patterns, filter_supported, paths_of, pick_files};
use repolens::ui::icons::{CROSS, ISSUE, SPARKLE};
use repolens::ui::{BatchUI, finding_label, print_reports};

use super::super::Cli;
use super::auth::{resolve_credentials, signed_in};

/// Flags of the `analyze` command.
pub struct AnalyzeOptions {
    pub repo: String,
    pub branch: String,
    pub include: Vec<String>,
    pub all: bool,
    pub oauth: bool,
    pub create_issues: bool,
    pub min_severity: Severity,
}

pub async fn cmd_analyze(cli: &Cli, options: AnalyzeOptions) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    for warning in config.file.validate() {
        tracing::warn!("{}", warning);
    }

    let analyzer = GeminiAnalyzer::new(config.analyzer_key.clone().unwrap_or_default())
        .with_model(&config.file.analyzer.model)
        .with_api_base(&config.file.analyzer.api_base);
    // Fail before asking for a token or listing files.
    analyzer.ensure_ready()?;

    let repo = RepoContext::parse(&options.repo, &options.branch)?;
    let credentials = resolve_credentials(&config, options.oauth, cli.yes).await?;
    signed_in(&config, credentials, |credentials| {
        run_batch(cli, &config, &options, analyzer, repo, credentials)
    })
    .await
}

async fn run_batch(
    cli: &Cli,
    config: &Config,
    options: &AnalyzeOptions,
    analyzer: GeminiAnalyzer,
    repo: RepoContext,
    credentials: CredentialProvider,
) -> Result<()> {
    let mut session = Session::with_credentials(credentials);
    session.set_repo(repo.clone());

    let forge = GitHubClient::new(&config.file.github.api_base);
    let token = session
        .token()
        .context("The resolved credential is empty")?
        .to_string();
    let listing = forge
        .list_files(&repo, &token)
        .await
        .with_context(|| format!("Failed to list files of {}", repo))?;
    let supported = filter_supported(listing, &config.file.selection.extensions);

    let selected = select_files(supported, options, cli.yes)?;
    if selected.is_empty() {
        println!("{}{}", SPARKLE, style("No files selected for analysis.").dim());
        return Ok(());
    }
    let shared_context = paths_of(&selected);

    let (tx, rx) = mpsc::unbounded_channel();
    let ui = BatchUI::new(selected.len() as u64, cli.verbose);
    let ui_task = tokio::spawn(ui.follow(rx));

    let orchestrator = BatchOrchestrator::new(forge, analyzer)
        .with_assumed_seconds_per_file(config.file.analyzer.assumed_seconds_per_file)
        .with_events(tx);

    let summary = match orchestrator
        .start_batch(&mut session, &selected, &shared_context)
        .await
    {
        Ok(summary) => {
            let _ = ui_task.await;
            summary
        }
        Err(e) => {
            ui_task.abort();
            return Err(e).context("Analysis batch failed");
        }
    };

    print_reports(session.reports(), &summary);

    if options.create_issues {
        create_issues(&orchestrator, &session, options.min_severity, cli.yes).await?;
    }
    Ok(())
}

/// Narrow the supported files to the batch: `--include` globs, `--all`, or a picker.
fn select_files(
    supported: Vec<CandidateFile>,
    options: &AnalyzeOptions,
    yes: bool,
) -> Result<Vec<CandidateFile>> {
    if !options.include.is_empty() {
        return filter_by_patterns(supported, &options.include);
    }
    if options.all {
        return Ok(supported);
    }
    if yes || !console::Term::stdout().is_term() {
        bail!("No files selected. Pass --include <GLOB> or --all when not running interactively.");
    }
    pick_files(&supported)
}

/// File issues for findings of analyzed files at or above `min_severity`.
async fn create_issues<F: ForgeClient, A: Analyzer>(
    orchestrator: &BatchOrchestrator<F, A>,
    session: &Session,
    min_severity: Severity,
    yes: bool,
) -> Result<()> {
    // Synthetic failure findings stay in the report; they are not code issues.
    let candidates: Vec<&Finding> = session
        .reports()
        .iter()
        .filter(|r| r.status() == FileStatus::Analyzed)
        .flat_map(|r| r.findings())
        .filter(|f| f.severity().is_at_least(min_severity))
        .collect();

    if candidates.is_empty() {
        println!("{}No findings at or above {} to file", SPARKLE, min_severity);
        return Ok(());
    }

    let chosen: Vec<&Finding> = if yes {
        candidates
    } else {
        let labels: Vec<String> = candidates.iter().map(|f| finding_label(f)).collect();
        let picked = MultiSelect::with_theme(&ColorfulTheme::default())
            .with_prompt("Create GitHub issues for")
            .items(&labels)
            .interact()
            .context("Issue selection was interrupted")?;
        picked.into_iter().map(|i| candidates[i]).collect()
    };

    let mut failed = 0;
    for finding in &chosen {
        match orchestrator.create_issue(session, finding).await {
            Ok(handle) => println!(
                "{}#{} {} {}",
                ISSUE,
                style(handle.number).cyan(),
                handle.title,
                style(handle.html_url.unwrap_or_default()).dim()
            ),
            Err(e) => {
                failed += 1;
                eprintln!(
                    "{}Failed to create issue for '{}': {}",
                    CROSS,
                    finding.title(),
                    e
                );
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} issue(s) could not be created", failed, chosen.len());
    }
    Ok(())
}
