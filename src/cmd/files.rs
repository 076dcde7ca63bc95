//! Repository file listing - `repolens files`.

use anyhow::{Context, Result};
use console::style;

use repolens::config::Config;
use repolens::credentials::CredentialProvider;
use repolens::github::{ForgeClient, GitHubClient, RepoContext};
use repolens::selection::filter_supported;
use repolens::ui::icons::{FILE, FOLDER};

use super::super::Cli;
use super::auth::{resolve_credentials, signed_in};

pub async fn cmd_files(cli: &Cli, repo: &str, branch: &str, oauth: bool) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let repo = RepoContext::parse(repo, branch)?;
    let credentials = resolve_credentials(&config, oauth, cli.yes).await?;
    signed_in(&config, credentials, |credentials| {
        list_supported(&config, &repo, credentials)
    })
    .await
}

async fn list_supported(
    config: &Config,
    repo: &RepoContext,
    credentials: CredentialProvider,
) -> Result<()> {
    let token = credentials
        .current_token()
        .context("The resolved credential is empty")?;

    let client = GitHubClient::new(&config.file.github.api_base);
    let all = client
        .list_files(repo, token)
        .await
        .with_context(|| format!("Failed to list files of {}", repo))?;
    let total = all.len();
    let supported = filter_supported(all, &config.file.selection.extensions);

    println!();
    println!("{}{}", FOLDER, style(repo).bold());
    for file in &supported {
        println!("  {}{}", FILE, file.path);
    }
    println!();
    println!(
        "{} of {} files have a supported extension",
        style(supported.len()).cyan(),
        total
    );
    Ok(())
}
