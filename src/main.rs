use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use repolens::findings::Severity;

mod cmd;

#[derive(Parser)]
#[command(name = "repolens")]
#[command(
    version,
    about = "Review GitHub repository files with an LLM and file the findings as issues"
)]
pub struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip confirmation prompts
    #[arg(long, global = true)]
    pub yes: bool,

    /// Path to config.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage GitHub credentials
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// List the repository files that can be analyzed
    Files {
        /// Repository as owner/repo or a GitHub URL
        repo: String,

        #[arg(short, long, default_value = "main")]
        branch: String,

        /// Sign in through the browser instead of using GITHUB_TOKEN
        #[arg(long)]
        oauth: bool,
    },
    /// Analyze selected files and optionally open issues for the findings
    Analyze {
        /// Repository as owner/repo or a GitHub URL
        repo: String,

        #[arg(short, long, default_value = "main")]
        branch: String,

        /// Only analyze files matching these globs (repeatable)
        #[arg(short, long = "include")]
        include: Vec<String>,

        /// Analyze every supported file without prompting
        #[arg(long, conflicts_with = "include")]
        all: bool,

        /// Sign in through the browser instead of using GITHUB_TOKEN
        #[arg(long)]
        oauth: bool,

        /// Offer to open a GitHub issue for findings after the batch
        #[arg(long)]
        create_issues: bool,

        /// Lowest severity to file as issues: critical, high, medium, low, informational
        #[arg(long, default_value = "low", value_parser = parse_severity)]
        min_severity: Severity,
    },
    /// View or initialize configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum AuthCommands {
    /// Show the active credential and the account it belongs to
    Status {
        /// Sign in through the browser instead of using GITHUB_TOKEN
        #[arg(long)]
        oauth: bool,
    },
    /// Check the browser sign-in (OAuth authorization code flow).
    /// The token is revoked when the command exits; use --oauth on
    /// `files` or `analyze` to sign in for a run
    Login,
    /// Revoke a token issued to the configured OAuth app
    Logout {
        /// OAuth token to revoke (personal access tokens are not accepted)
        #[arg(long)]
        token: String,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Write a default config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the config file location
    Path,
}

fn parse_severity(value: &str) -> std::result::Result<Severity, String> {
    value.parse::<Severity>().map_err(|e| e.to_string())
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let default_filter = if verbose { "repolens=debug" } else { "warn" };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // A missing .env is fine; variables may come from the shell.
    let _ = dotenvy::dotenv();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Auth { command } => cmd::cmd_auth(&cli, command.clone()).await?,
        Commands::Files {
            repo,
            branch,
            oauth,
        } => cmd::cmd_files(&cli, repo, branch, *oauth).await?,
        Commands::Analyze {
            repo,
            branch,
            include,
            all,
            oauth,
            create_issues,
            min_severity,
        } => {
            let options = cmd::AnalyzeOptions {
                repo: repo.clone(),
                branch: branch.clone(),
                include: include.clone(),
                all: *all,
                oauth: *oauth,
                create_issues: *create_issues,
                min_severity: *min_severity,
            };
            cmd::cmd_analyze(&cli, options).await?;
        }
        Commands::Config { command } => cmd::cmd_config(&cli, command.clone())?,
    }

    Ok(())
}
