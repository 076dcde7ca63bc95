//! Configuration view and initialization commands - `repolens config`.

use anyhow::{Context, Result, bail};
use std::path::PathBuf;

use repolens::config::{Config, RepolensToml, default_config_path};

use super::super::{Cli, ConfigCommands};

fn config_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => default_config_path().context("Could not determine the user config directory"),
    }
}

fn set_or_unset(value: Option<&String>) -> &'static str {
    match value {
        Some(_) => "set",
        None => "not set",
    }
}

pub fn cmd_config(cli: &Cli, command: Option<ConfigCommands>) -> Result<()> {
    let path = config_path(cli)?;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("repolens Configuration");
            println!("======================");
            println!();

            let toml = if path.exists() {
                println!("Config file: {}", path.display());
                RepolensToml::load(&path)?
            } else {
                println!("No config.toml found at {}", path.display());
                println!("Using default configuration:");
                RepolensToml::default()
            };
            println!();

            println!("[github]");
            println!("  api_base = \"{}\"", toml.github.api_base);
            println!("  oauth_base = \"{}\"", toml.github.oauth_base);
            if let Some(id) = &toml.github.client_id {
                println!("  client_id = \"{}\"", id);
            }
            if toml.github.client_secret.is_some() {
                println!("  client_secret = <hidden>");
            }
            println!("  redirect_uri = \"{}\"", toml.github.redirect_uri);
            println!("  scope = \"{}\"", toml.github.scope);
            println!();

            println!("[analyzer]");
            println!("  model = \"{}\"", toml.analyzer.model);
            println!("  api_base = \"{}\"", toml.analyzer.api_base);
            println!(
                "  assumed_seconds_per_file = {}",
                toml.analyzer.assumed_seconds_per_file
            );
            println!();

            println!("[selection]");
            println!("  extensions = {:?}", toml.selection.extensions);
            println!();

            // Show effective values (including env overrides)
            let warnings = toml.validate();
            let config = Config::from_toml_with_env(toml);
            println!("Effective values (with env overrides):");
            println!("  model = \"{}\"", config.file.analyzer.model);
            println!(
                "  GITHUB_TOKEN: {}",
                set_or_unset(config.github_token.as_ref())
            );
            println!(
                "  analyzer key (GEMINI_API_KEY / API_KEY): {}",
                set_or_unset(config.analyzer_key.as_ref())
            );
            println!(
                "  OAuth app: {}",
                if config.file.github.client_id.is_some() && config.file.github.client_secret.is_some() {
                    "configured"
                } else {
                    "not configured"
                }
            );
            println!();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
        }
        Some(ConfigCommands::Init { force }) => {
            if path.exists() && !force {
                bail!(
                    "{} already exists. Use --force to overwrite it.",
                    path.display()
                );
            }
            RepolensToml::default().save(&path)?;
            println!("Created {}", path.display());
            println!();
            println!("Set GITHUB_TOKEN and GEMINI_API_KEY in the environment or a .env file,");
            println!("or add client_id/client_secret under [github] to sign in with --oauth.");
        }
        Some(ConfigCommands::Path) => {
            println!("{}", path.display());
        }
    }

    Ok(())
}
