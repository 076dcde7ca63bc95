//! Choosing which repository files go into a batch.
//!
//! The listing from the forge is narrowed in two steps: first to files with a
//! reviewable extension, then either by `--include` globs or by an interactive
//! multi-select.

use anyhow::{Context, Result};
use dialoguer::{MultiSelect, theme::ColorfulTheme};
use glob::{MatchOptions, Pattern};

use crate::github::CandidateFile;

/// Extensions offered for analysis when config.toml doesn't override them.
pub const SUPPORTED_FILE_EXTENSIONS: &[&str] = &[
    ".js", ".jsx", ".ts", ".tsx", ".py", ".java", ".cs", ".go", ".rb", ".php", ".html", ".css",
    ".json", ".yaml", ".yml", ".md", ".sh", ".swift", ".kt", ".rs",
];

/// Whether `path` ends with one of `extensions` (case-insensitive).
pub fn has_supported_extension<S: AsRef<str>>(path: &str, extensions: &[S]) -> bool {
    let lower = path.to_lowercase();
    extensions
        .iter()
        .any(|ext| lower.ends_with(&ext.as_ref().to_lowercase()))
}

/// Keep files whose extension is in `extensions`, preserving order.
pub fn filter_supported<S: AsRef<str>>(
    files: Vec<CandidateFile>,
    extensions: &[S],
) -> Vec<CandidateFile> {
    files
        .into_iter()
        .filter(|f| has_supported_extension(&f.path, extensions))
        .collect()
}

/// Keep files matching any of `patterns`, preserving order.
///
/// `*` does not cross `/`; use `**` for recursive matches.
pub fn filter_by_patterns(
    files: Vec<CandidateFile>,
    patterns: &[String],
) -> Result<Vec<CandidateFile>> {
    let compiled = patterns
        .iter()
        .map(|p| Pattern::new(p).with_context(|| format!("Invalid include pattern: {}", p)))
        .collect::<Result<Vec<_>>>()?;

    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    Ok(files
        .into_iter()
        .filter(|f| compiled.iter().any(|p| p.matches_with(&f.path, options)))
        .collect())
}

/// Ask the user which files to analyze. Returns them in listing order.
pub fn pick_files(files: &[CandidateFile]) -> Result<Vec<CandidateFile>> {
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let items: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    let chosen = MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt("Select files to analyze (space to toggle, enter to confirm)")
        .items(&items)
        .interact()
        .context("File selection was interrupted")?;

    Ok(chosen.into_iter().map(|i| files[i].clone()).collect())
}

/// Paths of `files`, used as the batch's shared context.
pub fn paths_of(files: &[CandidateFile]) -> Vec<String> {
    files.iter().map(|f| f.path.clone()).collect()
}
