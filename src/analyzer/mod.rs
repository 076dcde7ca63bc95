//! LLM analyzer client.
//!
//! [`Analyzer`] sends one file's text to a model and returns structured
//! findings. [`GeminiAnalyzer`] is the production implementation; the prompt
//! and response parsing are shared in [`prompt`] and [`parse`].

mod gemini;
pub mod parse;
pub mod prompt;

pub use gemini::GeminiAnalyzer;

use async_trait::async_trait;

use crate::errors::Result;
use crate::findings::Finding;

/// Abstraction over the analysis endpoint for testability.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Fail early with `Config` if the analyzer cannot run (e.g. no API key).
    fn ensure_ready(&self) -> Result<()> {
        Ok(())
    }

    /// Analyze one file. `sibling_paths` lists every path in the batch when it
    /// holds more than one file.
    async fn analyze(
        &self,
        content: &str,
        file_path: &str,
        sibling_paths: Option<&[String]>,
    ) -> Result<Vec<Finding>>;
}
