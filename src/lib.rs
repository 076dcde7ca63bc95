pub mod analyzer;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod findings;
pub mod github;
pub mod orchestrator;
pub mod selection;
pub mod ui;

pub use errors::{Result, ReviewError};
