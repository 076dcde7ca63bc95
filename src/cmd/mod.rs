//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled            |
//! |-----------|-----------------------------|
//! | `auth`    | `Auth` (status/login/logout) |
//! | `files`   | `Files`                     |
//! | `analyze` | `Analyze`                   |
//! | `config`  | `Config`                    |

pub mod analyze;
pub mod auth;
pub mod config;
pub mod files;

pub use analyze::{AnalyzeOptions, cmd_analyze};
pub use auth::cmd_auth;
pub use config::cmd_config;
pub use files::cmd_files;
