pub mod icons;
pub mod progress;
pub mod report;

pub use progress::BatchUI;
pub use report::{finding_label, print_reports, render_report};
