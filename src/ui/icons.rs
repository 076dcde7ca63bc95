//! Shared UI icons and emojis.
//!
//! This module provides common emoji constants used across the UI components
//! for consistent visual styling.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!]");

// Batch indicators
pub static FILE: Emoji<'_, '_> = Emoji("📄 ", "");
pub static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "");
pub static ISSUE: Emoji<'_, '_> = Emoji("🐛 ", "#");
pub static KEY: Emoji<'_, '_> = Emoji("🔑 ", "");
