//! Terminal display helpers for the CLI.
//!
//! Provides result tables, progress bars and a small color theme.

pub mod progress;
pub mod tables;
pub mod theme;

pub use progress::create_progress_bar;
pub use tables::{create_build_table, create_hits_table, create_snapshot_table};
pub use theme::{THEME, Theme};
