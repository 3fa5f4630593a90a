//! Common CLI types shared across commands

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-oriented output with colors
    #[default]
    Pretty,
    /// One row per entry
    Table,
    /// JSON wrapped in a `data`/`meta` envelope
    Json,
}
