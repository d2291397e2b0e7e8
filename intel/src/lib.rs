//! Server market intelligence briefs.
//!
//! Builds a prompt from a language and market selection, asks Gemini (with
//! Google Search grounding) for a report, retries on quota errors, then splits
//! the reply into sections and prepares a mail preview link.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod executor;
pub mod locale;
pub mod mail;
pub mod prompt;
pub mod report;
pub mod sections;

pub use error::GenerationError;
pub use report::{Report, ReportService};

/// Install the env-filtered fmt subscriber (RUST_LOG, default `info`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}
