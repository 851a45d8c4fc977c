//! Garden driver.
//!
//! Glue between the reader, the evaluation engine and the terminal: a
//! [`Session`] reads a program, evaluates it against a long-lived engine and
//! pairs each top-level form with its outcome, including forms that failed
//! to read. The `garden` binary is a thin layer of commands over it.

pub mod commands;
pub mod diagnostics;
pub mod host;
mod options;
mod session;

use std::sync::Once;

pub use options::Options;
pub use session::{FormOutcome, Session, SessionError, SessionReport};

static TRACING_INIT: Once = Once::new();

/// Environment variable holding the log filter, e.g. `garden_eval=trace`.
pub const LOG_ENV: &str = "GARDEN_LOG";

/// Install the log subscriber if [`LOG_ENV`] is set.
///
/// Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};

        if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
            tracing_subscriber::registry()
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_writer(std::io::stderr)
                        .with_targets(true)
                        .with_bracketed_fields(true),
                )
                .with(filter)
                .init();
        }
    });
}
