//! Command implementations for the `garden` binary.
//!
//! Each command returns the process exit status; `main` only parses
//! arguments and exits with it.

mod deps;
mod replay;
mod run;

use std::fmt::Write as _;

pub use deps::{dependent_forms, deps};
pub use replay::replay;
pub use run::run;

use crate::diagnostics::{render_outcome, render_parse_error};
use crate::session::SessionReport;
use crate::{Options, Session};

/// Read a source file, reporting failure on stderr.
pub(crate) fn read_file(path: &str) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(source) => Some(source),
        Err(e) => {
            eprintln!("error: could not read '{path}': {e}");
            None
        }
    }
}

pub(crate) fn open_session(options: &Options) -> Option<Session> {
    match Session::new(options) {
        Ok(session) => Some(session),
        Err(e) => {
            eprintln!("error: {e}");
            None
        }
    }
}

/// Outcome lines for a report, one per form.
pub fn format_report(report: &SessionReport) -> String {
    let mut out = String::new();
    for form in &report.forms {
        let _ = writeln!(out, "{}", render_outcome(form));
    }
    out
}

/// Print diagnostics to stderr and outcomes to stdout.
pub(crate) fn print_report(path: &str, source: &str, report: &SessionReport, stats: bool) {
    for error in &report.parse_errors {
        eprintln!("{}", render_parse_error(path, source, error));
    }
    print!("{}", format_report(report));
    if stats {
        println!("{}", report.pass);
    }
}

pub(crate) fn flush(session: &Session) -> bool {
    match session.flush() {
        Ok(()) => true,
        Err(e) => {
            eprintln!("error: {e}");
            false
        }
    }
}
