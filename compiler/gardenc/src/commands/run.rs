use super::{flush, open_session, print_report, read_file};
use crate::Options;

/// `garden run <file>`: evaluate once and print every outcome.
pub fn run(path: &str, options: &Options) -> i32 {
    let Some(source) = read_file(path) else {
        return 1;
    };
    let Some(mut session) = open_session(options) else {
        return 1;
    };
    let report = match session.evaluate(&source) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };
    print_report(path, &source, &report, options.stats);
    if !flush(&session) || report.has_errors() {
        return 1;
    }
    0
}
