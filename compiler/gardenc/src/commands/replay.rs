use super::{flush, open_session, print_report, read_file};
use crate::Options;

/// `garden replay <file>...`: evaluate each file as the next version of one
/// program, in one session, printing outcomes and reuse per pass.
pub fn replay(paths: &[String], options: &Options) -> i32 {
    let Some(mut session) = open_session(options) else {
        return 1;
    };
    let mut status = 0;
    for path in paths {
        let Some(source) = read_file(path) else {
            return 1;
        };
        let report = match session.evaluate(&source) {
            Ok(report) => report,
            Err(e) => {
                eprintln!("error: {e}");
                return 1;
            }
        };
        println!("== {path} ==");
        print_report(path, &source, &report, true);
        if report.has_errors() {
            status = 1;
        }
    }
    if !flush(&session) {
        return 1;
    }
    status
}
