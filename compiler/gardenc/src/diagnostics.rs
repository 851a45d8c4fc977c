//! Terminal rendering of reader errors and outcomes.

use ariadne::{Config, Label, Report, ReportKind, Source};
use garden_parse::ParseError;

use crate::session::FormOutcome;

/// Render `error` against `source` as a plain-text report.
pub fn render_parse_error(filename: &str, source: &str, error: &ParseError) -> String {
    let range = error.span.to_range();
    let mut buf = Vec::new();
    let written = Report::build(ReportKind::Error, filename, range.start)
        .with_config(Config::default().with_color(false))
        .with_message(error.to_string())
        .with_label(Label::new((filename, range)).with_message(error.label()))
        .finish()
        .write((filename, Source::from(source)), &mut buf);
    match written {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => format!("{filename}:{}: {error}", error.span),
    }
}

/// One line per form: `name = value` for declarations, `=> value` for bare
/// expressions, and `!` in place of `=` for failures.
pub fn render_outcome(outcome: &FormOutcome) -> String {
    let label = outcome.name.as_deref().unwrap_or("");
    match (&outcome.result, label.is_empty()) {
        (Ok(value), false) => format!("{label:<20} = {value}"),
        (Ok(value), true) => format!("=> {value}"),
        (Err(error), false) => format!("{label:<20} ! {error}"),
        (Err(error), true) => format!("!  {error}"),
    }
}

#[cfg(test)]
mod tests {
    use garden_eval::errors::division_by_zero;
    use garden_eval::Value;
    use garden_ir::{NodeStore, Span};

    use super::*;

    #[test]
    fn test_parse_error_report_names_file_and_message() {
        let store = NodeStore::new();
        let source = "(def a 1)\n(def b (+ 1 2)";
        let output = garden_parse::parse(source, &store);
        let Some(error) = output.errors().next() else {
            panic!("expected a parse error");
        };
        let report = render_parse_error("demo.gdn", source, error);
        assert!(report.contains("demo.gdn"), "{report}");
        assert!(report.contains(&error.to_string()), "{report}");
    }

    #[test]
    fn test_outcome_lines() {
        let def = FormOutcome {
            node: None,
            span: Span::DUMMY,
            name: Some("x".to_owned()),
            result: Ok(Value::Int(4)),
        };
        assert_eq!(render_outcome(&def), format!("{:<20} = 4", "x"));

        let expr = FormOutcome {
            name: None,
            result: Err(division_by_zero()),
            ..def
        };
        assert_eq!(render_outcome(&expr), "!  division by zero");
    }
}
