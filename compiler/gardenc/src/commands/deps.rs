use std::collections::BTreeSet;

use garden_ir::NodeId;

use super::{open_session, print_report, read_file};
use crate::{Options, Session};

/// `garden deps <file> <name>`: list the top-level forms that depend,
/// directly or through other declarations, on the declaration of `name`.
pub fn deps(path: &str, name: &str, options: &Options) -> i32 {
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
    if options.stats {
        print_report(path, &source, &report, true);
    }

    let Some(target) = report
        .forms
        .iter()
        .rev()
        .find(|form| form.name.as_deref() == Some(name))
        .and_then(|form| form.node)
    else {
        eprintln!("error: no declaration named '{name}' in '{path}'");
        return 1;
    };

    let roots: Vec<NodeId> = report.forms.iter().filter_map(|form| form.node).collect();
    for line in dependent_forms(&session, target, &roots) {
        println!("{line}");
    }
    0
}

/// Top-level forms among the transitive dependents of `target`, in source
/// order, rendered as `name` or as the form's text.
pub fn dependent_forms(session: &Session, target: NodeId, roots: &[NodeId]) -> Vec<String> {
    let engine = session.engine();
    let dependents: BTreeSet<NodeId> = engine.transitive_dependents_of(target).into_iter().collect();
    let mut seen = BTreeSet::new();
    let mut lines = Vec::new();
    for &root in roots {
        if !dependents.contains(&root) || !seen.insert(root) {
            continue;
        }
        let line = match engine.store().get(root) {
            Ok(node) => match node.kind.binder() {
                Some(name) => engine.store().name_str(name).to_owned(),
                None => engine
                    .store()
                    .render(root)
                    .unwrap_or_else(|_| root.to_string()),
            },
            Err(_) => root.to_string(),
        };
        lines.push(line);
    }
    lines
}
