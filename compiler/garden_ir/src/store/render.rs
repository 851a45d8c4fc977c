//! Render nodes back to surface syntax.

use std::fmt::Write;

use super::{NodeStore, StoreError};
use crate::node::{Literal, NodeId, NodeKind};
use garden_stack::ensure_sufficient_stack;

impl NodeStore {
    /// Render the subtree at `id` as an s-expression.
    pub fn render(&self, id: NodeId) -> Result<String, StoreError> {
        let mut out = String::new();
        self.render_into(id, &mut out)?;
        Ok(out)
    }

    fn render_into(&self, id: NodeId, out: &mut String) -> Result<(), StoreError> {
        ensure_sufficient_stack(|| {
            let node = self.get(id)?;
            let (open, close, head) = match node.kind {
                NodeKind::Literal(literal) => {
                    self.render_literal(literal, out);
                    return Ok(());
                }
                NodeKind::Symbol(name) => {
                    out.push_str(self.name_str(name));
                    return Ok(());
                }
                NodeKind::Def(name) => ("(", ")", format!("def {}", self.name_str(name))),
                NodeKind::Let(name) => ("(", ")", format!("let {}", self.name_str(name))),
                NodeKind::If => ("(", ")", "if".to_owned()),
                NodeKind::Recover => ("(", ")", "recover".to_owned()),
                NodeKind::Op(op) => ("(", ")", op.symbol().to_owned()),
                NodeKind::Call(name) => ("(", ")", self.name_str(name).to_owned()),
                NodeKind::Effect(name) => ("(", ")", format!("{}!", self.name_str(name))),
                NodeKind::List => ("[", "]", String::new()),
                NodeKind::Set => ("#{", "}", String::new()),
                NodeKind::Map => ("{", "}", String::new()),
            };

            out.push_str(open);
            out.push_str(&head);
            for (i, child) in node.children.iter().enumerate() {
                if i > 0 || !head.is_empty() {
                    out.push(' ');
                }
                self.render_into(*child, out)?;
            }
            out.push_str(close);
            Ok(())
        })
    }

    fn render_literal(&self, literal: Literal, out: &mut String) {
        match literal {
            Literal::Int(v) => {
                let _ = write!(out, "{v}");
            }
            Literal::Float(bits) => {
                let v = f64::from_bits(bits);
                if v.is_finite() && v.fract() == 0.0 {
                    let _ = write!(out, "{v:.1}");
                } else {
                    let _ = write!(out, "{v}");
                }
            }
            Literal::Bool(v) => {
                let _ = write!(out, "{v}");
            }
            Literal::Text(name) => {
                out.push('"');
                for c in self.name_str(name).chars() {
                    match c {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        '\t' => out.push_str("\\t"),
                        '\r' => out.push_str("\\r"),
                        c => out.push(c),
                    }
                }
                out.push('"');
            }
        }
    }
}
