//! A long-lived evaluation session.

use std::sync::Arc;

use garden_eval::errors::parse_error;
use garden_eval::{
    CancelToken, Engine, EngineConfig, EngineError, EvalResult, FilePersistence, PassReport,
    PersistError,
};
use garden_ir::{NodeId, NodeStore, Span};
use garden_parse::ParseError;

use crate::host;
use crate::options::Options;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Persistence(#[from] PersistError),
}

/// Outcome of one top-level form, in source order.
#[derive(Clone, Debug, PartialEq)]
pub struct FormOutcome {
    /// `None` if the form failed to read.
    pub node: Option<NodeId>,
    pub span: Span,
    pub name: Option<String>,
    pub result: EvalResult,
}

/// Everything one evaluation of a source text produced.
#[derive(Clone, Debug)]
pub struct SessionReport {
    pub forms: Vec<FormOutcome>,
    pub parse_errors: Vec<ParseError>,
    pub pass: PassReport,
}

impl SessionReport {
    /// Result of the last form declaring `name`.
    pub fn result_of(&self, name: &str) -> Option<&EvalResult> {
        self.forms
            .iter()
            .rev()
            .find(|form| form.name.as_deref() == Some(name))
            .map(|form| &form.result)
    }

    pub fn has_errors(&self) -> bool {
        self.forms.iter().any(|form| form.result.is_err())
    }
}

/// An engine plus the host effects, evaluating successive program versions.
pub struct Session {
    engine: Engine,
    cancel: CancelToken,
}

impl Session {
    pub fn new(options: &Options) -> Result<Self, SessionError> {
        let mut config = EngineConfig::default();
        if let Some(retention) = options.retention {
            config.retention_passes = retention;
        }
        let mut engine = Engine::with_config(Arc::new(NodeStore::new()), config);
        if let Some(path) = &options.cache {
            let persistence = FilePersistence::open(path)?;
            tracing::debug!(path = %path.display(), entries = persistence.len(), "opened cache file");
            engine = engine.with_persistence(Arc::new(persistence));
        }
        host::register(engine.effects_mut());
        Ok(Session {
            engine,
            cancel: CancelToken::new(),
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Token that cancels the pass in flight.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Read and evaluate `source` as the current version of the program.
    ///
    /// Forms that fail to read get an [`EvalError::Parse`] outcome; the rest
    /// of the program is still evaluated.
    ///
    /// [`EvalError::Parse`]: garden_eval::EvalError::Parse
    pub fn evaluate(&mut self, source: &str) -> Result<SessionReport, EngineError> {
        let output = garden_parse::parse(source, self.engine.store());
        let pass = self.engine.run_pass(&output.roots(), &self.cancel)?;
        if pass.cancelled {
            self.cancel = CancelToken::new();
        }

        let mut outcomes = pass.outcomes.iter();
        let mut forms = Vec::with_capacity(output.forms.len());
        let mut parse_errors = Vec::new();
        for form in output.forms {
            match form {
                Ok(id) => {
                    let Some(outcome) = outcomes.next() else {
                        break;
                    };
                    forms.push(FormOutcome {
                        node: Some(id),
                        span: self.engine.store().span(id).unwrap_or(Span::DUMMY),
                        name: outcome.name.clone(),
                        result: outcome.result.clone(),
                    });
                }
                Err(error) => {
                    forms.push(FormOutcome {
                        node: None,
                        span: error.span,
                        name: None,
                        result: Err(parse_error(error.to_string())),
                    });
                    parse_errors.push(error);
                }
            }
        }
        Ok(SessionReport {
            forms,
            parse_errors,
            pass,
        })
    }

    /// Write the persisted cache, if any.
    pub fn flush(&self) -> Result<(), EngineError> {
        self.engine.flush()
    }
}
