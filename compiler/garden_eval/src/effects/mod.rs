//! Effect handlers.
//!
//! An effect node (`(name! args...)`) is the only way evaluation reaches
//! outside the program. Its arguments are evaluated first, then the handler
//! registered under `name` is called with them. The handler's
//! [`EffectPolicy`] decides how long the cached result may be reused.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::cache::Expiry;
use crate::value::Value;

/// How long an effect result stays valid.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum EffectPolicy {
    /// Re-run on every pass.
    Always,
    /// Reuse until the duration has elapsed since the call.
    Ttl(Duration),
    /// Reuse until explicitly refreshed.
    #[default]
    Manual,
}

impl EffectPolicy {
    /// Expiry of a result produced at `now`.
    pub fn expiry_from(self, now: Instant) -> Expiry {
        match self {
            EffectPolicy::Always => Expiry::Always,
            EffectPolicy::Ttl(ttl) => now.checked_add(ttl).map_or(Expiry::Never, Expiry::At),
            EffectPolicy::Manual => Expiry::Never,
        }
    }
}

/// A call to an effect, with its evaluated arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectRequest {
    pub effect: String,
    pub args: Vec<Value>,
}

impl EffectRequest {
    pub fn new(effect: impl Into<String>, args: Vec<Value>) -> Self {
        EffectRequest {
            effect: effect.into(),
            args,
        }
    }

    /// The request as a JSON document: `{"effect": name, "args": [...]}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "effect": self.effect,
            "args": self.args.iter().map(Value::to_json).collect::<Vec<_>>(),
        })
    }

    /// The `index`-th argument as text, for handlers that take a path or key.
    pub fn text_arg(&self, index: usize) -> Result<&str, String> {
        match self.args.get(index) {
            Some(Value::Text(s)) => Ok(s),
            Some(other) => Err(format!(
                "argument {index} must be text, found {}",
                other.type_name()
            )),
            None => Err(format!("missing argument {index}")),
        }
    }
}

/// An external capability.
pub trait EffectHandler: Send + Sync {
    fn policy(&self) -> EffectPolicy {
        EffectPolicy::Manual
    }

    /// Perform the effect. `Err` carries a message for the effect error.
    fn call(&self, request: &EffectRequest) -> Result<Value, String>;
}

/// Handler backed by a closure.
pub struct FnHandler<F> {
    policy: EffectPolicy,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&EffectRequest) -> Result<Value, String> + Send + Sync,
{
    pub fn new(policy: EffectPolicy, f: F) -> Self {
        FnHandler { policy, f }
    }
}

impl<F> EffectHandler for FnHandler<F>
where
    F: Fn(&EffectRequest) -> Result<Value, String> + Send + Sync,
{
    fn policy(&self) -> EffectPolicy {
        self.policy
    }

    fn call(&self, request: &EffectRequest) -> Result<Value, String> {
        (self.f)(request)
    }
}

/// Effect handlers by name.
#[derive(Clone, Default)]
pub struct EffectRegistry {
    handlers: FxHashMap<String, Arc<dyn EffectHandler>>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any previous handler.
    pub fn register(&mut self, name: impl Into<String>, handler: impl EffectHandler + 'static) {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    /// Register a closure with the given policy.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, policy: EffectPolicy, f: F)
    where
        F: Fn(&EffectRequest) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.register(name, FnHandler::new(policy, f));
    }

    pub fn get(&self, name: &str) -> Option<&dyn EffectHandler> {
        self.handlers.get(name).map(|h| &**h)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_policy_expiry() {
        let now = Instant::now();
        assert_eq!(EffectPolicy::Always.expiry_from(now), Expiry::Always);
        assert_eq!(EffectPolicy::Manual.expiry_from(now), Expiry::Never);
        assert_eq!(
            EffectPolicy::Ttl(Duration::from_secs(5)).expiry_from(now),
            Expiry::At(now + Duration::from_secs(5))
        );
        assert_eq!(EffectPolicy::default(), EffectPolicy::Manual);
    }

    #[test]
    fn test_registry_dispatch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut registry = EffectRegistry::new();
        registry.register_fn("echo", EffectPolicy::Always, move |req| {
            counter.fetch_add(1, Ordering::SeqCst);
            req.text_arg(0).map(Value::text)
        });

        let handler = registry.get("echo");
        assert!(handler.is_some());
        let Some(handler) = handler else { return };
        assert_eq!(handler.policy(), EffectPolicy::Always);
        let req = EffectRequest::new("echo", vec![Value::text("hi")]);
        assert_eq!(handler.call(&req), Ok(Value::text("hi")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names(), vec!["echo"]);
    }

    #[test]
    fn test_request_json() {
        let req = EffectRequest::new("fs.read", vec![Value::text("a.txt"), Value::Int(2)]);
        assert_eq!(
            req.to_json(),
            serde_json::json!({"effect": "fs.read", "args": ["a.txt", 2]})
        );
        assert_eq!(req.text_arg(0), Ok("a.txt"));
        assert!(req.text_arg(1).is_err());
        assert!(req.text_arg(2).is_err());
    }
}
