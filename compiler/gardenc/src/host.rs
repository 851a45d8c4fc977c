//! Effects the driver provides to programs.
//!
//! - `(env.var! "NAME")` reads an environment variable. Results are reused
//!   for [`ENV_VAR_TTL`].
//! - `(fs.read! "path")` reads a file as text. Results are reused until the
//!   effect node is refreshed.

use std::time::Duration;

use garden_eval::{EffectHandler, EffectPolicy, EffectRegistry, EffectRequest, Value};

pub const ENV_VAR_TTL: Duration = Duration::from_secs(5);

pub struct EnvVar;

impl EffectHandler for EnvVar {
    fn policy(&self) -> EffectPolicy {
        EffectPolicy::Ttl(ENV_VAR_TTL)
    }

    fn call(&self, request: &EffectRequest) -> Result<Value, String> {
        expect_args(request, 1)?;
        let name = request.text_arg(0)?;
        std::env::var(name)
            .map(Value::text)
            .map_err(|e| format!("{name}: {e}"))
    }
}

pub struct FileRead;

impl EffectHandler for FileRead {
    fn call(&self, request: &EffectRequest) -> Result<Value, String> {
        expect_args(request, 1)?;
        let path = request.text_arg(0)?;
        std::fs::read_to_string(path)
            .map(Value::text)
            .map_err(|e| format!("{path}: {e}"))
    }
}

fn expect_args(request: &EffectRequest, count: usize) -> Result<(), String> {
    if request.args.len() == count {
        Ok(())
    } else {
        Err(format!(
            "expected {count} argument(s), found {}",
            request.args.len()
        ))
    }
}

/// Register every host effect.
pub fn register(registry: &mut EffectRegistry) {
    registry.register("env.var", EnvVar);
    registry.register("fs.read", FileRead);
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_file_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "hello").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let request = EffectRequest::new("fs.read", vec![Value::text(path)]);
        assert_eq!(FileRead.call(&request), Ok(Value::text("hello")));
        assert_eq!(FileRead.policy(), EffectPolicy::Manual);
    }

    #[test]
    fn test_file_read_missing() {
        let request = EffectRequest::new("fs.read", vec![Value::text("/no/such/garden/file")]);
        assert!(FileRead.call(&request).is_err());
    }

    #[test]
    fn test_env_var() {
        let request = EffectRequest::new("env.var", vec![Value::text("PATH")]);
        assert!(EnvVar.call(&request).is_ok());
        assert_eq!(EnvVar.policy(), EffectPolicy::Ttl(ENV_VAR_TTL));

        let missing = EffectRequest::new("env.var", vec![Value::text("GARDEN_SURELY_UNSET_VARIABLE")]);
        assert!(EnvVar.call(&missing).is_err());
    }

    #[test]
    fn test_arity() {
        let request = EffectRequest::new("env.var", vec![]);
        assert!(EnvVar.call(&request).is_err());
    }
}
