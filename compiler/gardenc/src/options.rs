use std::path::PathBuf;

/// Flags shared by every command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Options {
    /// `--retention=N`: passes an unreached cache entry survives.
    pub retention: Option<u64>,
    /// `--cache=PATH`: persist the evaluation cache to a file.
    pub cache: Option<PathBuf>,
    /// `--stats`: print reuse statistics after each pass.
    pub stats: bool,
}

impl Options {
    /// Split `args` into options and positional arguments.
    pub fn parse(args: &[String]) -> Result<(Options, Vec<String>), String> {
        let mut options = Options::default();
        let mut positional = Vec::new();
        for arg in args {
            if let Some(value) = arg.strip_prefix("--retention=") {
                let passes = value
                    .parse()
                    .map_err(|_| format!("invalid --retention value '{value}'"))?;
                options.retention = Some(passes);
            } else if let Some(path) = arg.strip_prefix("--cache=") {
                if path.is_empty() {
                    return Err("--cache needs a path".to_owned());
                }
                options.cache = Some(PathBuf::from(path));
            } else if arg == "--stats" {
                options.stats = true;
            } else if arg.starts_with("--") {
                return Err(format!("unknown option '{arg}'"));
            } else {
                positional.push(arg.clone());
            }
        }
        Ok((options, positional))
    }
}
