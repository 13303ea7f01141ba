use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, resolved once in `main` and handed to the
/// manager's constructor. There is no other source of settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the grader runs in; every path in responses is made
    /// relative to it. Defaults to the server's working directory.
    pub lesson_dir: PathBuf,
    /// Name of the external grading command.
    pub grader_command: String,
    /// Bounded wait for one grader invocation; `None` waits forever.
    pub grader_timeout: Option<Duration>,
    /// Static bearer token for the /lessons routes. `None` disables the
    /// check (auth is then the deployment's problem, e.g. a proxy).
    pub api_token: Option<String>,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            lesson_dir: env::var("LESSON_DIR").map(PathBuf::from).unwrap_or_else(|_| ".".into()),
            grader_command: env::var("GRADER_COMMAND").unwrap_or_else(|_| "nbgrader".into()),
            grader_timeout: parse_var("GRADER_TIMEOUT_SECS").map(Duration::from_secs),
            api_token: env::var("API_TOKEN").ok().filter(|t| !t.is_empty()),
            port: parse_var("PORT").unwrap_or(8081),
        }
    }
}

/// A value that does not parse is worth a warning, not a silent
/// fallback: an operator who set a bad GRADER_TIMEOUT_SECS would
/// otherwise get an unbounded wait they thought they'd bounded.
fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let value = env::var(name).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(%name, %value, "ignoring unparseable setting, using default");
            None
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            lesson_dir: ".".into(),
            grader_command: "nbgrader".into(),
            grader_timeout: None,
            api_token: None,
            port: 8081,
        }
    }
}
