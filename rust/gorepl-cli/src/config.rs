//! Environment-driven configuration.
//!
//! Every setting has a default; the `GOREPL_*` variables override them.
//! Resolution goes through [`ReplConfig::from_lookup`] so it can be tested
//! without touching the process environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

pub const GO_ENV: &str = "GOREPL_GO";
pub const SCRATCH_DIR_ENV: &str = "GOREPL_SCRATCH_DIR";
pub const COMPILE_ENV: &str = "GOREPL_COMPILE";
pub const LINK_ENV: &str = "GOREPL_LINK";
pub const TIMEOUT_ENV: &str = "GOREPL_TIMEOUT_SECS";
pub const HISTORY_PATH_ENV: &str = "GOREPL_HISTORY_PATH";
pub const LOG_ENV: &str = "GOREPL_LOG";

pub const DEFAULT_COMPILE: &str = "{go} build -o {bin} {src}";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a whole number of seconds, got '{value}'")]
    InvalidTimeout { var: &'static str, value: String },
}

/// How the Go toolchain is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainConfig {
    pub go: PathBuf,
    pub scratch_dir: PathBuf,
    /// Compile step template; see [`DEFAULT_COMPILE`].
    pub compile: String,
    /// Optional link step run after a clean compile step.
    pub link: Option<String>,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplConfig {
    pub toolchain: ToolchainConfig,
    /// `None` when no home directory is known and no override is set.
    pub history_path: Option<PathBuf>,
    pub log_filter: String,
}

impl ReplConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let home = dirs::home_dir();
        Self::from_lookup(|key| std::env::var(key).ok(), home.as_deref(), &std::env::temp_dir())
    }

    /// Resolve the configuration from an environment lookup. Empty values
    /// count as unset.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        home: Option<&Path>,
        temp_dir: &Path,
    ) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let go = match (var(GO_ENV), var("GOROOT")) {
            (Some(go), _) => PathBuf::from(go),
            (None, Some(root)) => Path::new(&root).join("bin").join("go"),
            (None, None) => PathBuf::from("go"),
        };

        let scratch_dir = var(SCRATCH_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| temp_dir.join("gorepl"));

        let timeout_secs = match var(TIMEOUT_ENV) {
            Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::InvalidTimeout {
                var: TIMEOUT_ENV,
                value: raw.clone(),
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            toolchain: ToolchainConfig {
                go,
                scratch_dir,
                compile: var(COMPILE_ENV).unwrap_or_else(|| DEFAULT_COMPILE.to_string()),
                link: var(LINK_ENV),
                timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            },
            history_path: resolve_history_path(home, var(HISTORY_PATH_ENV).as_deref()),
            log_filter: var(LOG_ENV).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }
}

/// Where history is kept. A configured path may start with `~`, and a
/// relative one is taken from HOME. Without HOME only an absolute override
/// yields a path.
pub fn resolve_history_path(home: Option<&Path>, override_path: Option<&str>) -> Option<PathBuf> {
    match override_path.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => expand_home(raw, home),
        None => home.map(|home| home.join(".gorepl").join("history")),
    }
}

fn expand_home(raw: &str, home: Option<&Path>) -> Option<PathBuf> {
    let relative = match raw.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/'),
        _ if Path::new(raw).is_absolute() => return Some(PathBuf::from(raw)),
        _ => raw,
    };
    let home = home?;
    Some(if relative.is_empty() { home.to_path_buf() } else { home.join(relative) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(vars: &[(&str, &str)]) -> Result<ReplConfig, ConfigError> {
        let env: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ReplConfig::from_lookup(
            |key| env.get(key).cloned(),
            Some(Path::new("/home/gopher")),
            Path::new("/tmp"),
        )
    }

    #[test]
    fn test_defaults() {
        let config = resolve(&[]).unwrap();
        assert_eq!(config.toolchain.go, PathBuf::from("go"));
        assert_eq!(config.toolchain.scratch_dir, PathBuf::from("/tmp/gorepl"));
        assert_eq!(config.toolchain.compile, DEFAULT_COMPILE);
        assert_eq!(config.toolchain.link, None);
        assert_eq!(config.toolchain.timeout, Some(Duration::from_secs(30)));
        assert_eq!(
            config.history_path,
            Some(PathBuf::from("/home/gopher/.gorepl/history"))
        );
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_goroot_locates_go() {
        let config = resolve(&[("GOROOT", "/usr/local/go")]).unwrap();
        assert_eq!(config.toolchain.go, PathBuf::from("/usr/local/go/bin/go"));

        let config = resolve(&[("GOROOT", "/usr/local/go"), (GO_ENV, "/opt/go1.22/bin/go")]).unwrap();
        assert_eq!(config.toolchain.go, PathBuf::from("/opt/go1.22/bin/go"));
    }

    #[test]
    fn test_overrides() {
        let config = resolve(&[
            (SCRATCH_DIR_ENV, "/var/tmp/repl"),
            (COMPILE_ENV, "{go} tool compile -o {obj} {src}"),
            (LINK_ENV, "{go} tool link -o {bin} {obj}"),
            (TIMEOUT_ENV, "0"),
            (LOG_ENV, "gorepl_cli=debug"),
        ])
        .unwrap();
        assert_eq!(config.toolchain.scratch_dir, PathBuf::from("/var/tmp/repl"));
        assert_eq!(config.toolchain.link.as_deref(), Some("{go} tool link -o {bin} {obj}"));
        assert_eq!(config.toolchain.timeout, None);
        assert_eq!(config.log_filter, "gorepl_cli=debug");
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = resolve(&[(LINK_ENV, "  "), (TIMEOUT_ENV, "")]).unwrap();
        assert_eq!(config.toolchain.link, None);
        assert_eq!(config.toolchain.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_timeout() {
        let err = resolve(&[(TIMEOUT_ENV, "soon")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidTimeout { var: TIMEOUT_ENV, value: "soon".into() }
        );
        assert!(resolve(&[(TIMEOUT_ENV, "-5")]).is_err());
    }

    #[test]
    fn test_resolve_history_path() {
        let home = Path::new("/home/tester");

        assert_eq!(
            resolve_history_path(Some(home), None),
            Some(PathBuf::from("/home/tester/.gorepl/history"))
        );
        assert_eq!(
            resolve_history_path(Some(home), Some("repl/history.log")),
            Some(PathBuf::from("/home/tester/repl/history.log"))
        );
        assert_eq!(
            resolve_history_path(Some(home), Some("~/logs/repl.log")),
            Some(PathBuf::from("/home/tester/logs/repl.log"))
        );
        assert_eq!(
            resolve_history_path(Some(home), Some("/tmp/repl.log")),
            Some(PathBuf::from("/tmp/repl.log"))
        );
        assert_eq!(resolve_history_path(Some(home), Some(" ~ ")), Some(home.to_path_buf()));
        assert_eq!(
            resolve_history_path(None, Some("/var/log/repl")),
            Some(PathBuf::from("/var/log/repl"))
        );
        assert_eq!(resolve_history_path(None, Some("~/h")), None);
        assert_eq!(resolve_history_path(None, Some("relative.log")), None);
        assert_eq!(resolve_history_path(None, None), None);
    }
}
