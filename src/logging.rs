use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Where `HOOPS_LOG` points: `1`/`true` selects the default cache location,
/// anything else non-empty is taken as a file path. Unset disables logging,
/// since stdout and stderr belong to the terminal UI.
pub fn log_path(value: Option<&str>, cache_home: Option<&Path>, home: Option<&Path>) -> Option<PathBuf> {
    let value = value?.trim();
    match value {
        "" | "0" | "false" => None,
        "1" | "true" => {
            let base = match (cache_home, home) {
                (Some(cache), _) => cache.to_path_buf(),
                (None, Some(home)) => home.join(".cache"),
                (None, None) => return None,
            };
            Some(base.join("hoops_terminal").join("hoops.log"))
        }
        path => Some(PathBuf::from(path)),
    }
}

/// Installs a JSON file subscriber when `HOOPS_LOG` is set. Returns the log
/// path in use. Filter directives come from `HOOPS_LOG_LEVEL` (default `info`).
pub fn init() -> Option<PathBuf> {
    let value = std::env::var("HOOPS_LOG").ok();
    let cache_home = std::env::var_os("XDG_CACHE_HOME").map(PathBuf::from);
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let path = log_path(value.as_deref(), cache_home.as_deref(), home.as_deref())?;

    if let Some(dir) = path.parent() {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!("hoops: failed to create log dir {}: {}", dir.display(), e);
            return None;
        }
    }
    let file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("hoops: failed to open log file {}: {}", path.display(), e);
            return None;
        }
    };

    let filter = EnvFilter::try_from_env("HOOPS_LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = fmt::layer()
        .json()
        .with_writer(Mutex::new(file))
        .with_target(false)
        .with_current_span(false)
        .with_span_list(false);

    if tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .is_err()
    {
        return None;
    }
    tracing::info!(event = "app.logging_started", path = %path.display());
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_or_false_disables() {
        assert_eq!(log_path(None, None, Some(Path::new("/home/a"))), None);
        assert_eq!(log_path(Some("0"), None, Some(Path::new("/home/a"))), None);
    }

    #[test]
    fn flag_uses_cache_dir() {
        assert_eq!(
            log_path(Some("1"), None, Some(Path::new("/home/a"))),
            Some(PathBuf::from("/home/a/.cache/hoops_terminal/hoops.log"))
        );
        assert_eq!(
            log_path(Some("true"), Some(Path::new("/tmp/c")), None),
            Some(PathBuf::from("/tmp/c/hoops_terminal/hoops.log"))
        );
    }

    #[test]
    fn explicit_path_is_kept() {
        assert_eq!(
            log_path(Some("/var/log/hoops.json"), None, None),
            Some(PathBuf::from("/var/log/hoops.json"))
        );
    }
}
