use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const PREFS_DIR: &str = "hoops_terminal";
const PREFS_FILE: &str = "prefs.json";
const PREFS_VERSION: u32 = 1;

/// Backend cap on `cache_ttl`; larger values are clamped server-side anyway.
pub const MAX_CACHE_TTL: u32 = 120;
pub const CACHE_TTL_STEPS: [u32; 4] = [0, 30, 60, 120];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendsOverride {
    #[default]
    Default,
    On,
    Off,
}

impl TrendsOverride {
    pub fn cycle(self) -> Self {
        match self {
            TrendsOverride::Default => TrendsOverride::On,
            TrendsOverride::On => TrendsOverride::Off,
            TrendsOverride::Off => TrendsOverride::Default,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TrendsOverride::Default => "default",
            TrendsOverride::On => "on",
            TrendsOverride::Off => "off",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub trends: TrendsOverride,
    #[serde(default)]
    pub compact: bool,
    #[serde(default)]
    pub cache_ttl: u32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            trends: TrendsOverride::Default,
            compact: false,
            cache_ttl: 0,
        }
    }
}

impl Preferences {
    pub fn cycle_cache_ttl(&mut self) {
        let next = CACHE_TTL_STEPS
            .iter()
            .copied()
            .find(|step| *step > self.cache_ttl)
            .unwrap_or(CACHE_TTL_STEPS[0]);
        self.cache_ttl = next;
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PrefsFile {
    version: u32,
    prefs: Preferences,
}

/// Where preferences live. Loaded once when the app mounts, written after
/// every change.
#[derive(Debug, Clone)]
pub struct PrefsStore {
    path: Option<PathBuf>,
}

impl PrefsStore {
    pub fn from_env() -> Self {
        Self {
            path: default_prefs_path(),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn load(&self) -> Preferences {
        let Some(path) = self.path.as_deref() else {
            return Preferences::default();
        };
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Preferences::default(),
            Err(err) => {
                tracing::warn!(
                    event = "prefs.read_failed",
                    path = %path.display(),
                    error = %err
                );
                return Preferences::default();
            }
        };
        let Ok(file) = serde_json::from_str::<PrefsFile>(&raw) else {
            tracing::warn!(event = "prefs.corrupt", path = %path.display());
            return Preferences::default();
        };
        if file.version != PREFS_VERSION {
            tracing::warn!(
                event = "prefs.version_mismatch",
                path = %path.display(),
                found = file.version,
                expected = PREFS_VERSION
            );
            return Preferences::default();
        }
        let mut prefs = file.prefs;
        prefs.cache_ttl = prefs.cache_ttl.min(MAX_CACHE_TTL);
        prefs
    }

    pub fn save(&self, prefs: &Preferences) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("create prefs dir")?;
        }
        let file = PrefsFile {
            version: PREFS_VERSION,
            prefs: *prefs,
        };
        let json = serde_json::to_string_pretty(&file).context("serialize prefs")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).context("write prefs")?;
        fs::rename(&tmp, path).context("swap prefs")?;
        Ok(())
    }
}

fn default_prefs_path() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CONFIG_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(PREFS_DIR).join(PREFS_FILE));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(PREFS_DIR)
            .join(PREFS_FILE),
    )
}
