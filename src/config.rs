use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::theme::Theme;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// User settings from `settings.json`. Every field is optional.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_limit: usize,
    /// Passive status/branch refresh period. `0` turns the timer off.
    pub refresh_interval_ms: u64,
    pub theme: Theme,
    pub editor: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_limit: 200,
            refresh_interval_ms: 3000,
            theme: Theme::Mocha,
            editor: None,
        }
    }
}

impl Settings {
    /// Load from the default location. A missing file yields the defaults;
    /// a broken one yields the defaults plus a warning in the log.
    pub fn load() -> Settings {
        let Some(path) = settings_file_path() else {
            return Settings::default();
        };
        match Settings::load_from(&path) {
            Ok(Some(settings)) => {
                tracing::info!(path = %path.display(), "settings loaded");
                settings
            }
            Ok(None) => Settings::default(),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring settings file");
                Settings::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Settings>, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let mut settings: Settings =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if settings.log_limit == 0 {
            settings.log_limit = Settings::default().log_limit;
        }
        settings.editor = settings.editor.filter(|e| !e.trim().is_empty());
        Ok(Some(settings))
    }
}

pub fn settings_file_path() -> Option<PathBuf> {
    let home = env::home_dir()?;
    let base = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| home.join(".config"));
    Some(base.join("gitbuddy").join("settings.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("settings.json");
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Settings::load_from(&dir.path().join("nope.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, r#"{ "theme": "terminal", "editor": "  " }"#);
        let s = Settings::load_from(&path).unwrap().unwrap();
        assert_eq!(s.theme, Theme::Terminal);
        assert_eq!(s.log_limit, 200);
        assert_eq!(s.refresh_interval_ms, 3000);
        assert_eq!(s.editor, None);
    }

    #[test]
    fn zero_log_limit_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, r#"{ "log_limit": 0, "refresh_interval_ms": 0 }"#);
        let s = Settings::load_from(&path).unwrap().unwrap();
        assert_eq!(s.log_limit, 200);
        assert_eq!(s.refresh_interval_ms, 0);
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "{ log_limit: ");
        assert!(matches!(
            Settings::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
