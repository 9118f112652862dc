//! `qbuild.toml` settings for the command line front end.
//!
//! Looked up in the working directory first, then in
//! `<config dir>/qbuild/qbuild.toml`. Every key is optional.
//!
//! ```toml
//! tree = "query.json"
//! show_mongo = true
//! show_query_string = false
//! page_size = 3
//! fetch_delay_ms = 0
//! ```

use crate::error::QbResult;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const SETTINGS_FILE: &str = "qbuild.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CliSettings {
    /// Query tree rendered when `render` is given no file.
    pub tree: Option<PathBuf>,
    pub show_mongo: bool,
    pub show_query_string: bool,
    /// Overrides the page size of async list fields.
    pub page_size: Option<usize>,
    pub fetch_delay_ms: Option<u64>,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            tree: None,
            show_mongo: false,
            show_query_string: false,
            page_size: None,
            fetch_delay_ms: None,
        }
    }
}

impl CliSettings {
    /// Load the first settings file found, or defaults when there is none.
    pub fn load() -> QbResult<Self> {
        match Self::locate() {
            Some(path) => Self::from_path(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_path(path: &Path) -> QbResult<Self> {
        debug!(path = %path.display(), "loading settings");
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> QbResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn fetch_delay(&self) -> Option<Duration> {
        self.fetch_delay_ms.map(Duration::from_millis)
    }

    fn locate() -> Option<PathBuf> {
        let local = PathBuf::from(SETTINGS_FILE);
        if local.exists() {
            return Some(local);
        }
        let global = dirs::config_dir()?.join("qbuild").join(SETTINGS_FILE);
        global.exists().then_some(global)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QbError;

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(CliSettings::from_toml_str("").unwrap(), CliSettings::default());
    }

    #[test]
    fn test_parse_all_keys() {
        let settings = CliSettings::from_toml_str(
            r#"
tree = "query.json"
show_mongo = true
page_size = 5
fetch_delay_ms = 0
"#,
        )
        .unwrap();
        assert_eq!(settings.tree, Some(PathBuf::from("query.json")));
        assert!(settings.show_mongo);
        assert!(!settings.show_query_string);
        assert_eq!(settings.page_size, Some(5));
        assert_eq!(settings.fetch_delay(), Some(Duration::ZERO));
    }

    #[test]
    fn test_bad_toml_is_settings_error() {
        let err = CliSettings::from_toml_str("page_size = \"many\"").unwrap_err();
        assert!(matches!(err, QbError::Settings(_)));
    }

    #[test]
    fn test_from_path() {
        let path = std::env::temp_dir().join(format!("qbuild-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "show_query_string = true\n").unwrap();
        let settings = CliSettings::from_path(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert!(settings.show_query_string);
    }
}
