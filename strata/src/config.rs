//! Site configuration.
//!
//! A site may point Strata at a directory of sample data, name a logger that
//! records each time the library is initialised, and attach free-form
//! key/value entries for its own tools. Settings come from the environment
//! (`STRATA_SAMPLE_DATA_DIR`, `STRATA_IMPORT_LOGGER`) or from a JSON file:
//!
//! ```json
//! {
//!   "sample_data_dir": "/opt/strata/sample_data",
//!   "import_logger": "site.usage",
//!   "entries": {"archive": "/data/archive"}
//! }
//! ```

use crate::prelude::*;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable overriding the sample data directory.
pub const SAMPLE_DATA_DIR_ENV: &str = "STRATA_SAMPLE_DATA_DIR";

/// Environment variable naming the import logger.
pub const IMPORT_LOGGER_ENV: &str = "STRATA_IMPORT_LOGGER";

const DEFAULT_SAMPLE_DATA_DIR: &str = "sample_data";

static GLOBAL: Lazy<SiteConfig> = Lazy::new(SiteConfig::from_env);

/// Site-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Root of the sample data resources.
    #[serde(default = "default_sample_data_dir")]
    pub sample_data_dir: PathBuf,
    /// Logger recording the library version at initialisation.
    #[serde(default)]
    pub import_logger: Option<String>,
    /// Additional site-specific settings.
    #[serde(default)]
    pub entries: BTreeMap<String, String>,
}

fn default_sample_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SAMPLE_DATA_DIR)
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl SiteConfig {
    /// Reads settings from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let sample_data_dir = std::env::var_os(SAMPLE_DATA_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_sample_data_dir);
        let import_logger = std::env::var(IMPORT_LOGGER_ENV)
            .ok()
            .filter(|v| !v.is_empty());
        Self {
            sample_data_dir,
            import_logger,
            entries: BTreeMap::new(),
        }
    }

    /// Loads settings from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading site configuration {}", path.display()))?;
        serde_json::from_str(&text).map_err(|e| {
            StrataError::Configuration(format!("invalid site configuration {}: {e}", path.display()))
        })
    }

    /// The process-wide configuration, read from the environment on first use.
    pub fn global() -> &'static SiteConfig {
        &GLOBAL
    }

    /// Joins `parts` onto the sample data directory.
    pub fn sample_data_path<I, P>(&self, parts: I) -> PathBuf
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut path = self.sample_data_dir.clone();
        for part in parts {
            path.push(part);
        }
        path
    }

    /// Looks up a site-specific entry.
    pub fn entry(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

/// Full path of a sample data resource under the global configuration.
///
/// ```rust
/// use strata::config::{sample_data_path, SiteConfig};
///
/// let path = sample_data_path(["uk_hires.json"]);
/// assert!(path.starts_with(&SiteConfig::global().sample_data_dir));
/// ```
pub fn sample_data_path<I, P>(parts: I) -> PathBuf
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    SiteConfig::global().sample_data_path(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sample_data_path_joins_parts() {
        let site = SiteConfig {
            sample_data_dir: PathBuf::from("/opt/samples"),
            import_logger: None,
            entries: BTreeMap::new(),
        };
        assert_eq!(
            site.sample_data_path(["PP", "air_temp.json"]),
            PathBuf::from("/opt/samples/PP/air_temp.json")
        );
        assert_eq!(site.sample_data_path(Vec::<&str>::new()), PathBuf::from("/opt/samples"));
    }

    #[test]
    fn test_from_json_file_with_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"import_logger": "site.usage", "entries": {{"archive": "/data"}}}}"#).unwrap();

        let site = SiteConfig::from_json_file(file.path()).unwrap();
        assert_eq!(site.import_logger.as_deref(), Some("site.usage"));
        assert_eq!(site.entry("archive"), Some("/data"));
        assert_eq!(site.sample_data_dir, PathBuf::from(DEFAULT_SAMPLE_DATA_DIR));
    }

    #[test]
    fn test_from_json_file_errors() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = SiteConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, StrataError::Configuration(_)));

        assert!(SiteConfig::from_json_file("/no/such/site.json").is_err());
    }
}
