//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading business
//! parameters from a directory of YAML files into a [`ConfigStore`].

use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{EngineError, EngineResult};

use super::resolver::ConfigStore;
use super::types::ValueType;

/// Top-level shape of one configuration file.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    configurations: Vec<ConfigurationEntry>,
}

#[derive(Debug, Deserialize)]
struct ConfigurationEntry {
    module: String,
    key: String,
    value_type: ValueType,
    #[serde(default)]
    settings: Vec<SettingEntry>,
}

#[derive(Debug, Deserialize)]
struct SettingEntry {
    #[serde(default)]
    context_key: Option<String>,
    value: serde_json::Value,
    #[serde(default)]
    effective_from: Option<NaiveDate>,
    #[serde(default)]
    effective_to: Option<NaiveDate>,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Loads and provides access to engine configuration.
///
/// # Directory Structure
///
/// Every `*.yaml` file in the directory is read in name order:
/// ```text
/// config/default/
/// ├── engine.yaml   # batch worker settings
/// ├── fnf.yaml      # gratuity, encashment, notice, clearance
/// ├── leave.yaml    # calendar settings and leave categories
/// └── payroll.yaml  # statutory deductions, holiday compensation
/// ```
///
/// Each file holds a `configurations` list:
/// ```yaml
/// configurations:
///   - module: payroll
///     key: statutory
///     value_type: json
///     settings:
///       - effective_from: 2024-04-01
///         value: { pf_employee_percentage: 12 }
/// ```
///
/// # Example
///
/// ```no_run
/// use compensation_engine::config::{ConfigLoader, ConfigResolver};
/// use chrono::NaiveDate;
///
/// let loader = ConfigLoader::load("./config/default").unwrap();
/// let date = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
/// let statutory = loader.store().resolve("payroll", "statutory", None, date).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    store: ConfigStore,
    files: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - The directory is missing or has no YAML files
    /// - Any file contains invalid YAML
    /// - Any setting value does not match its declared type
    /// - Two active settings of one configuration and context overlap
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let dir = path.as_ref();
        let dir_str = dir.display().to_string();

        if !dir.is_dir() {
            return Err(EngineError::ConfigDirectoryNotFound { path: dir_str });
        }

        let entries = fs::read_dir(dir).map_err(|_| EngineError::ConfigDirectoryNotFound {
            path: dir_str.clone(),
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "yaml" || ext == "yml"))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(EngineError::ConfigDirectoryNotFound {
                path: format!("{} (no configuration files found)", dir_str),
            });
        }

        let mut store = ConfigStore::new();
        for file in &files {
            let parsed = Self::load_yaml::<ConfigFile>(file)?;
            Self::register(&mut store, file, parsed)?;
        }

        info!(
            directory = %dir_str,
            files = files.len(),
            configurations = store.len(),
            "Loaded engine configuration"
        );

        Ok(Self { store, files })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|e| EngineError::ConfigParseError {
            path: path_str.clone(),
            message: e.to_string(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    fn register(store: &mut ConfigStore, file: &Path, parsed: ConfigFile) -> EngineResult<()> {
        let path_str = file.display().to_string();
        let wrap = |err: EngineError| EngineError::ConfigParseError {
            path: path_str.clone(),
            message: err.to_string(),
        };

        for entry in parsed.configurations {
            let id = store
                .add_configuration(&entry.module, &entry.key, entry.value_type)
                .map_err(wrap)?;
            for setting in entry.settings {
                store
                    .add_setting(
                        &id,
                        setting.context_key.as_deref(),
                        setting.value,
                        setting.effective_from,
                        setting.effective_to,
                        setting.is_active,
                    )
                    .map_err(wrap)?;
            }
        }
        Ok(())
    }

    /// Returns the loaded store.
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Consumes the loader, returning the store.
    pub fn into_store(self) -> ConfigStore {
        self.store
    }

    /// Files that were read, in load order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigResolver;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn config_path() -> &'static str {
        "./config/default"
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("compensation-config-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_load_valid_configuration() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let loader = result.unwrap();
        assert_eq!(loader.files().len(), 4);
        assert!(!loader.store().is_empty());
    }

    #[test]
    fn test_statutory_settings_resolve() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let value = loader
            .store()
            .resolve("payroll", "statutory", None, date(2025, 8, 1))
            .unwrap()
            .to_json();
        assert_eq!(value["esic_gross_limit"], "21000");
        assert_eq!(value["pf_wage_ceiling"], "15000");
    }

    #[test]
    fn test_calendar_settings_have_fy_context() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let value = loader
            .store()
            .resolve("leave", "calendar_settings", Some("2025-2026"), date(2025, 8, 1))
            .unwrap()
            .to_json();
        assert_eq!(value["joining_cutoff_day"], 15);
    }

    #[test]
    fn test_batch_settings_are_json() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let value = loader
            .store()
            .resolve("engine", "batch", None, date(2025, 8, 1))
            .unwrap();
        assert!(matches!(value, crate::config::ConfigValue::Json(_)));
    }

    #[test]
    fn test_load_missing_directory_returns_error() {
        let result = ConfigLoader::load("/nonexistent/path");
        match result {
            Err(EngineError::ConfigDirectoryNotFound { path }) => {
                assert!(path.contains("/nonexistent/path"));
            }
            other => panic!("Expected ConfigDirectoryNotFound error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_empty_directory_returns_error() {
        let dir = temp_dir("empty");
        let result = ConfigLoader::load(&dir);
        assert!(matches!(
            result,
            Err(EngineError::ConfigDirectoryNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let dir = temp_dir("invalid");
        fs::write(dir.join("broken.yaml"), "configurations: [ {module: ").unwrap();
        match ConfigLoader::load(&dir) {
            Err(EngineError::ConfigParseError { path, .. }) => {
                assert!(path.ends_with("broken.yaml"));
            }
            other => panic!("Expected ConfigParseError, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_type_mismatch_is_parse_error() {
        let dir = temp_dir("mismatch");
        fs::write(
            dir.join("payroll.yaml"),
            r#"
configurations:
  - module: payroll
    key: esic_limit
    value_type: number
    settings:
      - value: "not a number"
"#,
        )
        .unwrap();
        match ConfigLoader::load(&dir) {
            Err(EngineError::ConfigParseError { message, .. }) => {
                assert!(message.contains("payroll/esic_limit"));
            }
            other => panic!("Expected ConfigParseError, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_overlapping_windows_rejected() {
        let dir = temp_dir("overlap");
        fs::write(
            dir.join("payroll.yaml"),
            r#"
configurations:
  - module: payroll
    key: esic_limit
    value_type: number
    settings:
      - value: 15000
        effective_from: 2015-01-01
      - value: 21000
        effective_from: 2017-01-01
"#,
        )
        .unwrap();
        assert!(matches!(
            ConfigLoader::load(&dir),
            Err(EngineError::ConfigParseError { .. })
        ));
    }

    #[test]
    fn test_windowed_settings_load() {
        let dir = temp_dir("windowed");
        fs::write(
            dir.join("payroll.yaml"),
            r#"
configurations:
  - module: payroll
    key: esic_limit
    value_type: number
    settings:
      - value: 15000
        effective_from: 2015-01-01
        effective_to: 2016-12-31
      - value: "21000"
        effective_from: 2017-01-01
"#,
        )
        .unwrap();
        let loader = ConfigLoader::load(&dir).unwrap();
        let value = loader
            .store()
            .resolve("payroll", "esic_limit", None, date(2016, 2, 1))
            .unwrap();
        assert_eq!(value.as_decimal(), Some(dec("15000")));
    }
}
