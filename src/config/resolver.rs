//! Configuration resolution.
//!
//! [`ConfigResolver`] is the single seam through which calculators obtain
//! business parameters. [`ConfigStore`] is the in-memory implementation the
//! loader produces.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

use super::types::{ConfigSetting, ConfigValue, Configuration, ValueType};

/// Resolves a module-scoped parameter for a context and date.
pub trait ConfigResolver: Send + Sync {
    /// Returns the value of `module/key` for `context_key` on `as_of`.
    ///
    /// Fails with [`EngineError::ConfigNotFound`] when no configuration row
    /// exists and [`EngineError::ConfigSettingNotFound`] when none of its
    /// settings is active on `as_of`.
    fn resolve(
        &self,
        module: &str,
        key: &str,
        context_key: Option<&str>,
        as_of: NaiveDate,
    ) -> EngineResult<ConfigValue>;
}

/// Resolves `module/key` and deserializes the payload into `T`.
pub fn resolve_typed<T: DeserializeOwned>(
    resolver: &dyn ConfigResolver,
    module: &str,
    key: &str,
    context_key: Option<&str>,
    as_of: NaiveDate,
) -> EngineResult<T> {
    let value = resolver.resolve(module, key, context_key, as_of)?;
    let expected = value.value_type();
    serde_json::from_value(value.to_json()).map_err(|e| EngineError::ConfigValueMismatch {
        module: module.to_string(),
        key: key.to_string(),
        expected: expected.to_string(),
        message: e.to_string(),
    })
}

/// In-memory configuration store.
///
/// # Example
///
/// ```
/// use compensation_engine::config::{ConfigResolver, ConfigStore, ConfigValue, ValueType};
/// use chrono::NaiveDate;
///
/// let mut store = ConfigStore::new();
/// let id = store.add_configuration("payroll", "esic_limit", ValueType::Number).unwrap();
/// store
///     .add_setting(&id, None, serde_json::json!(21000), None, None, true)
///     .unwrap();
///
/// let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
/// let value = store.resolve("payroll", "esic_limit", None, today).unwrap();
/// assert_eq!(value.as_decimal().unwrap().to_string(), "21000");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    configurations: HashMap<(String, String), Configuration>,
    settings: HashMap<String, Vec<ConfigSetting>>,
}

impl ConfigStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a configuration and returns its id. Re-registering the same
    /// module/key with the same type returns the existing id.
    pub fn add_configuration(
        &mut self,
        module: &str,
        key: &str,
        value_type: ValueType,
    ) -> EngineResult<String> {
        let id_key = (module.to_string(), key.to_string());
        if let Some(existing) = self.configurations.get(&id_key) {
            if existing.value_type != value_type {
                return Err(EngineError::ConfigValueMismatch {
                    module: module.to_string(),
                    key: key.to_string(),
                    expected: existing.value_type.to_string(),
                    message: format!("re-declared as {}", value_type),
                });
            }
            return Ok(existing.id.clone());
        }
        let configuration = Configuration {
            id: Uuid::new_v4().to_string(),
            module: module.to_string(),
            key: key.to_string(),
            value_type,
            description: None,
        };
        let id = configuration.id.clone();
        self.configurations.insert(id_key, configuration);
        Ok(id)
    }

    /// Adds a setting after validating its value and the one-active-setting
    /// invariant for its (configuration, context key).
    pub fn add_setting(
        &mut self,
        config_id: &str,
        context_key: Option<&str>,
        raw: serde_json::Value,
        effective_from: Option<NaiveDate>,
        effective_to: Option<NaiveDate>,
        is_active: bool,
    ) -> EngineResult<()> {
        let configuration = self
            .configurations
            .values()
            .find(|c| c.id == config_id)
            .ok_or_else(|| EngineError::invalid_input("config_id", format!("unknown {}", config_id)))?;

        let value = ConfigValue::from_raw(configuration.value_type, raw).map_err(|message| {
            EngineError::ConfigValueMismatch {
                module: configuration.module.clone(),
                key: configuration.key.clone(),
                expected: configuration.value_type.to_string(),
                message,
            }
        })?;

        if let (Some(from), Some(to)) = (effective_from, effective_to) {
            if from > to {
                return Err(EngineError::invalid_input(
                    "effective_to",
                    format!("{} is before effective_from {}", to, from),
                ));
            }
        }

        let setting = ConfigSetting {
            config_id: config_id.to_string(),
            context_key: context_key.map(str::to_string),
            value,
            effective_from,
            effective_to,
            is_active,
        };

        let existing = self.settings.entry(config_id.to_string()).or_default();
        if existing
            .iter()
            .any(|s| s.context_key == setting.context_key && s.overlaps(&setting))
        {
            return Err(EngineError::invalid_input(
                "effective_from",
                format!(
                    "overlapping active setting for {}/{} (context: {})",
                    configuration.module,
                    configuration.key,
                    context_key.unwrap_or("-")
                ),
            ));
        }
        existing.push(setting);
        Ok(())
    }

    /// Number of configurations registered.
    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    fn pick<'a>(
        settings: &'a [ConfigSetting],
        context_key: Option<&str>,
        as_of: NaiveDate,
    ) -> Option<&'a ConfigSetting> {
        settings
            .iter()
            .filter(|s| s.is_active && s.context_key.as_deref() == context_key && s.window_contains(as_of))
            .max_by_key(|s| s.effective_from)
    }
}

impl ConfigResolver for ConfigStore {
    fn resolve(
        &self,
        module: &str,
        key: &str,
        context_key: Option<&str>,
        as_of: NaiveDate,
    ) -> EngineResult<ConfigValue> {
        let configuration = self
            .configurations
            .get(&(module.to_string(), key.to_string()))
            .ok_or_else(|| EngineError::ConfigNotFound {
                module: module.to_string(),
                key: key.to_string(),
            })?;

        let settings = self
            .settings
            .get(&configuration.id)
            .map(Vec::as_slice)
            .unwrap_or_default();

        // A context-specific value wins; the context-free value is the fallback.
        let chosen = Self::pick(settings, context_key, as_of).or_else(|| {
            context_key.and_then(|_| Self::pick(settings, None, as_of))
        });

        match chosen {
            Some(setting) => {
                debug!(
                    module,
                    key,
                    context_key = setting.context_key.as_deref().unwrap_or("-"),
                    %as_of,
                    "Resolved configuration"
                );
                Ok(setting.value.clone())
            }
            None => Err(EngineError::ConfigSettingNotFound {
                module: module.to_string(),
                key: key.to_string(),
                context_key: context_key.map(str::to_string),
            }),
        }
    }
}
