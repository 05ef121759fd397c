use std::{path::Path, time::Duration};

use config::{Config, ConfigError, Environment, File};
use fanout_error::{FanoutResult, SettingsError, StackError};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::{
    dispatch::{
        DeliveryMode, DispatcherConfig, DEFAULT_INGRESS_CAPACITY, DEFAULT_SUBSCRIBER_CAPACITY,
    },
    logging::LoggingConfig,
};

/// Префикс переменных окружения: `FANOUT_DISPATCHER__INGRESS_CAPACITY=1024`.
pub const ENV_PREFIX: &str = "FANOUT";

const DEFAULT_DELIVERY_TIMEOUT_MS: u64 = 1000;

/// Политика доставки в текстовой конфигурации.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryPolicy {
    #[default]
    Blocking,
    DropOnFull,
    Timeout,
}

/// Раздел `dispatcher`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherSettings {
    pub ingress_capacity: usize,
    pub subscriber_capacity: usize,
    pub delivery: DeliveryPolicy,
    /// Используется только при `delivery = timeout`
    pub delivery_timeout_ms: u64,
}

impl DispatcherSettings {
    pub fn delivery_mode(&self) -> DeliveryMode {
        match self.delivery {
            DeliveryPolicy::Blocking => DeliveryMode::Blocking,
            DeliveryPolicy::DropOnFull => DeliveryMode::DropOnFull,
            DeliveryPolicy::Timeout => {
                DeliveryMode::Timeout(Duration::from_millis(self.delivery_timeout_ms))
            }
        }
    }
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            ingress_capacity: DEFAULT_INGRESS_CAPACITY,
            subscriber_capacity: DEFAULT_SUBSCRIBER_CAPACITY,
            delivery: DeliveryPolicy::Blocking,
            delivery_timeout_ms: DEFAULT_DELIVERY_TIMEOUT_MS,
        }
    }
}

/// Настройки процесса.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dispatcher: DispatcherSettings,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Загружает настройки из значений по умолчанию и окружения.
    pub fn load() -> FanoutResult<Self> {
        Self::load_from(None)
    }

    /// Источники по возрастанию приоритета: значения по умолчанию, файл
    /// (формат по расширению), переменные окружения `FANOUT_*`.
    pub fn load_from(path: Option<&Path>) -> FanoutResult<Self> {
        let mut builder = Config::builder()
            .set_default("dispatcher.ingress_capacity", DEFAULT_INGRESS_CAPACITY as u64)
            .map_err(load_error)?
            .set_default(
                "dispatcher.subscriber_capacity",
                DEFAULT_SUBSCRIBER_CAPACITY as u64,
            )
            .map_err(load_error)?
            .set_default("dispatcher.delivery", DeliveryPolicy::Blocking.to_string())
            .map_err(load_error)?
            .set_default("dispatcher.delivery_timeout_ms", DEFAULT_DELIVERY_TIMEOUT_MS)
            .map_err(load_error)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let cfg = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|err| match path {
                Some(path) => load_error(err).context(format!("loading {}", path.display())),
                None => load_error(err),
            })?;

        cfg.try_deserialize().map_err(load_error)
    }

    /// Проверенная конфигурация диспетчера.
    pub fn dispatcher_config(&self) -> FanoutResult<DispatcherConfig> {
        let config = DispatcherConfig {
            ingress_capacity: self.dispatcher.ingress_capacity,
            subscriber_capacity: self.dispatcher.subscriber_capacity,
            delivery: self.dispatcher.delivery_mode(),
        };
        config
            .validate()
            .map_err(|err| err.context("dispatcher settings"))?;
        Ok(config)
    }
}

fn load_error(err: ConfigError) -> StackError {
    SettingsError::Load {
        reason: err.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use std::{env, io::Write};

    use fanout_error::StatusCode;
    use serial_test::serial;

    use super::*;
    use crate::logging::LogFormat;

    fn clear_env() {
        for (key, _) in env::vars() {
            if key.starts_with("FANOUT_") {
                env::remove_var(key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let settings = Settings::load().unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(
            settings.dispatcher_config().unwrap(),
            DispatcherConfig::default()
        );
    }

    /// Тест проверяет, что переменные окружения перекрывают файл.
    #[test]
    #[serial]
    fn test_file_then_env() {
        clear_env();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[dispatcher]
ingress_capacity = 16
delivery = "drop_on_full"

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        env::set_var("FANOUT_DISPATCHER__INGRESS_CAPACITY", "32");
        let settings = Settings::load_from(Some(file.path()));
        clear_env();
        let settings = settings.unwrap();

        assert_eq!(settings.dispatcher.ingress_capacity, 32);
        assert_eq!(settings.dispatcher.delivery, DeliveryPolicy::DropOnFull);
        assert_eq!(settings.dispatcher.subscriber_capacity, DEFAULT_SUBSCRIBER_CAPACITY);
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    #[serial]
    fn test_timeout_policy() {
        clear_env();
        env::set_var("FANOUT_DISPATCHER__DELIVERY", "timeout");
        env::set_var("FANOUT_DISPATCHER__DELIVERY_TIMEOUT_MS", "250");
        let settings = Settings::load();
        clear_env();

        let config = settings.unwrap().dispatcher_config().unwrap();
        assert_eq!(
            config.delivery,
            DeliveryMode::Timeout(Duration::from_millis(250))
        );
    }

    /// Тест проверяет, что нулевая ёмкость отклоняется при преобразовании.
    #[test]
    #[serial]
    fn test_zero_capacity_rejected() {
        clear_env();
        env::set_var("FANOUT_DISPATCHER__SUBSCRIBER_CAPACITY", "0");
        let settings = Settings::load();
        clear_env();

        let err = settings.unwrap().dispatcher_config().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidConfig);
        assert!(err
            .to_string()
            .starts_with("dispatcher settings: subscriber_capacity must be between 1 and"));
    }

    #[test]
    #[serial]
    fn test_unknown_policy_fails_to_load() {
        clear_env();
        env::set_var("FANOUT_DISPATCHER__DELIVERY", "sometimes");
        let settings = Settings::load();
        clear_env();

        assert_eq!(
            settings.unwrap_err().status_code(),
            StatusCode::ConfigLoadFailed
        );
    }

    #[test]
    #[serial]
    fn test_missing_file_fails_to_load() {
        clear_env();
        let err = Settings::load_from(Some(Path::new("/nonexistent/fanout.toml"))).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::ConfigLoadFailed);
        assert_eq!(err.contexts().len(), 1);
        assert!(err.to_string().starts_with("loading /nonexistent/fanout.toml: "));
    }
}
