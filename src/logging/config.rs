use std::path::PathBuf;

use fanout_error::{ensure, FanoutResult, SettingsError};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Формат вывода событий.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    #[default]
    Compact,
}

/// Файловый sink: ежедневная ротация в `dir/prefix.YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSinkConfig {
    pub dir: PathBuf,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

/// Конфигурация логирования.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Директива фильтра: уровень (`info`) или полная директива
    /// (`fanout=debug,tokio=warn`). `RUST_LOG` имеет приоритет.
    pub level: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
    /// Если задан, события дублируются в файл
    pub file: Option<FileSinkConfig>,
}

impl LoggingConfig {
    pub fn with_level(
        mut self,
        level: impl Into<String>,
    ) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_format(
        mut self,
        format: LogFormat,
    ) -> Self {
        self.format = format;
        self
    }

    pub fn with_file(
        mut self,
        dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
    ) -> Self {
        self.file = Some(FileSinkConfig {
            dir: dir.into(),
            prefix: prefix.into(),
        });
        self
    }

    /// Директива для `EnvFilter`; пустой уровень означает `info`.
    pub fn build_filter_directive(&self) -> String {
        match self.level.trim() {
            "" => "info".to_string(),
            level => level.to_string(),
        }
    }

    pub fn validate(&self) -> FanoutResult<()> {
        if let Some(file) = &self.file {
            ensure!(
                !file.prefix.trim().is_empty(),
                SettingsError::InvalidValue {
                    field: "logging.file.prefix",
                    value: file.prefix.clone(),
                }
            );
            ensure!(
                !file.dir.as_os_str().is_empty(),
                SettingsError::InvalidValue {
                    field: "logging.file.dir",
                    value: String::new(),
                }
            );
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
            file: None,
        }
    }
}

fn default_prefix() -> String {
    "fanout.log".to_string()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use fanout_error::StatusCode;

    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(LoggingConfig::default().build_filter_directive(), "info");
        assert_eq!(
            LoggingConfig::default().with_level("  ").build_filter_directive(),
            "info"
        );
        assert_eq!(
            LoggingConfig::default()
                .with_level("fanout=debug,tokio=warn")
                .build_filter_directive(),
            "fanout=debug,tokio=warn"
        );
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(LogFormat::from_str("json").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::Pretty.to_string(), "pretty");
        assert!(LogFormat::from_str("xml").is_err());
    }

    /// Тест проверяет, что пустой префикс файла отклоняется.
    #[test]
    fn test_empty_file_prefix_rejected() {
        let config = LoggingConfig::default().with_file("logs", "");
        let err = config.validate().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidConfig);
        assert!(LoggingConfig::default().with_file("logs", "app.log").validate().is_ok());
    }
}
