use thiserror::Error;

use crate::{ErrorKind, StatusCode};

/// Ошибки загрузки и проверки настроек.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// Ёмкость очереди или канала вне допустимого диапазона.
    #[error("{field} must be between 1 and {max}, got {value}")]
    InvalidCapacity {
        field: &'static str,
        value: usize,
        max: usize,
    },

    /// Значение не удалось принять.
    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },

    /// Ошибка источника конфигурации (файл, окружение, десериализация).
    #[error("failed to load settings: {reason}")]
    Load { reason: String },
}

impl ErrorKind for SettingsError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCapacity { .. } | Self::InvalidValue { .. } => StatusCode::InvalidConfig,
            Self::Load { .. } => StatusCode::ConfigLoadFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_capacity_message() {
        let err = SettingsError::InvalidCapacity {
            field: "ingress_capacity",
            value: 0,
            max: 8,
        };
        assert_eq!(err.to_string(), "ingress_capacity must be between 1 and 8, got 0");
        assert_eq!(err.status_code(), StatusCode::InvalidConfig);
    }

    #[test]
    fn test_load_is_config_load_failed() {
        let err = SettingsError::Load {
            reason: "missing".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::ConfigLoadFailed);
    }
}
