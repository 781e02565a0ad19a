//! Error handling для lazy-di
//!
//! Unified error handling для контейнера и движка отложенных proxy.
//! Все операции возвращают `Result<T, DiError>` вместо panic.
//!
//! # АРХИТЕКТУРА ОШИБОК
//!
//! Два семейства, с разной политикой восстановления:
//!
//! - **Configuration** (`UnsupportedContract`, `InvalidContract`,
//!   `InaccessibleContract`, `Configuration`) — ошибка настройки.
//!   Поднимается синхронно при регистрации или синтезе proxy и не
//!   восстанавливается: это ошибка программиста.
//! - **Resolution** (`NotRegistered`, `ResolutionFailed`, `TypeMismatch`,
//!   `DepthExceeded`) — scope не может удовлетворить зависимость.
//!   Поднимается при первом обращении к члену proxy, никогда не кэшируется
//!   и может быть повторена (например, из дочернего scope).
//!
//! Ошибки реализации контракта (forwarded failures) не представлены здесь:
//! они проходят через proxy без изменений, в типе ошибки самого контракта.
//!
//! Все варианты конвертируются в `anyhow::Error` через `std::error::Error`
//! для application-level композиции.

use thiserror::Error;

/// Основной error type для всех операций контейнера и lazy-движка
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiError {
    /// Контракт не является чистым интерфейсом
    #[error("Contract '{contract}' is not an interface: {reason}")]
    UnsupportedContract { contract: String, reason: String },

    /// Член контракта имеет форму, которую forwarder не может выразить
    #[error("Contract '{contract}' has an invalid member '{member}': {reason}")]
    InvalidContract {
        contract: String,
        member: String,
        reason: String,
    },

    /// Контракт с ограниченной видимостью без явного trust grant
    #[error("Contract '{contract}' declared in module '{module}' is not accessible for proxy synthesis; grant access to the defining module first")]
    InaccessibleContract { contract: String, module: String },

    /// Ошибка конфигурации контейнера
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Ключ сервиса не зарегистрирован в адресуемом scope (и его предках)
    #[error("Service {key} is not registered in scope '{scope}'")]
    NotRegistered { key: String, scope: String },

    /// Factory сервиса не смогла построить экземпляр
    #[error("Resolution of {type_name} failed: {message}")]
    ResolutionFailed { type_name: String, message: String },

    /// Зарегистрированный сервис имеет другой тип, чем запрошенный
    #[error("Type mismatch resolving {type_name}: registered service has a different type")]
    TypeMismatch { type_name: String },

    /// Превышена глубина рекурсивного разрешения (вероятный цикл конструкторов)
    #[error("Resolution depth {depth} exceeds limit {limit} while resolving {type_name}")]
    DepthExceeded {
        type_name: String,
        depth: usize,
        limit: usize,
    },
}

impl DiError {
    /// Создать Configuration ошибку
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Создать ResolutionFailed для factory, упавшей с доменной ошибкой
    pub fn resolution(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ResolutionFailed {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Ошибка настройки: регистрация/синтез обязаны прерваться, retry бессмысленен
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedContract { .. }
                | Self::InvalidContract { .. }
                | Self::InaccessibleContract { .. }
                | Self::Configuration { .. }
        )
    }

    /// Ошибка разрешения: не кэшируется, повторная попытка допустима
    pub fn is_resolution(&self) -> bool {
        !self.is_configuration()
    }
}
