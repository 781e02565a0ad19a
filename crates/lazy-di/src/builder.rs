//! Builder для создания корневого контейнера
//!
//! Fluent-интерфейс поверх `DiConfig`: настройки можно задать кодом,
//! загрузить из файла (`DiConfig::from_toml_file`) или комбинировать.

use crate::config::DiConfig;
use crate::container::DiContainer;
use crate::errors::DiError;

/// Builder корневого DI контейнера
pub struct ContainerBuilder {
    config: DiConfig,
}

impl ContainerBuilder {
    /// Создать builder с настройками по умолчанию
    pub fn new() -> Self {
        Self {
            config: DiConfig::default(),
        }
    }

    /// Начать с готовой конфигурации (например, загруженной из TOML)
    pub fn from_config(config: DiConfig) -> Self {
        Self { config }
    }

    /// Задать имя контейнера
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Задать предел глубины рекурсивного разрешения
    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.config.max_resolution_depth = depth;
        self
    }

    /// Включить/выключить журналирование каждого разрешения
    pub fn with_resolution_tracing(mut self, enabled: bool) -> Self {
        self.config.trace_resolutions = enabled;
        self
    }

    /// Провалидировать конфигурацию и построить контейнер
    pub fn build(self) -> Result<DiContainer, DiError> {
        self.config.validate()?;
        Ok(DiContainer::from_config(self.config))
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
