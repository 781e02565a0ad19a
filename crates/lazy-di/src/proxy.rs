//! Proxy Synthesizer — синтез forwarding-объектов по blueprint контракта
//!
//! Сам forwarding-тип генерируется на этапе компиляции (макрос
//! [`lazy_contract!`] либо рукописный adapter) — runtime-часть синтеза
//! отвечает за то, что в C#-подобных контейнерах делает reflection:
//!
//! - валидация дескриптора контракта (чистый интерфейс, формы членов);
//! - проверка trust grants для контрактов ограниченной видимости;
//! - blueprint cache: контракт валидируется один раз, дальше переиспользуется.
//!
//! Синтез никогда не инспектирует тип реализации — только форму контракта.
//!
//! [`lazy_contract!`]: crate::lazy_contract

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::contract::{ContractInspector, LazyContract};
use crate::deferred::DeferredResolver;
use crate::errors::DiError;

/// Runtime-синтезатор proxy: blueprint cache + trust grants
pub struct ProxySynthesizer {
    /// Контракты, прошедшие валидацию (TypeId контракта -> имя)
    validated: RwLock<HashMap<TypeId, &'static str>>,
    /// Модули, которым выдан доступ к контрактам ограниченной видимости
    trusted_modules: RwLock<HashSet<String>>,
}

impl ProxySynthesizer {
    pub fn new() -> Self {
        Self {
            validated: RwLock::new(HashMap::new()),
            trusted_modules: RwLock::new(HashSet::new()),
        }
    }

    /// Выдать явный trust grant на модуль, объявляющий контракты
    pub fn trust_module(&self, module_path: &str) {
        debug!("🔓 Trust grant for module '{module_path}'");
        self.trusted_modules.write().insert(module_path.to_string());
    }

    pub fn is_trusted(&self, module_path: &str) -> bool {
        self.trusted_modules.read().contains(module_path)
    }

    /// Провалидировать blueprint контракта (один раз, далее из кэша).
    ///
    /// Ошибки конфигурации поднимаются здесь — синхронно, при регистрации
    /// или синтезе, никогда не откладываются до первого обращения.
    pub fn ensure_blueprint<C>(&self) -> Result<(), DiError>
    where
        C: LazyContract + ?Sized,
    {
        let contract_id = TypeId::of::<C>();
        if self.validated.read().contains_key(&contract_id) {
            return Ok(());
        }

        let descriptor = C::descriptor();
        ContractInspector::ensure_interface(descriptor)?;
        ContractInspector::ensure_accessible(descriptor, &self.trusted_modules.read())?;

        self.validated.write().insert(contract_id, descriptor.name);
        debug!(
            "✅ Blueprint validated for contract '{}' ({} members)",
            descriptor.name,
            descriptor.members.len()
        );
        Ok(())
    }

    /// Создать Proxy Instance, привязанный к данному Deferred Resolver
    pub fn synthesize<C>(&self, target: DeferredResolver<C>) -> Result<Arc<C>, DiError>
    where
        C: LazyContract + ?Sized,
    {
        self.ensure_blueprint::<C>()?;
        Ok(C::synthesize(target))
    }

    /// Имена провалидированных контрактов (для диагностики)
    pub fn validated_contracts(&self) -> Vec<&'static str> {
        self.validated.read().values().copied().collect()
    }
}

impl Default for ProxySynthesizer {
    fn default() -> Self {
        Self::new()
    }
}
