//! Registration Adapter — интеграция lazy-движка с контейнером
//!
//! Единственная точка входа расширения: `register_lazy`. Делает две
//! регистрации:
//!
//! 1. скрытый ключ — реальная factory реализации, имя и lifetime проходят
//!    в контейнер нетронутыми;
//! 2. публичный ключ — transient factory, которая на КАЖДОЕ разрешение
//!    создаёт новый proxy с `DeferredResolver`, привязанным к контейнеру,
//!    выполняющему именно это разрешение. Поэтому proxy, полученный из
//!    дочернего scope, видит переопределения потомка, а lifetime скрытой
//!    регистрации решает, сойдутся ли proxy на одном реальном экземпляре.
//!
//! Разрешение публичного ключа не падает, даже если граф реальных
//! зависимостей сломан: ошибка поднимется при первом обращении к члену.
//! Это позволяет структурно разрешать циклические и порядко-чувствительные
//! lazy-графы до какого-либо построения.

use std::sync::Arc;

use tracing::debug;

use crate::container::{DiContainer, ServiceKey};
use crate::contract::LazyContract;
use crate::deferred::DeferredResolver;
use crate::errors::DiError;
use crate::lifetime::Lifetime;

impl DiContainer {
    /// Зарегистрировать реализацию контракта с отложенным построением.
    ///
    /// Валидация контракта (чистый интерфейс, trust grant для ограниченной
    /// видимости) выполняется ЗДЕСЬ, до записи каких-либо регистраций.
    /// Возвращает контейнер для чейнинга дальнейших регистраций.
    pub fn register_lazy<C, F>(
        &self,
        name: Option<&str>,
        lifetime: Lifetime,
        construct: F,
    ) -> Result<&Self, DiError>
    where
        C: LazyContract + ?Sized,
        F: Fn(&DiContainer) -> Result<Arc<C>, DiError> + Send + Sync + 'static,
    {
        self.synthesizer().ensure_blueprint::<C>()?;

        self.register_key::<Arc<C>, _>(ServiceKey::hidden::<Arc<C>>(name), lifetime, construct)?;

        let hidden_name: Option<String> = name.map(str::to_string);
        self.register_key::<Arc<C>, _>(
            ServiceKey::of::<Arc<C>>(name),
            Lifetime::Transient,
            move |scope: &DiContainer| {
                let bound_scope = scope.clone();
                let key_name = hidden_name.clone();
                let target = DeferredResolver::new(move || {
                    bound_scope
                        .resolve_handle::<Arc<C>>(ServiceKey::hidden::<Arc<C>>(key_name.as_deref()))
                });
                scope.synthesizer().synthesize::<C>(target)
            },
        )?;

        debug!(
            "🧩 Lazy contract '{}' registered in scope '{}' with {:?} lifetime",
            C::descriptor().name,
            self.name(),
            lifetime
        );
        Ok(self)
    }
}
