//! DI контейнер — registration table, name-based lookup, иерархия scope
//!
//! Контейнер отвечает только за регистрацию и разрешение зависимостей;
//! жизненный цикл делегирован `LifetimeStore`, синтез proxy —
//! `ProxySynthesizer`.
//!
//! Handle контейнера дёшев (`Arc` внутри): клоны разделяют одно состояние.
//! Дочерний scope создаётся через `child()`; поиск регистрации идёт вверх
//! по цепочке родителей, ближайшая регистрация выигрывает. Factory всегда
//! получает РАЗРЕШАЮЩИЙ контейнер, поэтому переопределения дочернего scope
//! участвуют в построении зависимостей.

use std::any::{Any, TypeId};
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::DiConfig;
use crate::errors::DiError;
use crate::lifetime::{BoxedService, CacheStats, Lifetime, LifetimeStore};
use crate::proxy::ProxySynthesizer;

/// Половина ключа: публичная (то, что запрашивают вызывающие) или скрытая
/// (реальная регистрация lazy-контракта)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Realm {
    Public,
    Hidden,
}

/// Ключ регистрации: тип service handle + опциональное имя + realm
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    type_id: TypeId,
    type_name: &'static str,
    name: Option<String>,
    realm: Realm,
}

impl ServiceKey {
    /// Публичный ключ для handle-типа `S` (`Arc<T>` или `Arc<dyn C>`)
    pub fn of<S: 'static>(name: Option<&str>) -> Self {
        Self {
            type_id: TypeId::of::<S>(),
            type_name: std::any::type_name::<S>(),
            name: name.map(str::to_string),
            realm: Realm::Public,
        }
    }

    /// Скрытый ключ той же пары тип/имя
    pub fn hidden<S: 'static>(name: Option<&str>) -> Self {
        Self {
            realm: Realm::Hidden,
            ..Self::of::<S>(name)
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn realm(&self) -> Realm {
        self.realm
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)?;
        if let Some(name) = &self.name {
            write!(f, " (name: \"{name}\")")?;
        }
        if self.realm == Realm::Hidden {
            write!(f, " [hidden]")?;
        }
        Ok(())
    }
}

/// Factory функция для создания service handle
pub(crate) type ServiceFactory =
    Arc<dyn Fn(&DiContainer) -> Result<BoxedService, DiError> + Send + Sync>;

struct Registration {
    factory: ServiceFactory,
    lifetime: Lifetime,
}

struct ContainerInner {
    name: String,
    parent: Option<DiContainer>,
    registrations: RwLock<HashMap<ServiceKey, Registration>>,
    lifetimes: LifetimeStore,
    synthesizer: Arc<ProxySynthesizer>,
    max_depth: usize,
    trace_resolutions: bool,
    total_resolutions: AtomicU64,
    failed_resolutions: AtomicU64,
}

/// Статистика контейнера для диагностики
#[derive(Debug, Clone)]
pub struct ContainerStats {
    pub name: String,
    pub registered_services: usize,
    pub total_resolutions: u64,
    pub failed_resolutions: u64,
    pub cached_singletons: usize,
    pub cache: CacheStats,
}

/// DI контейнер (resolution scope)
#[derive(Clone)]
pub struct DiContainer {
    inner: Arc<ContainerInner>,
}

thread_local! {
    static RESOLUTION_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// RAII guard глубины рекурсивного разрешения на текущем потоке
struct DepthGuard;

impl DepthGuard {
    fn enter(limit: usize, type_name: &str) -> Result<Self, DiError> {
        RESOLUTION_DEPTH.with(|depth| {
            let next = depth.get() + 1;
            if next > limit {
                return Err(DiError::DepthExceeded {
                    type_name: type_name.to_string(),
                    depth: next,
                    limit,
                });
            }
            depth.set(next);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        RESOLUTION_DEPTH.with(|depth| depth.set(depth.get() - 1));
    }
}

impl DiContainer {
    /// Создать корневой контейнер с настройками по умолчанию
    pub fn new(name: impl Into<String>) -> Self {
        let mut config = DiConfig::default();
        config.name = name.into();
        Self::from_config(config)
    }

    pub(crate) fn from_config(config: DiConfig) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                name: config.name,
                parent: None,
                registrations: RwLock::new(HashMap::new()),
                lifetimes: LifetimeStore::new(),
                synthesizer: Arc::new(ProxySynthesizer::new()),
                max_depth: config.max_resolution_depth,
                trace_resolutions: config.trace_resolutions,
                total_resolutions: AtomicU64::new(0),
                failed_resolutions: AtomicU64::new(0),
            }),
        }
    }

    /// Создать дочерний scope.
    ///
    /// Потомок видит регистрации предков, может их переопределять и
    /// разделяет с ними synthesizer (blueprint cache и trust grants).
    pub fn child(&self, name: impl Into<String>) -> Self {
        let name = name.into();
        debug!("Creating child scope '{}' of '{}'", name, self.name());
        Self {
            inner: Arc::new(ContainerInner {
                name,
                parent: Some(self.clone()),
                registrations: RwLock::new(HashMap::new()),
                lifetimes: LifetimeStore::new(),
                synthesizer: Arc::clone(&self.inner.synthesizer),
                max_depth: self.inner.max_depth,
                trace_resolutions: self.inner.trace_resolutions,
                total_resolutions: AtomicU64::new(0),
                failed_resolutions: AtomicU64::new(0),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn synthesizer(&self) -> &Arc<ProxySynthesizer> {
        &self.inner.synthesizer
    }

    /// Выдать trust grant на модуль с контрактами ограниченной видимости
    pub fn grant_contract_access(&self, module_path: &str) -> &Self {
        self.inner.synthesizer.trust_module(module_path);
        self
    }

    /// Зарегистрировать компонент с factory функцией.
    ///
    /// Повторная регистрация того же ключа перезаписывает предыдущую
    /// (и сбрасывает её кэшированные экземпляры).
    pub fn register<T, F>(
        &self,
        name: Option<&str>,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<&Self, DiError>
    where
        T: Any + Send + Sync + 'static,
        F: Fn(&DiContainer) -> Result<T, DiError> + Send + Sync + 'static,
    {
        self.register_key::<Arc<T>, _>(ServiceKey::of::<Arc<T>>(name), lifetime, move |scope| {
            factory(scope).map(Arc::new)
        })?;
        Ok(self)
    }

    /// Зарегистрировать контракт напрямую (без отложенного proxy).
    ///
    /// Factory возвращает готовый handle `Arc<dyn C>`; построение происходит
    /// при разрешении, как у обычной регистрации. Для отложенного построения
    /// см. `register_lazy`.
    pub fn register_contract<C, F>(
        &self,
        name: Option<&str>,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<&Self, DiError>
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn(&DiContainer) -> Result<Arc<C>, DiError> + Send + Sync + 'static,
    {
        self.register_key::<Arc<C>, _>(ServiceKey::of::<Arc<C>>(name), lifetime, factory)?;
        Ok(self)
    }

    /// Зарегистрировать готовый экземпляр как singleton
    pub fn register_instance<T>(&self, instance: T) -> Result<&Self, DiError>
    where
        T: Any + Send + Sync + 'static,
    {
        let instance = Arc::new(instance);
        self.register_key::<Arc<T>, _>(
            ServiceKey::of::<Arc<T>>(None),
            Lifetime::Singleton,
            move |_| Ok(Arc::clone(&instance)),
        )?;
        Ok(self)
    }

    /// Низкоуровневая регистрация произвольного handle-типа под готовым ключом
    pub(crate) fn register_key<S, F>(
        &self,
        key: ServiceKey,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<(), DiError>
    where
        S: Any + Clone + Send + Sync + 'static,
        F: Fn(&DiContainer) -> Result<S, DiError> + Send + Sync + 'static,
    {
        let wrapped: ServiceFactory =
            Arc::new(move |scope| factory(scope).map(|service| Box::new(service) as BoxedService));

        {
            let mut registrations = self.inner.registrations.write();
            if registrations.contains_key(&key) {
                warn!(
                    "{key} is already registered in scope '{}', overwriting",
                    self.name()
                );
                self.inner.lifetimes.clear_key(&key);
            }
            registrations.insert(
                key.clone(),
                Registration {
                    factory: wrapped,
                    lifetime,
                },
            );
        }

        debug!(
            "Registered {key} with {:?} lifetime in scope '{}'",
            lifetime,
            self.name()
        );
        Ok(())
    }

    /// Разрешить зависимость
    pub fn resolve<T>(&self, name: Option<&str>) -> Result<Arc<T>, DiError>
    where
        T: Any + Send + Sync + 'static,
    {
        self.resolve_handle::<Arc<T>>(ServiceKey::of::<Arc<T>>(name))
    }

    /// Разрешить контракт (получить Proxy Instance либо прямую регистрацию)
    pub fn resolve_contract<C>(&self, name: Option<&str>) -> Result<Arc<C>, DiError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.resolve_handle::<Arc<C>>(ServiceKey::of::<Arc<C>>(name))
    }

    /// Попытаться разрешить зависимость
    pub fn try_resolve<T>(&self, name: Option<&str>) -> Option<Arc<T>>
    where
        T: Any + Send + Sync + 'static,
    {
        match self.resolve::<T>(name) {
            Ok(instance) => Some(instance),
            Err(e) => {
                debug!("Failed to resolve {}: {}", std::any::type_name::<T>(), e);
                None
            }
        }
    }

    /// Проверить, зарегистрирован ли тип в этом scope или его предках
    pub fn is_registered<T>(&self, name: Option<&str>) -> bool
    where
        T: Any + Send + Sync + 'static,
    {
        self.lookup(&ServiceKey::of::<Arc<T>>(name)).is_some()
    }

    /// Проверить, зарегистрирован ли контракт
    pub fn is_contract_registered<C>(&self, name: Option<&str>) -> bool
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.lookup(&ServiceKey::of::<Arc<C>>(name)).is_some()
    }

    /// Разрешение по готовому ключу (общий путь для public и hidden realm)
    pub(crate) fn resolve_handle<S>(&self, key: ServiceKey) -> Result<S, DiError>
    where
        S: Any + Clone + Send + Sync + 'static,
    {
        let _depth = DepthGuard::enter(self.inner.max_depth, key.type_name())?;
        self.inner.total_resolutions.fetch_add(1, Ordering::Relaxed);

        let result = self.resolve_inner::<S>(&key);
        if result.is_err() {
            self.inner.failed_resolutions.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    fn resolve_inner<S>(&self, key: &ServiceKey) -> Result<S, DiError>
    where
        S: Any + Clone + Send + Sync + 'static,
    {
        let (owner, factory, lifetime) =
            self.lookup(key).ok_or_else(|| DiError::NotRegistered {
                key: key.to_string(),
                scope: self.name().to_string(),
            })?;

        // Factory выполняется против разрешающего контейнера, не владельца
        let resolving = self.clone();
        let build = move || factory(&resolving);

        let boxed = match lifetime {
            Lifetime::Transient => {
                owner.inner.lifetimes.record_transient();
                build()?
            }
            Lifetime::Singleton => owner.inner.lifetimes.get_or_create_singleton(key, build)?,
            Lifetime::Scoped => self.inner.lifetimes.get_or_create_scoped(key, build)?,
        };

        let service = boxed
            .as_any()
            .downcast_ref::<S>()
            .cloned()
            .ok_or_else(|| DiError::TypeMismatch {
                type_name: key.type_name().to_string(),
            })?;

        if self.inner.trace_resolutions {
            debug!(
                "Resolved {key} with {:?} lifetime in scope '{}'",
                lifetime,
                self.name()
            );
        }
        Ok(service)
    }

    /// Найти регистрацию, поднимаясь по цепочке родителей
    fn lookup(&self, key: &ServiceKey) -> Option<(DiContainer, ServiceFactory, Lifetime)> {
        let mut current = Some(self.clone());
        while let Some(container) = current {
            let found = {
                let registrations = container.inner.registrations.read();
                registrations
                    .get(key)
                    .map(|reg| (Arc::clone(&reg.factory), reg.lifetime))
            };
            if let Some((factory, lifetime)) = found {
                return Some((container, factory, lifetime));
            }
            current = container.inner.parent.clone();
        }
        None
    }

    /// Очистить регистрации и кэши ЭТОГО scope (предков не трогает)
    pub fn clear(&self) {
        self.inner.registrations.write().clear();
        self.inner.lifetimes.clear();
        debug!("Scope '{}' cleared", self.name());
    }

    /// Получить статистику контейнера
    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            name: self.inner.name.clone(),
            registered_services: self.inner.registrations.read().len(),
            total_resolutions: self.inner.total_resolutions.load(Ordering::Relaxed),
            failed_resolutions: self.inner.failed_resolutions.load(Ordering::Relaxed),
            cached_singletons: self.inner.lifetimes.cached_singletons(),
            cache: self.inner.lifetimes.cache_stats(),
        }
    }
}

impl fmt::Debug for DiContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiContainer")
            .field("name", &self.inner.name)
            .field("parent", &self.inner.parent.as_ref().map(|p| p.name()))
            .field(
                "registered_services",
                &self.inner.registrations.read().len(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct TestService {
        value: i32,
    }

    #[derive(Debug)]
    struct Dependent {
        inherited: i32,
    }

    #[test]
    fn test_register_and_resolve() {
        let container = DiContainer::new("test");
        container
            .register::<TestService, _>(None, Lifetime::Singleton, |_| {
                Ok(TestService { value: 42 })
            })
            .expect("registration should succeed");

        let resolved = container
            .resolve::<TestService>(None)
            .expect("resolution should succeed");
        assert_eq!(resolved.value, 42);
    }

    #[test]
    fn test_service_not_found() {
        let container = DiContainer::new("test");
        let err = container
            .resolve::<TestService>(None)
            .expect_err("unregistered type must fail");
        match err {
            DiError::NotRegistered { scope, .. } => assert_eq!(scope, "test"),
            other => panic!("Expected NotRegistered, got {other:?}"),
        }
    }

    #[test]
    fn test_named_registrations_are_independent() {
        let container = DiContainer::new("test");
        container
            .register::<TestService, _>(None, Lifetime::Singleton, |_| Ok(TestService { value: 1 }))
            .expect("unnamed registration should succeed");
        container
            .register::<TestService, _>(Some("alt"), Lifetime::Singleton, |_| {
                Ok(TestService { value: 2 })
            })
            .expect("named registration should succeed");

        assert_eq!(
            container
                .resolve::<TestService>(None)
                .expect("unnamed resolve")
                .value,
            1
        );
        assert_eq!(
            container
                .resolve::<TestService>(Some("alt"))
                .expect("named resolve")
                .value,
            2
        );
        assert!(container.resolve::<TestService>(Some("missing")).is_err());
    }

    #[test]
    fn test_singleton_returns_same_instance() {
        let container = DiContainer::new("test");
        container
            .register::<TestService, _>(None, Lifetime::Singleton, |_| Ok(TestService { value: 7 }))
            .expect("registration should succeed");

        let first = container.resolve::<TestService>(None).expect("resolve 1");
        let second = container.resolve::<TestService>(None).expect("resolve 2");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_transient_returns_distinct_instances() {
        let container = DiContainer::new("test");
        container
            .register::<TestService, _>(None, Lifetime::Transient, |_| Ok(TestService { value: 7 }))
            .expect("registration should succeed");

        let first = container.resolve::<TestService>(None).expect("resolve 1");
        let second = container.resolve::<TestService>(None).expect("resolve 2");
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_factory_receives_resolving_container() {
        let root = DiContainer::new("root");
        root.register_instance(TestService { value: 10 })
            .expect("instance registration should succeed");
        root.register::<Dependent, _>(None, Lifetime::Transient, |scope| {
            let dep = scope.resolve::<TestService>(None)?;
            Ok(Dependent {
                inherited: dep.value,
            })
        })
        .expect("dependent registration should succeed");

        let child = root.child("child");
        child
            .register_instance(TestService { value: 20 })
            .expect("override registration should succeed");

        // Дочерний scope переопределяет зависимость внутри построения
        let from_child = child
            .resolve::<Dependent>(None)
            .expect("child resolve should succeed");
        assert_eq!(from_child.inherited, 20);

        let from_root = root
            .resolve::<Dependent>(None)
            .expect("root resolve should succeed");
        assert_eq!(from_root.inherited, 10);
    }

    #[test]
    fn test_child_falls_back_to_parent() {
        let root = DiContainer::new("root");
        root.register_instance(TestService { value: 5 })
            .expect("registration should succeed");

        let child = root.child("child");
        let resolved = child
            .resolve::<TestService>(None)
            .expect("child should see parent registration");
        assert_eq!(resolved.value, 5);
        assert!(child.is_registered::<TestService>(None));
    }

    #[test]
    fn test_singleton_shared_across_children() {
        let root = DiContainer::new("root");
        root.register::<TestService, _>(None, Lifetime::Singleton, |_| Ok(TestService { value: 3 }))
            .expect("registration should succeed");

        let a = root.child("a");
        let b = root.child("b");
        let from_a = a.resolve::<TestService>(None).expect("resolve from a");
        let from_b = b.resolve::<TestService>(None).expect("resolve from b");
        assert!(Arc::ptr_eq(&from_a, &from_b));
    }

    #[test]
    fn test_scoped_instances_are_per_scope() {
        let root = DiContainer::new("root");
        root.register::<TestService, _>(None, Lifetime::Scoped, |_| Ok(TestService { value: 3 }))
            .expect("registration should succeed");

        let a = root.child("a");
        let b = root.child("b");
        let from_a1 = a.resolve::<TestService>(None).expect("resolve a1");
        let from_a2 = a.resolve::<TestService>(None).expect("resolve a2");
        let from_b = b.resolve::<TestService>(None).expect("resolve b");

        assert!(Arc::ptr_eq(&from_a1, &from_a2));
        assert!(!Arc::ptr_eq(&from_a1, &from_b));
    }

    #[test]
    fn test_reregistration_overwrites_and_drops_cache() {
        let container = DiContainer::new("test");
        container
            .register::<TestService, _>(None, Lifetime::Singleton, |_| Ok(TestService { value: 1 }))
            .expect("first registration should succeed");
        let first = container.resolve::<TestService>(None).expect("resolve");
        assert_eq!(first.value, 1);

        container
            .register::<TestService, _>(None, Lifetime::Singleton, |_| Ok(TestService { value: 2 }))
            .expect("re-registration should succeed");
        let second = container.resolve::<TestService>(None).expect("resolve");
        assert_eq!(second.value, 2);
    }

    #[test]
    fn test_hidden_and_public_keys_are_distinct() {
        let public = ServiceKey::of::<Arc<TestService>>(None);
        let hidden = ServiceKey::hidden::<Arc<TestService>>(None);
        assert_ne!(public, hidden);
        assert!(hidden.to_string().contains("[hidden]"));
    }

    #[test]
    fn test_depth_guard_stops_factory_cycles() {
        let container = DiContainer::new("test");
        container
            .register::<TestService, _>(None, Lifetime::Transient, |scope| {
                // Конструкторный цикл: сервис требует сам себя
                let inner = scope.resolve::<TestService>(None)?;
                Ok(TestService { value: inner.value })
            })
            .expect("registration should succeed");

        let err = container
            .resolve::<TestService>(None)
            .expect_err("cycle must be stopped by the depth guard");
        assert!(matches!(err, DiError::DepthExceeded { .. }));
    }

    #[test]
    fn test_stats_and_clear() {
        let container = DiContainer::new("stats");
        container
            .register::<TestService, _>(None, Lifetime::Singleton, |_| Ok(TestService { value: 1 }))
            .expect("registration should succeed");

        let _ = container.resolve::<TestService>(None).expect("resolve");
        let _ = container.resolve::<TestService>(None).expect("resolve");
        let _ = container.resolve::<Dependent>(None).expect_err("missing");

        let stats = container.stats();
        assert_eq!(stats.name, "stats");
        assert_eq!(stats.registered_services, 1);
        assert_eq!(stats.total_resolutions, 3);
        assert_eq!(stats.failed_resolutions, 1);
        assert_eq!(stats.cached_singletons, 1);
        assert_eq!(stats.cache.singleton_hits, 1);

        container.clear();
        let stats = container.stats();
        assert_eq!(stats.registered_services, 0);
        assert_eq!(stats.cached_singletons, 0);
    }

    #[test]
    fn test_try_resolve() {
        let container = DiContainer::new("test");
        assert!(container.try_resolve::<TestService>(None).is_none());

        container
            .register_instance(TestService { value: 9 })
            .expect("registration should succeed");
        let resolved = container
            .try_resolve::<TestService>(None)
            .expect("try_resolve should find the instance");
        assert_eq!(resolved.value, 9);
    }
}
