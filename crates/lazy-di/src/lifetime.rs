//! Управление жизненным циклом компонентов
//!
//! Кэши singleton/scoped экземпляров и статистика их использования.
//! Transient экземпляры не кэшируются никогда.
//!
//! Инвариант кэшей: при гонке двух создателей оба наблюдают один и тот же
//! сохранённый экземпляр (первая вставка выигрывает). Гарантия
//! "конструктор выполняется не более одного раза" принадлежит не кэшам,
//! а `DeferredResolver` — см. `deferred.rs`.

use std::any::Any;
use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::container::ServiceKey;

/// Жизненный цикл компонента
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Один экземпляр на контейнер-владелец регистрации (общий для потомков)
    Singleton,
    /// Один экземпляр на разрешающий scope
    Scoped,
    /// Новый экземпляр на каждое разрешение
    Transient,
}

impl Default for Lifetime {
    fn default() -> Self {
        Lifetime::Singleton
    }
}

/// Type-erased представление service handle (`Arc<T>` или `Arc<dyn C>`).
///
/// Handle обязан быть `Clone`: кэш хранит одну копию и клонирует её
/// для каждого вызывающего.
pub(crate) trait AnyService: Any + Send + Sync {
    fn clone_boxed(&self) -> BoxedService;
    fn as_any(&self) -> &dyn Any;
}

impl<S> AnyService for S
where
    S: Any + Send + Sync + Clone,
{
    fn clone_boxed(&self) -> BoxedService {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) type BoxedService = Box<dyn AnyService>;

/// Статистика использования кэшей жизненного цикла
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub singleton_hits: u64,
    pub singleton_misses: u64,
    pub scoped_hits: u64,
    pub scoped_misses: u64,
    pub transient_creations: u64,
    pub total_cache_clears: u64,
}

/// Кэши singleton и scoped экземпляров одного контейнера
pub(crate) struct LifetimeStore {
    singletons: RwLock<HashMap<ServiceKey, BoxedService>>,
    scoped: RwLock<HashMap<ServiceKey, BoxedService>>,
    stats: RwLock<CacheStats>,
}

impl LifetimeStore {
    pub(crate) fn new() -> Self {
        Self {
            singletons: RwLock::new(HashMap::new()),
            scoped: RwLock::new(HashMap::new()),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    pub(crate) fn cache_stats(&self) -> CacheStats {
        (*self.stats.read()).clone()
    }

    pub(crate) fn cached_singletons(&self) -> usize {
        self.singletons.read().len()
    }

    /// Получить singleton из кэша или построить новый.
    ///
    /// `build` выполняется без удержания lock: построение может рекурсивно
    /// вернуться в контейнер за зависимостями. При гонке выигрывает первая
    /// вставка, проигравший экземпляр отбрасывается.
    pub(crate) fn get_or_create_singleton(
        &self,
        key: &ServiceKey,
        build: impl FnOnce() -> Result<BoxedService, crate::errors::DiError>,
    ) -> Result<BoxedService, crate::errors::DiError> {
        {
            let singletons = self.singletons.read();
            if let Some(cached) = singletons.get(key) {
                self.stats.write().singleton_hits += 1;
                debug!("Singleton cache hit for {key}");
                return Ok(cached.as_ref().clone_boxed());
            }
        }

        let instance = build()?;

        let mut singletons = self.singletons.write();
        let entry = singletons.entry(key.clone()).or_insert(instance);
        self.stats.write().singleton_misses += 1;
        debug!("Created new singleton for {key}");
        Ok(entry.clone_boxed())
    }

    /// Получить scoped экземпляр из кэша этого scope или построить новый
    pub(crate) fn get_or_create_scoped(
        &self,
        key: &ServiceKey,
        build: impl FnOnce() -> Result<BoxedService, crate::errors::DiError>,
    ) -> Result<BoxedService, crate::errors::DiError> {
        {
            let scoped = self.scoped.read();
            if let Some(cached) = scoped.get(key) {
                self.stats.write().scoped_hits += 1;
                debug!("Scoped cache hit for {key}");
                return Ok(cached.as_ref().clone_boxed());
            }
        }

        let instance = build()?;

        let mut scoped = self.scoped.write();
        let entry = scoped.entry(key.clone()).or_insert(instance);
        self.stats.write().scoped_misses += 1;
        debug!("Created new scoped instance for {key}");
        Ok(entry.clone_boxed())
    }

    pub(crate) fn record_transient(&self) {
        self.stats.write().transient_creations += 1;
    }

    /// Сбросить кэшированные экземпляры одного ключа (при перерегистрации)
    pub(crate) fn clear_key(&self, key: &ServiceKey) {
        self.singletons.write().remove(key);
        self.scoped.write().remove(key);
        debug!("Cache cleared for {key}");
    }

    /// Очистить оба кэша
    pub(crate) fn clear(&self) {
        self.singletons.write().clear();
        self.scoped.write().clear();
        self.stats.write().total_cache_clears += 1;
        debug!("All lifetime caches cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ServiceKey;
    use std::sync::Arc;

    struct TestService {
        value: i32,
    }

    fn build_service() -> Result<BoxedService, crate::errors::DiError> {
        Ok(Box::new(Arc::new(TestService { value: 42 })))
    }

    fn unwrap_service(boxed: BoxedService) -> Arc<TestService> {
        boxed
            .as_any()
            .downcast_ref::<Arc<TestService>>()
            .expect("cached service should downcast")
            .clone()
    }

    #[test]
    fn test_singleton_caching() {
        let store = LifetimeStore::new();
        let key = ServiceKey::of::<Arc<TestService>>(None);

        let first = unwrap_service(
            store
                .get_or_create_singleton(&key, build_service)
                .expect("first build should succeed"),
        );
        let second = unwrap_service(
            store
                .get_or_create_singleton(&key, || panic!("factory must not rerun"))
                .expect("cache hit should succeed"),
        );

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.value, 42);

        let stats = store.cache_stats();
        assert_eq!(stats.singleton_hits, 1);
        assert_eq!(stats.singleton_misses, 1);
    }

    #[test]
    fn test_failed_build_is_not_cached() {
        let store = LifetimeStore::new();
        let key = ServiceKey::of::<Arc<TestService>>(None);

        let result = store.get_or_create_singleton(&key, || {
            Err(crate::errors::DiError::resolution("TestService", "boom"))
        });
        assert!(result.is_err());

        // Повторная попытка строит заново
        let retried = store
            .get_or_create_singleton(&key, build_service)
            .expect("retry should succeed");
        assert_eq!(unwrap_service(retried).value, 42);
    }

    #[test]
    fn test_scoped_is_separate_from_singleton() {
        let store = LifetimeStore::new();
        let key = ServiceKey::of::<Arc<TestService>>(None);

        let singleton = unwrap_service(
            store
                .get_or_create_singleton(&key, build_service)
                .expect("singleton build should succeed"),
        );
        let scoped = unwrap_service(
            store
                .get_or_create_scoped(&key, build_service)
                .expect("scoped build should succeed"),
        );

        assert!(!Arc::ptr_eq(&singleton, &scoped));
    }

    #[test]
    fn test_cache_clearing() {
        let store = LifetimeStore::new();
        let key = ServiceKey::of::<Arc<TestService>>(None);

        let first = unwrap_service(
            store
                .get_or_create_singleton(&key, build_service)
                .expect("build should succeed"),
        );
        store.clear();
        let second = unwrap_service(
            store
                .get_or_create_singleton(&key, build_service)
                .expect("rebuild should succeed"),
        );

        assert!(!Arc::ptr_eq(&first, &second));

        let stats = store.cache_stats();
        assert_eq!(stats.singleton_misses, 2);
        assert_eq!(stats.total_cache_clears, 1);
    }
}
