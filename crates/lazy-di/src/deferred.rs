//! Deferred Resolver — отложенное построение реального экземпляра
//!
//! Single-assignment holder, привязанный к одному resolution scope.
//! Первый `obtain()` выполняет construction callback; успешный результат
//! коммитится в кэш и возвращается всем последующим вызовам. Неудача НЕ
//! кэшируется: следующий `obtain()` повторяет построение.
//!
//! Дисциплина check-construct-cache обеспечивается
//! `once_cell::sync::OnceCell::get_or_try_init`: при гонке двух обращений
//! построение выполняется не более одного раза, проигравший блокируется и
//! наблюдает полностью построенный экземпляр.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::errors::DiError;

type ConstructFn<C> = Box<dyn Fn() -> Result<Arc<C>, DiError> + Send + Sync>;

/// Construct-once-and-cache механизм, обслуживающий один Proxy Instance
pub struct DeferredResolver<C: ?Sized + Send + Sync + 'static> {
    cell: OnceCell<Arc<C>>,
    construct: ConstructFn<C>,
}

impl<C: ?Sized + Send + Sync + 'static> DeferredResolver<C> {
    /// Создать resolver с construction callback.
    ///
    /// Callback обычно выполняет разрешение против конкретного scope,
    /// захваченного при создании proxy; scope после этого неизменяем.
    pub fn new(construct: impl Fn() -> Result<Arc<C>, DiError> + Send + Sync + 'static) -> Self {
        Self {
            cell: OnceCell::new(),
            construct: Box::new(construct),
        }
    }

    /// Получить реальный экземпляр, при первом вызове построив его.
    ///
    /// Идемпотентен: успешный результат одинаков для всех вызовов этого
    /// resolver. Ошибка построения поднимается вызывающему и оставляет
    /// слот пустым.
    pub fn obtain(&self) -> Result<Arc<C>, DiError> {
        self.cell
            .get_or_try_init(|| (self.construct)())
            .map(Arc::clone)
    }

    /// Наблюдаемый сигнал "реальный экземпляр уже построен"
    pub fn is_constructed(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<C: ?Sized + Send + Sync + 'static> std::fmt::Debug for DeferredResolver<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredResolver")
            .field("constructed", &self.is_constructed())
            .finish()
    }
}
