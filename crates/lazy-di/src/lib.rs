//! lazy-di — отложенные proxy для DI контейнера
//!
//! Контейнер выдаёт вызывающему forwarding-объект интерфейсной зависимости,
//! реальная реализация которой не строится, пока зависимость не используется.
//! Это важно, когда построение дорого, чувствительно к порядку соседних
//! построений или насильно инициализировало бы весь граф при разрешении.
//!
//! АРХИТЕКТУРА (листья первыми):
//! - `contract` — Contract Inspector: дескрипторы контрактов и их валидация
//! - `deferred` — Deferred Resolver: construct-once-and-cache механизм
//! - `proxy` — Proxy Synthesizer: blueprint cache и trust grants
//! - `macros` — `lazy_contract!`: compile-time синтез forwarding-типов
//! - `adapter` — Registration Adapter: `register_lazy` на контейнере
//! - `container` / `lifetime` — контейнер-коллаборатор: регистрации, имена,
//!   lifetime-политики, иерархия scope
//! - `config` / `builder` — конфигурация и сборка корневого контейнера
//!
//! ГАРАНТИИ ДВИЖКА:
//! - разрешение контракта никогда не вызывает конструктор реализации;
//! - построение происходит не более одного раза на Deferred Resolver и
//!   только при первом обращении к члену proxy;
//! - неудача построения не кэшируется — повторное обращение пробует снова;
//! - forwarded failures проходят к вызывающему без изменений.

pub mod adapter;
pub mod builder;
pub mod config;
pub mod container;
pub mod contract;
pub mod deferred;
pub mod errors;
pub mod lifetime;
pub mod macros;
pub mod proxy;

// Публичный API
pub use builder::ContainerBuilder;
pub use config::DiConfig;
pub use container::{ContainerStats, DiContainer, Realm, ServiceKey};
pub use contract::{
    ContractDescriptor, ContractInspector, ContractKind, ContractVisibility, LazyContract,
    MemberDescriptor, MemberKind,
};
pub use deferred::DeferredResolver;
pub use errors::DiError;
pub use lifetime::{CacheStats, Lifetime};
pub use proxy::ProxySynthesizer;
