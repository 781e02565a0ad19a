//! Макрос синтеза контрактов
//!
//! [`lazy_contract!`] принимает определение trait-контракта и генерирует:
//!
//! - сам trait (с супертрейтами `Send + Sync`);
//! - статический `ContractDescriptor` с членами в порядке объявления;
//! - скрытый forwarding-тип, каждый член которого сначала получает реальный
//!   экземпляр у привязанного `DeferredResolver`, затем делегирует вызов
//!   с теми же аргументами и возвращает результат без изменений;
//! - impl `LazyContract` для `dyn Trait`, связывающий всё вместе.
//!
//! Члены контракта записываются как `fn` (метод), `get` (property getter)
//! или `set` (property setter); каждый принимает `&self` и возвращает
//! литеральный `Result<T, E>`, где `E: From<DiError>` — через эту конверсию
//! ошибка отложенного построения попадает в тип ошибки самого контракта.
//! Ошибка реализации (forwarded failure) проходит насквозь нетронутой.
//!
//! Неподдерживаемая форма члена (`&mut self`, generic-метод, не-`Result`
//! возврат) не совпадает с шаблоном макроса и обрывает компиляцию — отказ
//! синтеза фатален и никогда не откладывается до runtime.
//!
//! Контракт, объявленный уже чем `pub`, получает
//! `ContractVisibility::Restricted`: его синтез требует явного trust grant
//! на объявляющий модуль (`DiContainer::grant_contract_access`).

/// Объявить lazy-контракт и синтезировать его forwarding blueprint.
///
/// # Пример
///
/// ```
/// use std::sync::Arc;
/// use lazy_di::{lazy_contract, DiContainer, DiError, Lifetime};
///
/// #[derive(Debug)]
/// pub enum GreetError {
///     Unavailable(String),
/// }
///
/// impl From<DiError> for GreetError {
///     fn from(err: DiError) -> Self {
///         GreetError::Unavailable(err.to_string())
///     }
/// }
///
/// lazy_contract! {
///     pub trait Greeter {
///         fn greet(&self, name: &str) -> Result<String, GreetError>;
///     }
/// }
///
/// struct ConsoleGreeter;
///
/// impl Greeter for ConsoleGreeter {
///     fn greet(&self, name: &str) -> Result<String, GreetError> {
///         Ok(format!("hello, {name}"))
///     }
/// }
///
/// let container = DiContainer::new("root");
/// container
///     .register_lazy::<dyn Greeter, _>(None, Lifetime::Singleton, |_| Ok(Arc::new(ConsoleGreeter)))
///     .expect("registration should succeed");
///
/// // ConsoleGreeter ещё не построен: откладывается до первого вызова
/// let greeter = container
///     .resolve_contract::<dyn Greeter>(None)
///     .expect("resolve should succeed");
/// assert_eq!(
///     greeter.greet("world").expect("call should succeed"),
///     "hello, world"
/// );
/// ```
#[macro_export]
macro_rules! lazy_contract {
    // Публичный контракт
    (
        $(#[$attr:meta])*
        pub trait $name:ident {
            $($members:tt)*
        }
    ) => {
        $crate::lazy_contract!(@build (pub) Public $(#[$attr])* $name { $($members)* });
    };

    // Контракт с ограниченной видимостью (pub(crate), приватный, …)
    (
        $(#[$attr:meta])*
        $vis:vis trait $name:ident {
            $($members:tt)*
        }
    ) => {
        $crate::lazy_contract!(@build ($vis) Restricted $(#[$attr])* $name { $($members)* });
    };

    (@build ($($vis:tt)*) $cvis:ident $(#[$attr:meta])* $name:ident {
        $(
            $(#[$mattr:meta])*
            $kind:ident $method:ident ( &self $(, $arg:ident : $argty:ty)* ) -> Result< $ok:ty , $err:ty > ;
        )*
    }) => {
        $(#[$attr])*
        $($vis)* trait $name: ::core::marker::Send + ::core::marker::Sync {
            $(
                $(#[$mattr])*
                fn $method(&self $(, $arg : $argty)*) -> ::core::result::Result<$ok, $err>;
            )*
        }

        const _: () = {
            pub struct Forwarder {
                target: $crate::DeferredResolver<dyn $name>,
            }

            impl ::core::fmt::Debug for dyn $name {
                fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                    f.write_str(::core::stringify!($name))
                }
            }

            impl $name for Forwarder {
                $(
                    fn $method(&self $(, $arg : $argty)*) -> ::core::result::Result<$ok, $err> {
                        let real = self
                            .target
                            .obtain()
                            .map_err(<$err as ::core::convert::From<$crate::DiError>>::from)?;
                        real.$method($($arg),*)
                    }
                )*
            }

            static DESCRIPTOR: $crate::ContractDescriptor = $crate::ContractDescriptor {
                name: ::core::stringify!($name),
                kind: $crate::ContractKind::Interface,
                visibility: $crate::ContractVisibility::$cvis,
                module_path: ::core::module_path!(),
                members: &[
                    $(
                        $crate::MemberDescriptor {
                            name: ::core::stringify!($method),
                            kind: $crate::lazy_contract!(@member_kind $kind),
                            params: &[$(::core::stringify!($argty)),*],
                            result: ::core::stringify!($ok),
                            error: ::core::stringify!($err),
                        },
                    )*
                ],
            };

            impl $crate::LazyContract for dyn $name {
                fn descriptor() -> &'static $crate::ContractDescriptor {
                    &DESCRIPTOR
                }

                fn synthesize(
                    target: $crate::DeferredResolver<Self>,
                ) -> ::std::sync::Arc<Self> {
                    ::std::sync::Arc::new(Forwarder { target })
                }
            }
        };
    };

    (@member_kind fn) => { $crate::MemberKind::Method };
    (@member_kind get) => { $crate::MemberKind::PropertyGet };
    (@member_kind set) => { $crate::MemberKind::PropertySet };
}
