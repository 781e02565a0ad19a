//! Contract Inspector — модель описания контрактов
//!
//! Контракт — это object-safe trait без реализации (чистый интерфейс).
//! Каждый контракт несёт статический `ContractDescriptor`: упорядоченный
//! список членов (метод / property-get / property-set), объявленную
//! видимость и модуль, в котором контракт определён.
//!
//! Инспектор валидирует дескриптор ЭАГЕРНО — при регистрации, до того как
//! контейнер запишет хоть одну запись. Контракт с ограниченной видимостью
//! требует явного trust grant на свой модуль (см. `proxy.rs`); это
//! capability-отношение, а не ambient-доступ.

use std::collections::HashSet;
use std::sync::Arc;

use crate::deferred::DeferredResolver;
use crate::errors::DiError;

/// Вид члена контракта
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    PropertyGet,
    PropertySet,
}

/// Вид типа, описанного дескриптором
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    /// Чистый интерфейс — допустим для lazy-регистрации
    Interface,
    /// Конкретный тип — отклоняется при регистрации
    Concrete,
}

/// Объявленная видимость контракта
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractVisibility {
    Public,
    /// Уже, чем `pub`: синтез требует trust grant на модуль контракта
    Restricted,
}

/// Описание одного члена контракта
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberDescriptor {
    pub name: &'static str,
    pub kind: MemberKind,
    /// Имена типов параметров (без `&self`)
    pub params: &'static [&'static str],
    /// Имя типа успешного результата
    pub result: &'static str,
    /// Имя типа ошибки члена
    pub error: &'static str,
}

/// Статическое описание контракта
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractDescriptor {
    pub name: &'static str,
    pub kind: ContractKind,
    pub visibility: ContractVisibility,
    /// `module_path!()` на месте объявления
    pub module_path: &'static str,
    /// Члены в порядке объявления
    pub members: &'static [MemberDescriptor],
}

/// Blueprint контракта: дескриптор плюс конструктор forwarding-объекта.
///
/// Реализуется для `dyn Trait` — обычно макросом [`lazy_contract!`],
/// но trait публичен: per-contract adapter можно написать и руками,
/// поведенческий контракт тот же.
///
/// [`lazy_contract!`]: crate::lazy_contract
pub trait LazyContract: Send + Sync + 'static {
    /// Статический дескриптор контракта
    fn descriptor() -> &'static ContractDescriptor;

    /// Создать forwarding-объект, привязанный к данному Deferred Resolver
    fn synthesize(target: DeferredResolver<Self>) -> Arc<Self>;
}

/// Валидация дескрипторов контрактов
pub struct ContractInspector;

impl ContractInspector {
    /// Проверить, что дескриптор описывает чистый интерфейс с членами,
    /// которые forwarder способен выразить.
    pub fn ensure_interface(descriptor: &ContractDescriptor) -> Result<(), DiError> {
        if descriptor.kind != ContractKind::Interface {
            return Err(DiError::UnsupportedContract {
                contract: descriptor.name.to_string(),
                reason: "only pure interfaces (object-safe traits) can be registered lazily"
                    .to_string(),
            });
        }

        for member in descriptor.members {
            match member.kind {
                MemberKind::PropertyGet if !member.params.is_empty() => {
                    return Err(DiError::InvalidContract {
                        contract: descriptor.name.to_string(),
                        member: member.name.to_string(),
                        reason: "property getter must not take parameters".to_string(),
                    });
                }
                MemberKind::PropertySet if member.params.len() != 1 => {
                    return Err(DiError::InvalidContract {
                        contract: descriptor.name.to_string(),
                        member: member.name.to_string(),
                        reason: "property setter takes exactly one value".to_string(),
                    });
                }
                MemberKind::PropertySet if member.result != "()" => {
                    return Err(DiError::InvalidContract {
                        contract: descriptor.name.to_string(),
                        member: member.name.to_string(),
                        reason: "property setter must return Result<(), _>".to_string(),
                    });
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Проверить доступность контракта для синтеза.
    ///
    /// Public контракты доступны всегда; Restricted — только если их
    /// модуль присутствует в явном наборе grants.
    pub fn ensure_accessible(
        descriptor: &ContractDescriptor,
        trusted_modules: &HashSet<String>,
    ) -> Result<(), DiError> {
        match descriptor.visibility {
            ContractVisibility::Public => Ok(()),
            ContractVisibility::Restricted => {
                if trusted_modules.contains(descriptor.module_path) {
                    Ok(())
                } else {
                    Err(DiError::InaccessibleContract {
                        contract: descriptor.name.to_string(),
                        module: descriptor.module_path.to_string(),
                    })
                }
            }
        }
    }

    /// Упорядоченное перечисление членов контракта
    pub fn members(descriptor: &'static ContractDescriptor) -> &'static [MemberDescriptor] {
        descriptor.members
    }
}
