//! rapidflect Core - Cached Accessor Compilation
//!
//! Turns reflective member access into compiled, reusable accessors:
//!
//! - [`Reflector`] - request getters, setters, invokers, constructors, array
//!   element accessors and object mappers; equal requests share one accessor
//! - [`Signature`] / [`MapSignature`] - the identity an accessor is cached under
//! - [`MemberResolver`] - finds the member a request names under its [`Flags`]
//! - [`ReflectExt`] / [`TypeExt`] - one-call helpers over the [`global()`] reflector
//! - [`attributes`] - attribute lookups, attributed-member queries and type relations
//! - [`lenient`] - construct or call from loosely typed, possibly named values
//!
//! Type metadata comes from `rapidflect-meta`, re-exported as [`meta`], and is
//! usually generated with `#[derive(Reflect)]`.
//!
//! ```ignore
//! use rapidflect_core::{global, meta::TypeHandle};
//!
//! let getter = global().member_getter(TypeHandle::of::<Person>(), "Name")?;
//! let name = getter.get(&person)?;
//! ```

// Allow the crate to refer to itself as `rapidflect_core` for proc macro compatibility
extern crate self as rapidflect_core;

pub use rapidflect_macros::Reflect;
pub use rapidflect_meta as meta;

pub mod accessor;
pub mod attributes;
pub mod cache;
pub mod compiler;
pub mod config;
pub mod error;
pub mod extensions;
pub mod flags;
pub mod lenient;
pub mod logging;
pub mod marshal;
pub mod query;
pub mod reflector;
pub mod resolver;
pub mod signature;
pub mod value_cell;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export commonly used items
pub use accessor::{
    ArrayElementGetter, ArrayElementSetter, ConstructorInvoker, MappedMember, MemberGetter,
    MemberSetter, MethodInvoker, ObjectMapper,
};
pub use attributes::{AttributeProvider, AttributedMember};
pub use cache::{CacheStats, CacheStrategy};
pub use error::{ReflectError, ReflectResult};
pub use extensions::{ReflectExt, TypeExt};
pub use flags::{Flags, MemberKinds};
pub use marshal::ArgPlan;
pub use reflector::{global, Reflector};
pub use resolver::{DataMember, MemberHandle, MemberResolver};
pub use signature::{Direction, MapSignature, MemberKind, Signature};
pub use value_cell::WriteBack;

// Re-export config types
pub use config::{
    config_dir, engine_config_path, CacheConfig, ConfigError, ConfigResult, EngineConfig,
};
