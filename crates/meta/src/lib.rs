//! rapidflect metadata
//!
//! The type graph the accessor engine compiles against:
//!
//! - [`TypeHandle`] / [`TypeInfo`] - registered types, their base chain and vtable
//! - [`FieldInfo`], [`PropertyInfo`], [`MethodInfo`], [`ConstructorInfo`] - member
//!   descriptors carrying typed thunks and [`Attribute`] metadata
//! - [`Value`] - boxed values, including [`ValueCell`] slots for mutable value types
//! - [`TypeRegistry`] - the global, append-only registry behind [`registry()`]
//!
//! Types describe themselves through [`Reflect`], either by hand with
//! [`TypeBuilder`] or with `#[derive(Reflect)]` from `rapidflect-core`.

mod builder;
mod error;
mod members;
mod registry;
mod types;
mod value;

pub use builder::{generic_method, TypeBuilder};
pub use error::{InvokeError, InvokeResult};
pub use members::{
    method_body, Attribute, ConstructorBody, ConstructorInfo, FieldAccess, FieldInfo,
    InstanceGetter, InstanceSetter, Invocation, MethodBody, MethodInfo, MethodRef, ParamMode,
    ParameterInfo, PropertyInfo, Receiver, StaticGetter, StaticSetter, Visibility,
};
pub use registry::{registry, Builtins, Reflect, TypeRegistry};
pub use types::{TypeHandle, TypeInfo, TypeKind, Upcast};
pub use value::{
    lock_timeout, set_lock_timeout, ArrayRef, DynValue, EnumValue, FromValue, IntoValue, ObjectRef,
    StructValue, Value, ValueCell,
};
