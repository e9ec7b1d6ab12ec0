//! Type graph: handles, kinds and the per-type descriptor

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use slotmap::{new_key_type, Key};

use crate::members::{Attribute, ConstructorInfo, FieldInfo, MethodInfo, MethodRef, PropertyInfo};
use crate::registry::{registry, Reflect};
use crate::value::Value;

new_key_type! {
    /// Identity of a registered type.
    ///
    /// Handles are cheap to copy and compare; two handles are equal iff they
    /// name the same registered type.
    pub struct TypeHandle;
}

impl TypeHandle {
    /// Handle of a Rust type, registering it on first use.
    pub fn of<T: Reflect>() -> Self {
        registry().register::<T>()
    }

    /// The root `Object` type every type is assignable to.
    pub fn object() -> Self {
        registry().builtins().object
    }

    /// The `Void` return type.
    pub fn void() -> Self {
        registry().builtins().void
    }

    /// Descriptor of this type.
    ///
    /// # Panics
    ///
    /// Panics if the handle was not produced by the global registry or its
    /// registration has not finished yet. Use [`TypeRegistry::get`] when the
    /// handle may be foreign.
    ///
    /// [`TypeRegistry::get`]: crate::TypeRegistry::get
    pub fn info(self) -> Arc<TypeInfo> {
        match registry().get(self) {
            Some(info) => info,
            None => panic!("type handle {self:?} is not registered"),
        }
    }

    /// Registered name, or `<unregistered>`.
    pub fn name(self) -> String {
        registry().name_of(self)
    }

    /// Stable 64-bit encoding of the handle, used for hashing.
    pub fn to_bits(self) -> u64 {
        self.data().as_ffi()
    }
}

/// Coarse classification of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// The root type
    Object,
    /// Return type of methods without a result
    Void,
    /// Built-in value types (`Bool`, `Int32`, `Int64`, `Float64`)
    Primitive,
    /// Built-in immutable reference type
    String,
    /// User value type, copied on assignment
    Struct,
    /// User reference type, shared by identity
    Class,
    /// Integral enumeration
    Enum,
    /// Single-dimensional array
    Array,
    /// Contract implemented by classes and structs; never instantiated
    Interface,
}

impl TypeKind {
    /// Value types are copied on assignment and unboxed before member access.
    pub fn is_value_type(self) -> bool {
        matches!(self, TypeKind::Primitive | TypeKind::Struct | TypeKind::Enum)
    }
}

/// Projection from an instance of a derived class to its embedded base.
pub trait Upcast: Send + Sync {
    fn upcast_ref<'a>(&self, value: &'a dyn Any) -> Option<&'a dyn Any>;
    fn upcast_mut<'a>(&self, value: &'a mut dyn Any) -> Option<&'a mut dyn Any>;
}

pub(crate) struct UpcastFns<T, B> {
    pub(crate) get: fn(&T) -> &B,
    pub(crate) get_mut: fn(&mut T) -> &mut B,
}

impl<T: Any, B: Any> Upcast for UpcastFns<T, B> {
    fn upcast_ref<'a>(&self, value: &'a dyn Any) -> Option<&'a dyn Any> {
        let derived = value.downcast_ref::<T>()?;
        let base: &'a dyn Any = (self.get)(derived);
        Some(base)
    }

    fn upcast_mut<'a>(&self, value: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        let derived = value.downcast_mut::<T>()?;
        let base: &'a mut dyn Any = (self.get_mut)(derived);
        Some(base)
    }
}

/// Everything the engine knows about one type.
///
/// Descriptors are immutable once published by the registry.
pub struct TypeInfo {
    pub(crate) handle: TypeHandle,
    pub(crate) name: String,
    pub(crate) kind: TypeKind,
    pub(crate) base: Option<TypeHandle>,
    pub(crate) interfaces: Vec<TypeHandle>,
    pub(crate) element: Option<TypeHandle>,
    pub(crate) fields: Vec<FieldInfo>,
    pub(crate) properties: Vec<PropertyInfo>,
    pub(crate) methods: Vec<MethodInfo>,
    pub(crate) constructors: Vec<ConstructorInfo>,
    pub(crate) vtable: Vec<MethodRef>,
    pub(crate) zero: Value,
    pub(crate) upcast: Option<Arc<dyn Upcast>>,
    pub(crate) attributes: Vec<Attribute>,
}

impl TypeInfo {
    pub(crate) fn bare(
        handle: TypeHandle,
        name: String,
        kind: TypeKind,
        base: Option<TypeHandle>,
        zero: Value,
    ) -> Self {
        Self {
            handle,
            name,
            kind,
            base,
            interfaces: Vec::new(),
            element: None,
            fields: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            vtable: Vec::new(),
            zero,
            upcast: None,
            attributes: Vec::new(),
        }
    }

    pub fn handle(&self) -> TypeHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Direct base type, `None` only for `Object`.
    pub fn base(&self) -> Option<TypeHandle> {
        self.base
    }

    /// Interfaces this type declares directly; inherited ones are not repeated.
    pub fn interfaces(&self) -> &[TypeHandle] {
        &self.interfaces
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    /// Attributes attached to the type itself.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Element type of an array type.
    pub fn element(&self) -> Option<TypeHandle> {
        self.element
    }

    pub fn is_value_type(&self) -> bool {
        self.kind.is_value_type()
    }

    pub fn is_array(&self) -> bool {
        self.kind == TypeKind::Array
    }

    /// Fields declared on this type (not inherited ones).
    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    pub fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    pub fn constructors(&self) -> &[ConstructorInfo] {
        &self.constructors
    }

    /// Virtual dispatch table; inherited slots keep their index.
    pub fn vtable(&self) -> &[MethodRef] {
        &self.vtable
    }

    /// Default value: zeroed struct, `0` enum member, or `Null`.
    pub fn zero_value(&self) -> Value {
        self.zero.clone()
    }

    pub fn upcast(&self) -> Option<&dyn Upcast> {
        self.upcast.as_deref()
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("base", &self.base)
            .field("interfaces", &self.interfaces)
            .field("fields", &self.fields.len())
            .field("properties", &self.properties.len())
            .field("methods", &self.methods.len())
            .field("constructors", &self.constructors.len())
            .finish()
    }
}
