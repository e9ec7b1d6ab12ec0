//! Global type registry
//!
//! The registry is append-only: a published [`TypeInfo`] never changes, so
//! descriptors can be shared as `Arc`s by compiled accessors without further
//! synchronization.
//!
//! Registration of a Rust type runs its [`Reflect::describe`] exactly once.
//! `describe` may itself request handles of other types (including the type
//! being registered, for self-referential members); those requests are served
//! from a reserved handle while registration is in progress on the same thread.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::{ReentrantMutex, RwLock};
use slotmap::SlotMap;
use tracing::{debug, warn};

use crate::builder::TypeBuilder;
use crate::error::{InvokeError, InvokeResult};
use crate::types::{TypeHandle, TypeInfo, TypeKind};
use crate::value::{ArrayRef, ObjectRef, Value, ValueCell};

/// A Rust type that can describe itself to the registry.
pub trait Reflect: Any + Send + Sync + Sized {
    fn describe() -> TypeBuilder<Self>;

    fn type_handle() -> TypeHandle {
        registry().register::<Self>()
    }
}

/// Handles of the built-in types.
#[derive(Debug, Clone, Copy)]
pub struct Builtins {
    pub object: TypeHandle,
    pub void: TypeHandle,
    pub boolean: TypeHandle,
    pub int32: TypeHandle,
    pub int64: TypeHandle,
    pub float64: TypeHandle,
    pub string: TypeHandle,
}

#[derive(Default)]
struct RegistryInner {
    types: SlotMap<TypeHandle, Option<Arc<TypeInfo>>>,
    by_rust: HashMap<TypeId, TypeHandle>,
    pending: HashMap<TypeId, TypeHandle>,
    by_name: HashMap<String, TypeHandle>,
    arrays: HashMap<TypeHandle, TypeHandle>,
}

impl RegistryInner {
    fn publish(&mut self, info: TypeInfo) -> TypeHandle {
        let handle = info.handle;
        if !info.name.starts_with('<') {
            self.by_name.entry(info.name.clone()).or_insert(handle);
        }
        if let Some(slot) = self.types.get_mut(handle) {
            *slot = Some(Arc::new(info));
        }
        handle
    }

    fn builtin(
        &mut self,
        name: &str,
        kind: TypeKind,
        base: Option<TypeHandle>,
        zero: Value,
    ) -> TypeHandle {
        let handle = self.types.insert(None);
        self.publish(TypeInfo::bare(handle, name.to_string(), kind, base, zero))
    }

    /// Arrays created while their element type was still being described
    /// carry a placeholder name until the element is published.
    fn rename_arrays_of(&mut self, element: TypeHandle, element_name: &str) {
        let Some(&array) = self.arrays.get(&element) else {
            return;
        };
        let base = self
            .types
            .get(array)
            .and_then(|slot| slot.as_ref())
            .and_then(|info| info.base);
        let mut info = TypeInfo::bare(
            array,
            format!("{element_name}[]"),
            TypeKind::Array,
            base,
            Value::Null,
        );
        info.element = Some(element);
        self.publish(info);
    }
}

/// Process-wide type graph.
pub struct TypeRegistry {
    registration: ReentrantMutex<()>,
    inner: RwLock<RegistryInner>,
    builtins: Builtins,
}

static REGISTRY: LazyLock<TypeRegistry> = LazyLock::new(TypeRegistry::new);

/// The global registry.
pub fn registry() -> &'static TypeRegistry {
    &REGISTRY
}

impl TypeRegistry {
    fn new() -> Self {
        let mut inner = RegistryInner::default();
        let object = inner.builtin("Object", TypeKind::Object, None, Value::Null);
        let root = Some(object);
        let builtins = Builtins {
            object,
            void: inner.builtin("Void", TypeKind::Void, root, Value::Null),
            boolean: inner.builtin("Bool", TypeKind::Primitive, root, Value::Bool(false)),
            int32: inner.builtin("Int32", TypeKind::Primitive, root, Value::I32(0)),
            int64: inner.builtin("Int64", TypeKind::Primitive, root, Value::I64(0)),
            float64: inner.builtin("Float64", TypeKind::Primitive, root, Value::F64(0.0)),
            string: inner.builtin("String", TypeKind::String, root, Value::Null),
        };

        let rust_types = [
            (TypeId::of::<Value>(), object),
            (TypeId::of::<ObjectRef>(), object),
            (TypeId::of::<ArrayRef>(), object),
            (TypeId::of::<ValueCell>(), object),
            (TypeId::of::<()>(), builtins.void),
            (TypeId::of::<bool>(), builtins.boolean),
            (TypeId::of::<i32>(), builtins.int32),
            (TypeId::of::<i64>(), builtins.int64),
            (TypeId::of::<f64>(), builtins.float64),
            (TypeId::of::<String>(), builtins.string),
        ];
        inner.by_rust.extend(rust_types);

        Self {
            registration: ReentrantMutex::new(()),
            inner: RwLock::new(inner),
            builtins,
        }
    }

    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    /// Handle of `T`, registering it on first use.
    pub fn register<T: Reflect>(&self) -> TypeHandle {
        let rust_id = TypeId::of::<T>();
        if let Some(handle) = self.inner.read().by_rust.get(&rust_id) {
            return *handle;
        }

        let _guard = self.registration.lock();
        let handle = {
            let mut inner = self.inner.write();
            if let Some(handle) = inner.by_rust.get(&rust_id) {
                return *handle;
            }
            // Re-entrant request from our own describe()
            if let Some(handle) = inner.pending.get(&rust_id) {
                return *handle;
            }
            let handle = inner.types.insert(None);
            inner.pending.insert(rust_id, handle);
            handle
        };

        let builder = T::describe();
        if let Some(element) = builder.element() {
            let array = self.array_of(element);
            let mut inner = self.inner.write();
            inner.pending.remove(&rust_id);
            inner.types.remove(handle);
            inner.by_rust.insert(rust_id, array);
            return array;
        }

        let info = builder.build(handle, self);
        debug!(
            "Registered type {} ({:?}, {} fields, {} properties, {} methods)",
            info.name,
            info.kind,
            info.fields.len(),
            info.properties.len(),
            info.methods.len()
        );
        let name = info.name.clone();
        let mut inner = self.inner.write();
        inner.pending.remove(&rust_id);
        inner.by_rust.insert(rust_id, handle);
        inner.publish(info);
        inner.rename_arrays_of(handle, &name);
        handle
    }

    /// Published descriptor of `handle`.
    pub fn get(&self, handle: TypeHandle) -> Option<Arc<TypeInfo>> {
        self.inner.read().types.get(handle).and_then(|slot| slot.clone())
    }

    /// Looks up a published type by its registered name.
    pub fn find(&self, name: &str) -> Option<TypeHandle> {
        self.inner.read().by_name.get(name).copied()
    }

    pub fn name_of(&self, handle: TypeHandle) -> String {
        self.get(handle)
            .map(|info| info.name.clone())
            .unwrap_or_else(|| "<unregistered>".to_string())
    }

    /// Array type with elements of `element`; one handle per element type.
    pub fn array_of(&self, element: TypeHandle) -> TypeHandle {
        if let Some(handle) = self.inner.read().arrays.get(&element) {
            return *handle;
        }
        let name = format!("{}[]", self.name_of(element));

        let mut inner = self.inner.write();
        if let Some(handle) = inner.arrays.get(&element) {
            return *handle;
        }
        let handle = inner.types.insert(None);
        inner.arrays.insert(element, handle);
        debug!("Registered array type {}", name);
        let mut info = TypeInfo::bare(
            handle,
            name,
            TypeKind::Array,
            Some(self.builtins.object),
            Value::Null,
        );
        info.element = Some(element);
        inner.publish(info)
    }

    /// Whether a value of type `from` can be stored where `to` is expected.
    ///
    /// Holds for identity, for `Object`, along the base chain of `from`, and
    /// for every interface `from` implements.
    pub fn is_assignable(&self, to: TypeHandle, from: TypeHandle) -> bool {
        if to == from || to == self.builtins.object {
            return true;
        }
        let mut current = self.get(from).and_then(|info| info.base);
        while let Some(ty) = current {
            if ty == to {
                return true;
            }
            current = self.get(ty).and_then(|info| info.base);
        }
        self.get(to).is_some_and(|info| info.is_interface()) && self.implements(from, to)
    }

    /// Whether `ty`, one of its bases, or one of their interfaces declares
    /// `interface`. A type does not implement itself.
    pub fn implements(&self, ty: TypeHandle, interface: TypeHandle) -> bool {
        let mut pending = vec![ty];
        let mut seen = Vec::new();
        while let Some(handle) = pending.pop() {
            if seen.contains(&handle) {
                continue;
            }
            seen.push(handle);
            let Some(info) = self.get(handle) else {
                continue;
            };
            if info.interfaces.contains(&interface) {
                return true;
            }
            pending.extend(info.interfaces.iter().copied());
            pending.extend(info.base);
        }
        false
    }

    /// Runtime type of a boxed value; a cell reports the type it holds.
    pub fn type_of(&self, value: &Value) -> Option<TypeHandle> {
        let b = &self.builtins;
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(b.boolean),
            Value::I32(_) => Some(b.int32),
            Value::I64(_) => Some(b.int64),
            Value::F64(_) => Some(b.float64),
            Value::Str(_) => Some(b.string),
            Value::Enum(e) => Some(e.ty),
            Value::Struct(s) => Some(s.type_handle()),
            Value::Object(o) => Some(o.type_handle()),
            Value::Array(a) => Some(a.type_handle()),
            Value::Cell(c) => self.type_of(&c.get()),
        }
    }

    /// Default value of `ty`; `Null` for reference and unknown types.
    pub fn zero_value(&self, ty: TypeHandle) -> Value {
        self.get(ty).map(|info| info.zero.clone()).unwrap_or_default()
    }

    /// Whether `ty` is a value type.
    pub fn is_value_type(&self, ty: TypeHandle) -> bool {
        self.get(ty).is_some_and(|info| info.is_value_type())
    }

    /// Checked conversion of `value` to `ty`.
    ///
    /// Reference conversions keep identity. Value types are never null. A
    /// cell stays a cell only for `Object`; any other target receives a copy
    /// of its content, so later writes to the cell are not observed.
    pub fn cast(&self, value: Value, ty: TypeHandle) -> InvokeResult<Value> {
        if ty == self.builtins.object {
            return Ok(value);
        }
        let value = match value {
            Value::Cell(cell) => cell.get(),
            other => other,
        };
        let Some(actual) = self.type_of(&value) else {
            if self.is_value_type(ty) {
                return Err(InvokeError::NullReference(format!(
                    "null cannot be converted to value type {}",
                    self.name_of(ty)
                )));
            }
            return Ok(value);
        };
        if actual == ty || self.is_assignable(ty, actual) {
            Ok(value)
        } else {
            Err(InvokeError::InvalidCast {
                expected: self.name_of(ty),
                found: self.name_of(actual),
            })
        }
    }

    /// Views an instance of `from` as its (possibly indirect) base `to`.
    pub fn project_ref<'a>(
        &self,
        from: TypeHandle,
        to: TypeHandle,
        data: &'a dyn Any,
    ) -> Option<&'a dyn Any> {
        let mut current = from;
        let mut data = data;
        while current != to {
            let info = self.get(current)?;
            data = info.upcast()?.upcast_ref(data)?;
            current = info.base?;
        }
        Some(data)
    }

    pub fn project_mut<'a>(
        &self,
        from: TypeHandle,
        to: TypeHandle,
        data: &'a mut dyn Any,
    ) -> Option<&'a mut dyn Any> {
        let mut current = from;
        let mut data = data;
        while current != to {
            let info = self.get(current)?;
            data = info.upcast()?.upcast_mut(data)?;
            current = info.base?;
        }
        Some(data)
    }

    /// Number of published types, built-ins included.
    pub fn len(&self) -> usize {
        self.inner.read().types.values().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

macro_rules! builtin_reflect {
    ($($ty:ty => $name:literal, $kind:ident;)*) => {
        $(
            impl Reflect for $ty {
                fn describe() -> TypeBuilder<Self> {
                    warn!("Built-in type {} described after registry start-up", $name);
                    TypeBuilder::primitive($name, TypeKind::$kind, |_| Value::Null)
                }
            }
        )*
    };
}

builtin_reflect! {
    Value => "Object", Object;
    ObjectRef => "Object", Object;
    ArrayRef => "Object", Object;
    ValueCell => "Object", Object;
    () => "Void", Void;
    bool => "Bool", Primitive;
    i32 => "Int32", Primitive;
    i64 => "Int64", Primitive;
    f64 => "Float64", Primitive;
    String => "String", String;
}

impl<T: Reflect> Reflect for Vec<T> {
    fn describe() -> TypeBuilder<Self> {
        TypeBuilder::array_of(TypeHandle::of::<T>())
    }
}
