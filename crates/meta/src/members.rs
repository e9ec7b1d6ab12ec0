//! Member descriptors: fields, properties, methods and constructors
//!
//! Each descriptor carries the typed thunks that perform the primitive
//! operation (load/store a field, call a body) against an erased instance.
//! Thunks are created once at registration and shared by every compiled
//! accessor that resolves to the member.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{InvokeError, InvokeResult};
use crate::types::TypeHandle;
use crate::value::Value;

/// Member accessibility as seen by binding flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    NonPublic,
}

/// Named metadata attached to a type or member.
///
/// Markers carry `Null`; other attributes carry a payload value.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: Value,
}

impl Attribute {
    pub fn marker(name: impl Into<String>) -> Self {
        Self::new(name, Value::Null)
    }

    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }
}

/// How an argument is passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamMode {
    /// By value
    #[default]
    In,
    /// By reference, copied in and out
    Ref,
    /// By reference, copied out only
    Out,
}

impl ParamMode {
    pub fn is_by_ref(self) -> bool {
        !matches!(self, ParamMode::In)
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterInfo {
    pub name: String,
    pub ty: TypeHandle,
    pub mode: ParamMode,
}

impl ParameterInfo {
    pub fn new(name: impl Into<String>, ty: TypeHandle) -> Self {
        Self {
            name: name.into(),
            ty,
            mode: ParamMode::In,
        }
    }

    pub fn by_ref(name: impl Into<String>, ty: TypeHandle) -> Self {
        Self {
            mode: ParamMode::Ref,
            ..Self::new(name, ty)
        }
    }

    pub fn out(name: impl Into<String>, ty: TypeHandle) -> Self {
        Self {
            mode: ParamMode::Out,
            ..Self::new(name, ty)
        }
    }
}

pub type InstanceGetter = Arc<dyn Fn(&dyn Any) -> InvokeResult<Value> + Send + Sync>;
pub type InstanceSetter = Arc<dyn Fn(&mut dyn Any, Value) -> InvokeResult<()> + Send + Sync>;
pub type StaticGetter = Arc<dyn Fn() -> InvokeResult<Value> + Send + Sync>;
pub type StaticSetter = Arc<dyn Fn(Value) -> InvokeResult<()> + Send + Sync>;

/// Storage of a field.
#[derive(Clone)]
pub enum FieldAccess {
    /// Per-instance storage; `set` is `None` for read-only fields
    Instance {
        get: InstanceGetter,
        set: Option<InstanceSetter>,
    },
    /// Type-wide storage
    Static {
        get: StaticGetter,
        set: Option<StaticSetter>,
    },
    /// Compile-time constant, e.g. an enum member
    Literal(Value),
}

/// Field descriptor.
#[derive(Clone)]
pub struct FieldInfo {
    pub name: String,
    pub ty: TypeHandle,
    pub visibility: Visibility,
    pub access: FieldAccess,
    pub attributes: Vec<Attribute>,
}

impl FieldInfo {
    /// Read-write instance field of `T`.
    ///
    /// `set` receives a value already cast to `ty`.
    pub fn instance<T, G, S>(name: impl Into<String>, ty: TypeHandle, get: G, set: S) -> Self
    where
        T: Any,
        G: Fn(&T) -> Value + Send + Sync + 'static,
        S: Fn(&mut T, Value) -> InvokeResult<()> + Send + Sync + 'static,
    {
        let setter: InstanceSetter = Arc::new(move |this: &mut dyn Any, value: Value| {
            let this = this
                .downcast_mut::<T>()
                .ok_or_else(InvokeError::target_mismatch::<T>)?;
            set(this, value)
        });
        Self::with_access(
            name,
            ty,
            FieldAccess::Instance {
                get: instance_getter(get),
                set: Some(setter),
            },
        )
    }

    /// Instance field of `T` without a setter.
    pub fn readonly<T, G>(name: impl Into<String>, ty: TypeHandle, get: G) -> Self
    where
        T: Any,
        G: Fn(&T) -> Value + Send + Sync + 'static,
    {
        Self::with_access(
            name,
            ty,
            FieldAccess::Instance {
                get: instance_getter(get),
                set: None,
            },
        )
    }

    pub fn static_field<G, S>(name: impl Into<String>, ty: TypeHandle, get: G, set: S) -> Self
    where
        G: Fn() -> Value + Send + Sync + 'static,
        S: Fn(Value) -> InvokeResult<()> + Send + Sync + 'static,
    {
        let setter: StaticSetter = Arc::new(set);
        Self::with_access(
            name,
            ty,
            FieldAccess::Static {
                get: static_getter(get),
                set: Some(setter),
            },
        )
    }

    pub fn static_readonly<G>(name: impl Into<String>, ty: TypeHandle, get: G) -> Self
    where
        G: Fn() -> Value + Send + Sync + 'static,
    {
        Self::with_access(
            name,
            ty,
            FieldAccess::Static {
                get: static_getter(get),
                set: None,
            },
        )
    }

    pub fn literal(name: impl Into<String>, ty: TypeHandle, value: Value) -> Self {
        Self::with_access(name, ty, FieldAccess::Literal(value))
    }

    pub fn with_access(name: impl Into<String>, ty: TypeHandle, access: FieldAccess) -> Self {
        Self {
            name: name.into(),
            ty,
            visibility: Visibility::Public,
            access,
            attributes: Vec::new(),
        }
    }

    pub fn non_public(mut self) -> Self {
        self.visibility = Visibility::NonPublic;
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn is_static(&self) -> bool {
        !matches!(self.access, FieldAccess::Instance { .. })
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.access, FieldAccess::Literal(_))
    }

    pub fn is_writable(&self) -> bool {
        match &self.access {
            FieldAccess::Instance { set, .. } => set.is_some(),
            FieldAccess::Static { set, .. } => set.is_some(),
            FieldAccess::Literal(_) => false,
        }
    }

    /// Compiler-generated backing storage (`<Name>k__BackingField` style names).
    pub fn is_backing_field(&self) -> bool {
        self.name.starts_with('<')
    }
}

fn instance_getter<T, G>(get: G) -> InstanceGetter
where
    T: Any,
    G: Fn(&T) -> Value + Send + Sync + 'static,
{
    Arc::new(move |this: &dyn Any| {
        let this = this
            .downcast_ref::<T>()
            .ok_or_else(InvokeError::target_mismatch::<T>)?;
        Ok::<_, InvokeError>(get(this))
    })
}

fn static_getter<G>(get: G) -> StaticGetter
where
    G: Fn() -> Value + Send + Sync + 'static,
{
    Arc::new(move || Ok::<_, InvokeError>(get()))
}

impl fmt::Debug for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldInfo")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("visibility", &self.visibility)
            .field("static", &self.is_static())
            .field("writable", &self.is_writable())
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Property descriptor.
///
/// A property owns no storage; reads and writes go through its accessor
/// methods, looked up by name on the declaring type.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyInfo {
    pub name: String,
    pub ty: TypeHandle,
    pub visibility: Visibility,
    pub is_static: bool,
    /// Index parameter types; empty for plain properties
    pub index_types: Vec<TypeHandle>,
    pub getter: Option<String>,
    pub setter: Option<String>,
    pub attributes: Vec<Attribute>,
}

impl PropertyInfo {
    pub fn is_indexer(&self) -> bool {
        !self.index_types.is_empty()
    }
}

/// Instance a method body runs against.
pub enum Receiver<'a> {
    /// Read-only view; the instance lock is held shared
    Shared(&'a dyn Any),
    /// Mutable view of the instance or of a value-type local
    Exclusive(&'a mut dyn Any),
}

impl Receiver<'_> {
    pub fn as_any(&self) -> &dyn Any {
        match self {
            Receiver::Shared(this) => *this,
            Receiver::Exclusive(this) => &**this,
        }
    }
}

/// Arguments handed to a method body.
///
/// `args` are already cast to the declared parameter types; by-ref slots are
/// locals that are copied back to the caller after the body returns.
pub struct Invocation<'a> {
    pub this: Option<Receiver<'a>>,
    pub args: &'a mut [Value],
    pub type_args: &'a [TypeHandle],
}

pub type MethodBody = Arc<dyn for<'a> Fn(Invocation<'a>) -> InvokeResult<Value> + Send + Sync>;

/// Erases a body closure into a [`MethodBody`].
pub fn method_body<F>(body: F) -> MethodBody
where
    F: for<'a> Fn(Invocation<'a>) -> InvokeResult<Value> + Send + Sync + 'static,
{
    Arc::new(body)
}

/// Method descriptor.
#[derive(Clone)]
pub struct MethodInfo {
    pub name: String,
    pub params: Vec<ParameterInfo>,
    pub ret: TypeHandle,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_virtual: bool,
    pub generic_arity: usize,
    /// Whether the body needs a mutable receiver
    pub mutates_this: bool,
    /// Vtable slot, assigned at registration for virtual methods
    pub slot: Option<usize>,
    pub attributes: Vec<Attribute>,
    pub(crate) body: MethodBody,
}

impl MethodInfo {
    pub fn new(
        name: impl Into<String>,
        params: Vec<ParameterInfo>,
        ret: TypeHandle,
        is_static: bool,
        body: MethodBody,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
            visibility: Visibility::Public,
            is_static,
            is_virtual: false,
            generic_arity: 0,
            mutates_this: !is_static,
            slot: None,
            attributes: Vec::new(),
            body,
        }
    }

    /// Instance method of `T`.
    pub fn instance<T, F>(
        name: impl Into<String>,
        params: Vec<ParameterInfo>,
        ret: TypeHandle,
        body: F,
    ) -> Self
    where
        T: Any,
        F: Fn(&mut T, &mut [Value]) -> InvokeResult<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        let missing = format!("instance method {name} invoked without a target");
        let body = method_body(move |inv| {
            let this = match inv.this {
                Some(Receiver::Exclusive(this)) => this,
                Some(Receiver::Shared(_)) => {
                    return Err(InvokeError::TargetMismatch(format!(
                        "{} needs a mutable instance",
                        std::any::type_name::<T>()
                    )))
                }
                None => return Err(InvokeError::NullReference(missing.clone())),
            };
            let this = this
                .downcast_mut::<T>()
                .ok_or_else(InvokeError::target_mismatch::<T>)?;
            body(this, inv.args)
        });
        Self::new(name, params, ret, false, body)
    }

    /// Instance method of `T` that only reads its receiver.
    ///
    /// Object targets stay share-locked while the body runs, so the body may
    /// read an argument that aliases the target.
    pub fn instance_ref<T, F>(
        name: impl Into<String>,
        params: Vec<ParameterInfo>,
        ret: TypeHandle,
        body: F,
    ) -> Self
    where
        T: Any,
        F: Fn(&T, &mut [Value]) -> InvokeResult<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        let missing = format!("instance method {name} invoked without a target");
        let body = method_body(move |inv| {
            let this = inv
                .this
                .ok_or_else(|| InvokeError::NullReference(missing.clone()))?;
            let this = this
                .as_any()
                .downcast_ref::<T>()
                .ok_or_else(InvokeError::target_mismatch::<T>)?;
            body(this, inv.args)
        });
        let mut method = Self::new(name, params, ret, false, body);
        method.mutates_this = false;
        method
    }

    pub fn static_fn<F>(
        name: impl Into<String>,
        params: Vec<ParameterInfo>,
        ret: TypeHandle,
        body: F,
    ) -> Self
    where
        F: Fn(&mut [Value]) -> InvokeResult<Value> + Send + Sync + 'static,
    {
        Self::new(name, params, ret, true, method_body(move |inv| body(inv.args)))
    }

    pub fn non_public(mut self) -> Self {
        self.visibility = Visibility::NonPublic;
        self
    }

    /// Marks the method virtual; a same-signature virtual in a derived type overrides it.
    pub fn as_virtual(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    pub fn generic(mut self, arity: usize) -> Self {
        self.generic_arity = arity;
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn body(&self) -> &MethodBody {
        &self.body
    }

    pub fn param_types(&self) -> Vec<TypeHandle> {
        self.params.iter().map(|p| p.ty).collect()
    }

    pub fn returns_void(&self) -> bool {
        self.ret == TypeHandle::void()
    }

    /// `get_X` / `set_X` accessor naming.
    pub fn is_property_accessor(&self) -> bool {
        self.name.starts_with("get_") || self.name.starts_with("set_")
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInfo")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("ret", &self.ret)
            .field("visibility", &self.visibility)
            .field("is_static", &self.is_static)
            .field("is_virtual", &self.is_virtual)
            .field("generic_arity", &self.generic_arity)
            .field("mutates_this", &self.mutates_this)
            .field("slot", &self.slot)
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Position of a method inside its declaring type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub declaring: TypeHandle,
    pub index: usize,
}

pub type ConstructorBody = Arc<dyn Fn(&mut [Value]) -> InvokeResult<Value> + Send + Sync>;

/// Constructor descriptor; the body returns the boxed new instance.
#[derive(Clone)]
pub struct ConstructorInfo {
    pub params: Vec<ParameterInfo>,
    pub visibility: Visibility,
    pub attributes: Vec<Attribute>,
    pub(crate) body: ConstructorBody,
}

impl ConstructorInfo {
    pub fn body(&self) -> &ConstructorBody {
        &self.body
    }

    pub fn param_types(&self) -> Vec<TypeHandle> {
        self.params.iter().map(|p| p.ty).collect()
    }
}

impl fmt::Debug for ConstructorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorInfo")
            .field("params", &self.params)
            .field("visibility", &self.visibility)
            .field("attributes", &self.attributes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Counter {
        hits: i32,
    }

    #[test]
    fn test_instance_field_thunks() {
        let field = FieldInfo::instance(
            "Hits",
            TypeHandle::of::<i32>(),
            |c: &Counter| Value::I32(c.hits),
            |c: &mut Counter, v| {
                c.hits = v.as_i32().unwrap_or_default();
                Ok(())
            },
        );
        let mut counter = Counter::default();
        let FieldAccess::Instance { get, set } = &field.access else {
            panic!("expected instance storage");
        };
        set.as_ref().unwrap()(&mut counter, Value::I32(7)).unwrap();
        assert_eq!(get(&counter).unwrap(), Value::I32(7));
        assert!(field.is_writable());
        assert!(!field.is_static());
    }

    #[test]
    fn test_getter_rejects_foreign_instance() {
        let field = FieldInfo::readonly("Hits", TypeHandle::of::<i32>(), |c: &Counter| {
            Value::I32(c.hits)
        });
        let FieldAccess::Instance { get, .. } = &field.access else {
            panic!("expected instance storage");
        };
        assert!(matches!(get(&5u8), Err(InvokeError::TargetMismatch(_))));
        assert!(!field.is_writable());
    }

    #[test]
    fn test_instance_method_requires_target() {
        let method = MethodInfo::instance(
            "Bump",
            vec![],
            TypeHandle::void(),
            |c: &mut Counter, _args| {
                c.hits += 1;
                Ok(Value::Null)
            },
        );
        let mut args: Vec<Value> = Vec::new();
        let result = (method.body())(Invocation {
            this: None,
            args: &mut args,
            type_args: &[],
        });
        assert!(matches!(result, Err(InvokeError::NullReference(_))));

        let mut counter = Counter::default();
        let target: &mut dyn Any = &mut counter;
        (method.body())(Invocation {
            this: Some(Receiver::Exclusive(target)),
            args: &mut args,
            type_args: &[],
        })
        .unwrap();
        assert_eq!(counter.hits, 1);
        assert!(method.returns_void());
        assert!(method.mutates_this);

        let shared = (method.body())(Invocation {
            this: Some(Receiver::Shared(&counter)),
            args: &mut args,
            type_args: &[],
        });
        assert!(matches!(shared, Err(InvokeError::TargetMismatch(_))));
    }

    #[test]
    fn test_read_only_method_accepts_either_receiver() {
        let method = MethodInfo::instance_ref(
            "Hits",
            vec![],
            TypeHandle::of::<i32>(),
            |c: &Counter, _args| Ok(Value::I32(c.hits)),
        );
        assert!(!method.mutates_this);

        let mut counter = Counter { hits: 3 };
        let mut args: Vec<Value> = Vec::new();
        let read = (method.body())(Invocation {
            this: Some(Receiver::Shared(&counter)),
            args: &mut args,
            type_args: &[],
        });
        assert_eq!(read, Ok(Value::I32(3)));
        let written = (method.body())(Invocation {
            this: Some(Receiver::Exclusive(&mut counter)),
            args: &mut args,
            type_args: &[],
        });
        assert_eq!(written, Ok(Value::I32(3)));
    }

    #[test]
    fn test_param_modes() {
        let ty = TypeHandle::of::<i32>();
        assert!(!ParameterInfo::new("a", ty).mode.is_by_ref());
        assert!(ParameterInfo::by_ref("b", ty).mode.is_by_ref());
        assert_eq!(ParameterInfo::out("c", ty).mode, ParamMode::Out);
    }

    #[test]
    fn test_member_attributes() {
        let field = FieldInfo::readonly("Hits", TypeHandle::of::<i32>(), |c: &Counter| {
            Value::I32(c.hits)
        })
        .with_attribute(Attribute::marker("Indexed"))
        .with_attribute(Attribute::new("Column", Value::str("hits")));
        assert_eq!(field.attributes.len(), 2);
        assert!(field.attributes[0].is("Indexed"));
        assert_eq!(field.attributes[0].value, Value::Null);
        assert_eq!(field.attributes[1].value, Value::str("hits"));

        let method = MethodInfo::static_fn("Reset", vec![], TypeHandle::void(), |_| {
            Ok(Value::Null)
        })
        .with_attribute(Attribute::marker("Obsolete"));
        assert!(method.attributes.iter().any(|a| a.is("Obsolete")));
    }
}
