//! Manual type registration

use std::any::Any;
use std::sync::Arc;

use tracing::warn;

use crate::error::{InvokeError, InvokeResult};
use crate::members::{
    method_body, Attribute, ConstructorInfo, FieldInfo, Invocation, MethodInfo, MethodRef, ParameterInfo,
    PropertyInfo, Visibility,
};
use crate::registry::{Reflect, TypeRegistry};
use crate::types::{TypeHandle, TypeInfo, TypeKind, Upcast, UpcastFns};
use crate::value::{DynValue, EnumValue, ObjectRef, StructValue, Value};

type TypedConstructor<T> = Arc<dyn Fn(&mut [Value]) -> InvokeResult<T> + Send + Sync>;

struct PendingConstructor<T> {
    params: Vec<ParameterInfo>,
    visibility: Visibility,
    attributes: Vec<Attribute>,
    body: TypedConstructor<T>,
}

/// Describes a type for [`Reflect::describe`].
///
/// ```ignore
/// impl Reflect for Point {
///     fn describe() -> TypeBuilder<Self> {
///         TypeBuilder::value_type("Point")
///             .field(FieldInfo::instance("X", TypeHandle::of::<i32>(),
///                 |p: &Point| Value::I32(p.x),
///                 |p: &mut Point, v| { p.x = v.to()?; Ok(()) }))
///     }
/// }
/// ```
pub struct TypeBuilder<T> {
    name: String,
    kind: TypeKind,
    base: Option<TypeHandle>,
    interfaces: Vec<TypeHandle>,
    upcast: Option<Arc<dyn Upcast>>,
    element: Option<TypeHandle>,
    fields: Vec<FieldInfo>,
    properties: Vec<PropertyInfo>,
    methods: Vec<MethodInfo>,
    constructors: Vec<PendingConstructor<T>>,
    variants: Vec<(String, i64)>,
    attributes: Vec<Attribute>,
    member_attributes: Vec<(String, Attribute)>,
    zero: fn(TypeHandle) -> Value,
    wrap: fn(TypeHandle, T) -> Value,
}

impl<T: Any + Send + Sync> TypeBuilder<T> {
    fn with_kind(
        name: impl Into<String>,
        kind: TypeKind,
        zero: fn(TypeHandle) -> Value,
        wrap: fn(TypeHandle, T) -> Value,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            base: None,
            interfaces: Vec::new(),
            upcast: None,
            element: None,
            fields: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            variants: Vec::new(),
            attributes: Vec::new(),
            member_attributes: Vec::new(),
            zero,
            wrap,
        }
    }

    /// Reference type; instances are boxed as [`Value::Object`].
    pub fn class(name: impl Into<String>) -> Self {
        Self::with_kind(name, TypeKind::Class, |_| Value::Null, |ty, value| {
            Value::Object(ObjectRef::new(ty, value))
        })
    }

    /// Integral enumeration; add members with [`TypeBuilder::variant`].
    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::with_kind(
            name,
            TypeKind::Enum,
            |ty| Value::Enum(EnumValue::new(ty, 0)),
            |_, _| Value::Null,
        )
    }

    /// Interface type; classes and structs opt in with [`TypeBuilder::implements`].
    pub fn interface(name: impl Into<String>) -> Self {
        Self::with_kind(name, TypeKind::Interface, |_| Value::Null, |_, _| Value::Null)
    }

    /// Array type of `element`; the registry deduplicates it with
    /// [`TypeRegistry::array_of`].
    pub fn array_of(element: TypeHandle) -> Self {
        let mut builder =
            Self::with_kind(String::new(), TypeKind::Array, |_| Value::Null, |_, _| Value::Null);
        builder.element = Some(element);
        builder
    }

    pub(crate) fn primitive(
        name: impl Into<String>,
        kind: TypeKind,
        zero: fn(TypeHandle) -> Value,
    ) -> Self {
        Self::with_kind(name, kind, zero, |_, _| Value::Null)
    }

    /// Embeds `B` as the base class.
    ///
    /// The projections let members declared on `B` run against a `T`.
    pub fn base<B: Reflect>(mut self, get: fn(&T) -> &B, get_mut: fn(&mut T) -> &mut B) -> Self {
        self.base = Some(TypeHandle::of::<B>());
        self.upcast = Some(Arc::new(UpcastFns { get, get_mut }));
        self
    }

    /// Declares that the type implements interface `I`.
    pub fn implements<I: Reflect>(mut self) -> Self {
        let interface = TypeHandle::of::<I>();
        if !self.interfaces.contains(&interface) {
            self.interfaces.push(interface);
        }
        self
    }

    /// Attaches an attribute to the type itself.
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Attaches an attribute to every field, property, method and enum
    /// member named `member`, whenever it is added.
    pub fn member_attribute(mut self, member: impl Into<String>, attribute: Attribute) -> Self {
        self.member_attributes.push((member.into(), attribute));
        self
    }

    /// Attaches an attribute to the most recently added constructor.
    pub fn constructor_attribute(mut self, attribute: Attribute) -> Self {
        if let Some(last) = self.constructors.last_mut() {
            last.attributes.push(attribute);
        }
        self
    }

    pub fn field(mut self, field: FieldInfo) -> Self {
        self.fields.push(field);
        self
    }

    pub fn method(mut self, method: MethodInfo) -> Self {
        self.methods.push(method);
        self
    }

    /// Registers a property descriptor as-is; its accessors must be added
    /// separately with [`TypeBuilder::method`].
    pub fn property_info(mut self, property: PropertyInfo) -> Self {
        self.properties.push(property);
        self
    }

    /// Read-write instance property backed by `get_<name>` / `set_<name>`.
    pub fn property<G, S>(self, name: &str, ty: TypeHandle, get: G, set: S) -> Self
    where
        G: Fn(&mut T) -> InvokeResult<Value> + Send + Sync + 'static,
        S: Fn(&mut T, Value) -> InvokeResult<()> + Send + Sync + 'static,
    {
        let setter = MethodInfo::instance(
            format!("set_{name}"),
            vec![ParameterInfo::new("value", ty)],
            TypeHandle::void(),
            move |this: &mut T, args| {
                set(this, take_first(args))?;
                Ok(Value::Null)
            },
        );
        self.readonly_property(name, ty, get)
            .method(setter)
            .with_setter(name)
    }

    pub fn readonly_property<G>(self, name: &str, ty: TypeHandle, get: G) -> Self
    where
        G: Fn(&mut T) -> InvokeResult<Value> + Send + Sync + 'static,
    {
        let getter = MethodInfo::instance(
            format!("get_{name}"),
            Vec::new(),
            ty,
            move |this: &mut T, _args| get(this),
        );
        self.method(getter).property_info(PropertyInfo {
            name: name.to_string(),
            ty,
            visibility: Visibility::Public,
            is_static: false,
            index_types: Vec::new(),
            getter: Some(format!("get_{name}")),
            setter: None,
            attributes: Vec::new(),
        })
    }

    pub fn static_property<G, S>(self, name: &str, ty: TypeHandle, get: G, set: S) -> Self
    where
        G: Fn() -> InvokeResult<Value> + Send + Sync + 'static,
        S: Fn(Value) -> InvokeResult<()> + Send + Sync + 'static,
    {
        let getter = MethodInfo::static_fn(format!("get_{name}"), Vec::new(), ty, move |_| get());
        let setter = MethodInfo::static_fn(
            format!("set_{name}"),
            vec![ParameterInfo::new("value", ty)],
            TypeHandle::void(),
            move |args| {
                set(take_first(args))?;
                Ok(Value::Null)
            },
        );
        self.method(getter)
            .method(setter)
            .property_info(PropertyInfo {
                name: name.to_string(),
                ty,
                visibility: Visibility::Public,
                is_static: true,
                index_types: Vec::new(),
                getter: Some(format!("get_{name}")),
                setter: Some(format!("set_{name}")),
                attributes: Vec::new(),
            })
    }

    /// Indexed property `Item` backed by `get_Item` / `set_Item`.
    ///
    /// `get` receives the index arguments; `set` receives the index arguments
    /// followed by the value.
    pub fn indexer<G, S>(self, index: Vec<ParameterInfo>, ty: TypeHandle, get: G, set: S) -> Self
    where
        G: Fn(&mut T, &mut [Value]) -> InvokeResult<Value> + Send + Sync + 'static,
        S: Fn(&mut T, &mut [Value]) -> InvokeResult<()> + Send + Sync + 'static,
    {
        let index_types = index.iter().map(|p| p.ty).collect();
        let mut set_params = index.clone();
        set_params.push(ParameterInfo::new("value", ty));
        let getter = MethodInfo::instance("get_Item", index, ty, get);
        let setter = MethodInfo::instance("set_Item", set_params, TypeHandle::void(), {
            move |this: &mut T, args: &mut [Value]| {
                set(this, args)?;
                Ok(Value::Null)
            }
        });
        self.method(getter)
            .method(setter)
            .property_info(PropertyInfo {
                name: "Item".to_string(),
                ty,
                visibility: Visibility::Public,
                is_static: false,
                index_types,
                getter: Some("get_Item".to_string()),
                setter: Some("set_Item".to_string()),
                attributes: Vec::new(),
            })
    }

    /// Constructor returning a new `T`, boxed according to the type's kind.
    pub fn constructor<F>(mut self, params: Vec<ParameterInfo>, body: F) -> Self
    where
        F: Fn(&mut [Value]) -> InvokeResult<T> + Send + Sync + 'static,
    {
        self.constructors.push(PendingConstructor {
            params,
            visibility: Visibility::Public,
            attributes: Vec::new(),
            body: Arc::new(body),
        });
        self
    }

    /// Enum member with its underlying value.
    pub fn variant(mut self, name: impl Into<String>, value: i64) -> Self {
        self.variants.push((name.into(), value));
        self
    }

    /// Marks the most recently added constructor non-public.
    pub fn non_public_constructor(mut self) -> Self {
        if let Some(last) = self.constructors.last_mut() {
            last.visibility = Visibility::NonPublic;
        }
        self
    }

    fn with_setter(mut self, name: &str) -> Self {
        if let Some(property) = self.properties.iter_mut().rev().find(|p| p.name == name) {
            property.setter = Some(format!("set_{name}"));
        }
        self
    }

    pub(crate) fn element(&self) -> Option<TypeHandle> {
        self.element
    }

    pub(crate) fn build(self, handle: TypeHandle, registry: &TypeRegistry) -> TypeInfo {
        let wrap = self.wrap;
        let constructors = self
            .constructors
            .into_iter()
            .map(|pending| {
                let body = pending.body;
                ConstructorInfo {
                    params: pending.params,
                    visibility: pending.visibility,
                    attributes: pending.attributes,
                    body: Arc::new(move |args: &mut [Value]| {
                        Ok::<_, InvokeError>(wrap(handle, body(args)?))
                    }),
                }
            })
            .collect();

        let mut fields = self.fields;
        fields.extend(self.variants.into_iter().map(|(name, value)| {
            FieldInfo::literal(name, handle, Value::Enum(EnumValue::new(handle, value)))
        }));

        let mut properties = self.properties;
        let mut methods = self.methods;
        for (member, attribute) in self.member_attributes {
            for field in fields.iter_mut().filter(|f| f.name == member) {
                field.attributes.push(attribute.clone());
            }
            for property in properties.iter_mut().filter(|p| p.name == member) {
                property.attributes.push(attribute.clone());
            }
            for method in methods.iter_mut().filter(|m| m.name == member) {
                method.attributes.push(attribute.clone());
            }
        }

        let base = match self.kind {
            TypeKind::Object => None,
            _ => self.base.or(Some(registry.builtins().object)),
        };

        let vtable = build_vtable(handle, base, &mut methods, registry);

        TypeInfo {
            handle,
            name: self.name,
            kind: self.kind,
            base,
            interfaces: self.interfaces,
            element: self.element,
            fields,
            properties,
            methods,
            constructors,
            vtable,
            zero: (self.zero)(handle),
            upcast: self.upcast,
            attributes: self.attributes,
        }
    }
}

impl<T: DynValue + Default> TypeBuilder<T> {
    /// Value type; instances are boxed as [`Value::Struct`] and default to
    /// `T::default()`.
    pub fn value_type(name: impl Into<String>) -> Self {
        Self::with_kind(
            name,
            TypeKind::Struct,
            |ty| Value::Struct(StructValue::new(ty, T::default())),
            |ty, value| Value::Struct(StructValue::new(ty, value)),
        )
    }
}

/// Inherits the base vtable, then overrides or appends slots for this type's
/// virtual methods. Overrides match on name and parameter types.
fn build_vtable(
    handle: TypeHandle,
    base: Option<TypeHandle>,
    methods: &mut [MethodInfo],
    registry: &TypeRegistry,
) -> Vec<MethodRef> {
    let mut vtable = match base.and_then(|b| registry.get(b)) {
        Some(info) => info.vtable.clone(),
        None => {
            if let Some(b) = base {
                warn!("Base type {:?} of {:?} is not published yet, vtable starts empty", b, handle);
            }
            Vec::new()
        }
    };

    for (index, method) in methods.iter_mut().enumerate() {
        if !method.is_virtual || method.is_static {
            continue;
        }
        let this_ref = MethodRef {
            declaring: handle,
            index,
        };
        let param_types = method.param_types();
        let overridden = vtable.iter().position(|slot| {
            registry
                .get(slot.declaring)
                .and_then(|info| {
                    info.methods
                        .get(slot.index)
                        .map(|m| m.name == method.name && m.param_types() == param_types)
                })
                .unwrap_or(false)
        });
        match overridden {
            Some(slot) => {
                vtable[slot] = this_ref;
                method.slot = Some(slot);
            }
            None => {
                method.slot = Some(vtable.len());
                vtable.push(this_ref);
            }
        }
    }
    vtable
}

fn take_first(args: &mut [Value]) -> Value {
    args.first_mut().map(std::mem::take).unwrap_or_default()
}

/// Builds a [`MethodInfo`] whose body sees the raw [`Invocation`], including
/// generic type arguments.
pub fn generic_method<F>(
    name: impl Into<String>,
    arity: usize,
    params: Vec<ParameterInfo>,
    ret: TypeHandle,
    is_static: bool,
    body: F,
) -> MethodInfo
where
    F: for<'a> Fn(Invocation<'a>) -> InvokeResult<Value> + Send + Sync + 'static,
{
    MethodInfo::new(name, params, ret, is_static, method_body(body)).generic(arity)
}
