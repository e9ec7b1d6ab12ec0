//! Convenience API over the global reflector
//!
//! Each call requests its accessor from [`global()`](crate::global) using the
//! runtime type of the value it is called on, so repeated calls hit the
//! cache. Method and constructor parameter types are inferred from the
//! arguments' runtime types (`Null` infers `Object`); a [`ValueCell`]
//! argument or target stands for the value it holds.
//!
//! ```ignore
//! use rapidflect_core::{ReflectExt, TypeExt};
//!
//! let person = TypeHandle::of::<Person>().create_instance(&mut ["Ada".into(), 36.into()])?;
//! person.set_property_value("Name", "Grace")?;
//! let greeting = person.call_method("Describe", &mut [])?;
//! ```
//!
//! [`ValueCell`]: crate::meta::ValueCell

use crate::attributes::{self, AttributeProvider};
use crate::error::{ReflectError, ReflectResult};
use crate::flags::MemberKinds;
use crate::meta::{registry, Attribute, InvokeError, TypeHandle, Value};
use crate::lenient;
use crate::reflector::{global, Reflector};

/// Reflection helpers on instances.
pub trait ReflectExt {
    fn get_field_value(&self, name: &str) -> ReflectResult<Value>;
    fn set_field_value(&self, name: &str, value: impl Into<Value>) -> ReflectResult<()>;
    fn get_property_value(&self, name: &str) -> ReflectResult<Value>;
    fn set_property_value(&self, name: &str, value: impl Into<Value>) -> ReflectResult<()>;

    /// Reads a field named `name`, or else a property.
    fn get_member_value(&self, name: &str) -> ReflectResult<Value>;
    fn set_member_value(&self, name: &str, value: impl Into<Value>) -> ReflectResult<()>;

    /// Calls an instance method; by-ref results are written back into `args`.
    fn call_method(&self, name: &str, args: &mut [Value]) -> ReflectResult<Value>;

    /// Copies every same-named field and property onto `target`.
    fn map(&self, target: &Value) -> ReflectResult<()>;
    fn map_fields(&self, target: &Value, names: &[&str]) -> ReflectResult<()>;
    fn map_properties(&self, target: &Value, names: &[&str]) -> ReflectResult<()>;
    fn map_fields_to_properties(&self, target: &Value, names: &[&str]) -> ReflectResult<()>;
    fn map_properties_to_fields(&self, target: &Value, names: &[&str]) -> ReflectResult<()>;

    /// Calls the first instance method named `name` that accepts `values`
    /// after conversion.
    fn try_call_method_with_values(&self, name: &str, values: &[Value]) -> ReflectResult<Value>;
}

/// Reflection helpers on types.
pub trait TypeExt {
    fn call_static(self, name: &str, args: &mut [Value]) -> ReflectResult<Value>;

    /// Creates an instance with the constructor matching the arguments.
    fn create_instance(self, args: &mut [Value]) -> ReflectResult<Value>;

    /// Creates an instance from named values; see [`lenient`](crate::lenient).
    fn try_create_instance(self, inputs: &[(&str, Value)]) -> ReflectResult<Value>;
    fn try_create_instance_from(self, sample: &Value) -> ReflectResult<Value>;
    fn try_create_instance_with_values(self, values: &[Value]) -> ReflectResult<Value>;
    fn try_call_static_with_values(self, name: &str, values: &[Value]) -> ReflectResult<Value>;

    /// The first attribute named `name` on the type itself.
    fn type_attribute(self, name: &str) -> Option<Attribute>;
    fn has_type_attribute(self, name: &str) -> bool;

    fn inherits(self, base: TypeHandle) -> bool;
    fn implements(self, interface: TypeHandle) -> bool;
    fn inherits_or_implements(self, base: TypeHandle) -> bool;
}

fn target_type(value: &Value) -> ReflectResult<TypeHandle> {
    registry().type_of(value).ok_or_else(|| {
        ReflectError::Invoke(InvokeError::NullReference(
            "reflection target is null".to_string(),
        ))
    })
}

fn arg_types(args: &[Value]) -> Vec<TypeHandle> {
    let reg = registry();
    args.iter()
        .map(|arg| reg.type_of(arg).unwrap_or_else(TypeHandle::object))
        .collect()
}

fn map_with(
    source: &Value,
    target: &Value,
    source_kinds: MemberKinds,
    target_kinds: MemberKinds,
    names: &[&str],
) -> ReflectResult<()> {
    let reflector: &Reflector = global();
    let mapper = reflector.mapper_with(
        target_type(source)?,
        target_type(target)?,
        source_kinds,
        target_kinds,
        names,
        reflector.default_flags(),
    )?;
    Ok(mapper.map(source, target)?)
}

impl ReflectExt for Value {
    fn get_field_value(&self, name: &str) -> ReflectResult<Value> {
        let getter = global().field_getter(target_type(self)?, name)?;
        Ok(getter.get(self)?)
    }

    fn set_field_value(&self, name: &str, value: impl Into<Value>) -> ReflectResult<()> {
        let setter = global().field_setter(target_type(self)?, name)?;
        Ok(setter.set(self, value)?)
    }

    fn get_property_value(&self, name: &str) -> ReflectResult<Value> {
        let getter = global().property_getter(target_type(self)?, name)?;
        Ok(getter.get(self)?)
    }

    fn set_property_value(&self, name: &str, value: impl Into<Value>) -> ReflectResult<()> {
        let setter = global().property_setter(target_type(self)?, name)?;
        Ok(setter.set(self, value)?)
    }

    fn get_member_value(&self, name: &str) -> ReflectResult<Value> {
        let getter = global().member_getter(target_type(self)?, name)?;
        Ok(getter.get(self)?)
    }

    fn set_member_value(&self, name: &str, value: impl Into<Value>) -> ReflectResult<()> {
        let setter = global().member_setter(target_type(self)?, name)?;
        Ok(setter.set(self, value)?)
    }

    fn call_method(&self, name: &str, args: &mut [Value]) -> ReflectResult<Value> {
        let invoker = global().method(target_type(self)?, name, &arg_types(args))?;
        Ok(invoker.invoke(self, args)?)
    }

    fn map(&self, target: &Value) -> ReflectResult<()> {
        map_with(self, target, MemberKinds::ALL, MemberKinds::ALL, &[])
    }

    fn map_fields(&self, target: &Value, names: &[&str]) -> ReflectResult<()> {
        map_with(self, target, MemberKinds::FIELD, MemberKinds::FIELD, names)
    }

    fn map_properties(&self, target: &Value, names: &[&str]) -> ReflectResult<()> {
        map_with(self, target, MemberKinds::PROPERTY, MemberKinds::PROPERTY, names)
    }

    fn map_fields_to_properties(&self, target: &Value, names: &[&str]) -> ReflectResult<()> {
        map_with(self, target, MemberKinds::FIELD, MemberKinds::PROPERTY, names)
    }

    fn map_properties_to_fields(&self, target: &Value, names: &[&str]) -> ReflectResult<()> {
        map_with(self, target, MemberKinds::PROPERTY, MemberKinds::FIELD, names)
    }

    fn try_call_method_with_values(&self, name: &str, values: &[Value]) -> ReflectResult<Value> {
        lenient::try_call_method_with_values(global(), target_type(self)?, Some(self), name, values)
    }
}

impl TypeExt for TypeHandle {
    fn call_static(self, name: &str, args: &mut [Value]) -> ReflectResult<Value> {
        let invoker = global().static_method(self, name, &arg_types(args))?;
        Ok(invoker.invoke_static(args)?)
    }

    fn create_instance(self, args: &mut [Value]) -> ReflectResult<Value> {
        let ctor = global().constructor(self, &arg_types(args))?;
        Ok(ctor.create(args)?)
    }

    fn try_create_instance(self, inputs: &[(&str, Value)]) -> ReflectResult<Value> {
        lenient::try_create_instance(global(), self, inputs)
    }

    fn try_create_instance_from(self, sample: &Value) -> ReflectResult<Value> {
        lenient::try_create_instance_from(global(), self, sample)
    }

    fn try_create_instance_with_values(self, values: &[Value]) -> ReflectResult<Value> {
        lenient::try_create_instance_with_values(global(), self, values)
    }

    fn try_call_static_with_values(self, name: &str, values: &[Value]) -> ReflectResult<Value> {
        lenient::try_call_method_with_values(global(), self, None, name, values)
    }

    fn type_attribute(self, name: &str) -> Option<Attribute> {
        registry().get(self)?.attribute(name).cloned()
    }

    fn has_type_attribute(self, name: &str) -> bool {
        self.type_attribute(name).is_some()
    }

    fn inherits(self, base: TypeHandle) -> bool {
        attributes::inherits(self, base)
    }

    fn implements(self, interface: TypeHandle) -> bool {
        attributes::implements(self, interface)
    }

    fn inherits_or_implements(self, base: TypeHandle) -> bool {
        attributes::inherits_or_implements(self, base)
    }
}
