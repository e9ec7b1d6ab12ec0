//! Lenient construction and calls
//!
//! Picks a constructor or method from the values at hand instead of from an
//! exact parameter list, converting values between compatible types on the
//! way:
//!
//! ```text
//! [("name", "Ada"), ("age", "36"), ("secret", "x")]
//!        │
//!        ▼
//! score every constructor ──► cheapest valid plan
//!        │                         │
//!        │            ┌────────────┴────────────┐
//!        ▼            ▼                         ▼
//!   parameters   constructor(name, age)   set member "secret"
//! ```
//!
//! Inputs match parameters by name, ignoring case. An input without a
//! parameter is set on a writable property or field of the same name (or
//! `_name`) after construction. A plan is valid when every constructor
//! parameter has an input; among valid plans the one needing the fewest
//! member writes, reorderings and conversions wins, ties going to the
//! constructor declared first.
//!
//! The chosen constructor, method and member setters are requested from a
//! [`Reflector`], so repeated calls reuse the compiled accessors.

use tracing::{debug, trace};

use crate::error::{ReflectError, ReflectResult};
use crate::flags::{names_equal, Flags};
use crate::meta::{
    registry, EnumValue, FieldAccess, InvokeError, ParameterInfo, TypeHandle, TypeKind, Value,
    ValueCell,
};
use crate::query;
use crate::reflector::Reflector;
use crate::resolver::describe_types;

const MEMBER_WRITE_COST: u64 = 10;
const CONVERSION_COST: u64 = 1;
const PARTIAL_USE_COST: u64 = 100;
const REORDER_COST: u64 = 300;
const ANY_CONVERSION_COST: u64 = 600;

/// Converts `value` to `target`, or `None` when no conversion applies.
///
/// Besides assignment this covers numeric widening and checked narrowing,
/// strings parsed as numbers, booleans and enum member names, enums to and
/// from their integral value, and any primitive or enum formatted as a string.
pub fn convert(value: &Value, target: TypeHandle) -> Option<Value> {
    let reg = registry();
    let value = match value {
        Value::Cell(cell) => cell.get(),
        other => other.clone(),
    };
    let actual = reg.type_of(&value)?;
    if reg.is_assignable(target, actual) {
        return Some(value);
    }

    let b = reg.builtins();
    let target_kind = reg.get(target)?.kind();
    if target_kind == TypeKind::Enum {
        return to_enum(&value, target);
    }
    if target == b.string {
        return to_text(&value).map(Value::from);
    }
    if let Value::Str(text) = &value {
        return parse_text(text.trim(), target);
    }

    let number = match &value {
        Value::Bool(v) => Number::Int(i64::from(*v)),
        Value::I32(v) => Number::Int(i64::from(*v)),
        Value::I64(v) => Number::Int(*v),
        Value::F64(v) => Number::Float(*v),
        Value::Enum(e) => Number::Int(e.value),
        _ => return None,
    };
    number.to(target)
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn to(self, target: TypeHandle) -> Option<Value> {
        let b = registry().builtins();
        let integral = match self {
            Number::Int(v) => Some(v),
            Number::Float(v) if v.is_finite() => {
                let rounded = v.round();
                (rounded >= i64::MIN as f64 && rounded <= i64::MAX as f64).then_some(rounded as i64)
            }
            Number::Float(_) => None,
        };
        if target == b.int32 {
            integral.and_then(|v| i32::try_from(v).ok()).map(Value::I32)
        } else if target == b.int64 {
            integral.map(Value::I64)
        } else if target == b.float64 {
            Some(Value::F64(match self {
                Number::Int(v) => v as f64,
                Number::Float(v) => v,
            }))
        } else if target == b.boolean {
            Some(Value::Bool(match self {
                Number::Int(v) => v != 0,
                Number::Float(v) => v != 0.0,
            }))
        } else {
            None
        }
    }
}

fn parse_text(text: &str, target: TypeHandle) -> Option<Value> {
    let b = registry().builtins();
    if text.is_empty() {
        return None;
    }
    if target == b.boolean {
        match text.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(Value::Bool(true)),
            "0" | "false" | "no" | "off" => Some(Value::Bool(false)),
            _ => None,
        }
    } else if target == b.int32 {
        text.parse().ok().map(Value::I32)
    } else if target == b.int64 {
        text.parse().ok().map(Value::I64)
    } else if target == b.float64 {
        text.parse().ok().map(Value::F64)
    } else {
        None
    }
}

fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::Bool(v) => Some(v.to_string()),
        Value::I32(v) => Some(v.to_string()),
        Value::I64(v) => Some(v.to_string()),
        Value::F64(v) => Some(v.to_string()),
        Value::Str(v) => Some(v.to_string()),
        Value::Enum(e) => Some(enum_name(*e).unwrap_or_else(|| e.value.to_string())),
        _ => None,
    }
}

fn enum_name(value: EnumValue) -> Option<String> {
    let info = registry().get(value.ty)?;
    info.fields().iter().find_map(|field| match &field.access {
        FieldAccess::Literal(Value::Enum(member)) if *member == value => Some(field.name.clone()),
        _ => None,
    })
}

fn to_enum(value: &Value, target: TypeHandle) -> Option<Value> {
    match value {
        Value::Str(text) => {
            // Accept qualified names such as "Color.Green".
            let name = text.split(',').next()?.trim();
            let name = name.rsplit('.').next()?.trim();
            let info = registry().get(target)?;
            let member = info.fields().iter().find(|f| f.is_literal() && f.name == name);
            match member.map(|f| &f.access) {
                Some(FieldAccess::Literal(member)) => Some(member.clone()),
                _ => name
                    .parse::<i64>()
                    .ok()
                    .map(|v| Value::Enum(EnumValue::new(target, v))),
            }
        }
        Value::I32(v) => Some(Value::Enum(EnumValue::new(target, i64::from(*v)))),
        Value::I64(v) => Some(Value::Enum(EnumValue::new(target, *v))),
        Value::Enum(e) => Some(Value::Enum(EnumValue::new(target, e.value))),
        _ => None,
    }
}

/// How a value reaches a slot of type `ty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fit {
    Direct,
    Converted,
}

fn fit(value: &Value, ty: TypeHandle) -> Option<Fit> {
    let reg = registry();
    match reg.type_of(value) {
        None => (!reg.is_value_type(ty)).then_some(Fit::Direct),
        Some(actual) if reg.is_assignable(ty, actual) => Some(Fit::Direct),
        Some(_) => convert(value, ty).map(|_| Fit::Converted),
    }
}

fn coerce(value: &Value, ty: TypeHandle) -> ReflectResult<Value> {
    match fit(value, ty) {
        Some(Fit::Direct) => Ok(registry().cast(value.clone(), ty)?),
        Some(Fit::Converted) => convert(value, ty).ok_or_else(|| incompatible(value, ty)),
        None => Err(incompatible(value, ty)),
    }
}

fn incompatible(value: &Value, ty: TypeHandle) -> ReflectError {
    ReflectError::Invoke(InvokeError::InvalidCast {
        expected: ty.name(),
        found: value.describe(),
    })
}

/// A writable instance member an input is stored into after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MemberTarget {
    Field(String),
    Property(String),
}

impl MemberTarget {
    fn name(&self) -> &str {
        match self {
            MemberTarget::Field(name) | MemberTarget::Property(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Parameter(usize),
    Member(MemberTarget),
    Unused,
}

/// Placement of every input for one constructor.
#[derive(Debug)]
struct ConstructorPlan {
    params: Vec<TypeHandle>,
    slots: Vec<Slot>,
    cost: u64,
}

fn plan_constructor(
    ty: TypeHandle,
    params: &[ParameterInfo],
    inputs: &[(&str, Value)],
) -> ReflectResult<Option<ConstructorPlan>> {
    let mut used = vec![false; params.len()];
    let mut slots = Vec::with_capacity(inputs.len());
    let mut cost = 0;
    let mut in_order = true;
    let mut converted = false;
    let mut placed = 0;

    for (input, (name, value)) in inputs.iter().enumerate() {
        let mut slot = Slot::Unused;
        let mut mismatch = None;

        for (index, param) in params.iter().enumerate() {
            if used[index] || !names_equal(&param.name, name, true) {
                continue;
            }
            match fit(value, param.ty) {
                Some(how) => {
                    used[index] = true;
                    placed += 1;
                    in_order &= index == input;
                    if how == Fit::Converted {
                        converted = true;
                        cost += CONVERSION_COST;
                    }
                    slot = Slot::Parameter(index);
                    break;
                }
                None => {
                    mismatch = Some(format!(
                        "constructor parameter {} of type {}",
                        param.name,
                        param.ty.name()
                    ))
                }
            }
        }

        if slot == Slot::Unused {
            match writable_member(ty, name)? {
                Some((member, member_ty)) => match fit(value, member_ty) {
                    Some(how) => {
                        placed += 1;
                        cost += MEMBER_WRITE_COST;
                        if how == Fit::Converted {
                            converted = true;
                            cost += CONVERSION_COST;
                        }
                        slot = Slot::Member(member);
                    }
                    None => {
                        let what = mismatch.unwrap_or_else(|| {
                            format!("member {} of type {}", member.name(), member_ty.name())
                        });
                        return Err(input_mismatch(ty, name, value, &what));
                    }
                },
                None => {
                    if let Some(what) = mismatch {
                        return Err(input_mismatch(ty, name, value, &what));
                    }
                }
            }
        }
        slots.push(slot);
    }

    if used.iter().any(|u| !u) {
        return Ok(None);
    }
    if placed != params.len() {
        cost += PARTIAL_USE_COST;
    }
    if !in_order {
        cost += REORDER_COST;
    }
    if converted {
        cost += ANY_CONVERSION_COST;
    }
    Ok(Some(ConstructorPlan {
        params: params.iter().map(|p| p.ty).collect(),
        slots,
        cost,
    }))
}

fn input_mismatch(ty: TypeHandle, name: &str, value: &Value, what: &str) -> ReflectError {
    ReflectError::InvalidArgumentShape {
        member: format!("{}.{}", ty.name(), name),
        reason: format!(
            "input {name} of type {} is incompatible with {what} (conversion was not possible)",
            value.describe()
        ),
    }
}

/// A writable property named `name` or `_name`, else such a field.
fn writable_member(
    ty: TypeHandle,
    name: &str,
) -> ReflectResult<Option<(MemberTarget, TypeHandle)>> {
    let flags = Flags::INSTANCE_ANY_VISIBILITY | Flags::IGNORE_CASE;
    let underscored = format!("_{name}");
    let candidates = [name, underscored.as_str()];

    let property = candidates.iter().find_map(|candidate| {
        query::properties(ty, flags, &[*candidate])
            .ok()?
            .into_iter()
            .find(|p| !p.member.is_indexer())
    });
    if let Some(found) = property.filter(|p| p.member.setter.is_some()) {
        let property = found.member;
        return Ok(Some((MemberTarget::Property(property.name), property.ty)));
    }

    for candidate in candidates {
        let fields = query::fields(ty, flags, &[candidate])?;
        if let Some(found) = fields.into_iter().next() {
            let field = found.member;
            if field.is_writable() {
                return Ok(Some((MemberTarget::Field(field.name), field.ty)));
            }
        }
    }
    Ok(None)
}

/// Creates a `ty` from named values.
///
/// See the module docs for how the constructor is chosen. A value type
/// without a parameterless constructor can still be built from members: it
/// starts from its zero value.
pub fn try_create_instance(
    reflector: &Reflector,
    ty: TypeHandle,
    inputs: &[(&str, Value)],
) -> ReflectResult<Value> {
    let reg = registry();
    let mut candidates: Vec<Vec<ParameterInfo>> =
        query::constructors(ty, Flags::INSTANCE_ANY_VISIBILITY)?
            .into_iter()
            .map(|ctor| ctor.params)
            .collect();
    if reg.is_value_type(ty) && candidates.iter().all(|params| !params.is_empty()) {
        candidates.push(Vec::new());
    }

    let mut best: Option<ConstructorPlan> = None;
    for params in &candidates {
        let Some(plan) = plan_constructor(ty, params, inputs)? else {
            continue;
        };
        trace!(
            "Constructor {}({}) scores {}",
            ty.name(),
            describe_types(&plan.params),
            plan.cost
        );
        if best.as_ref().map_or(true, |b| plan.cost < b.cost) {
            best = Some(plan);
        }
    }

    let Some(plan) = best else {
        let values: Vec<Value> = inputs.iter().map(|(_, v)| v.clone()).collect();
        return Err(ReflectError::ConstructorNotFound {
            type_name: ty.name(),
            params: describe_values(inputs.iter().map(|(n, _)| *n), &values),
        });
    };
    debug!(
        "Creating {} through ({}) at cost {}",
        ty.name(),
        describe_types(&plan.params),
        plan.cost
    );

    let mut args: Vec<Value> = plan.params.iter().map(|p| reg.zero_value(*p)).collect();
    for (slot, (_, value)) in plan.slots.iter().zip(inputs) {
        if let Slot::Parameter(index) = slot {
            args[*index] = coerce(value, plan.params[*index])?;
        }
    }
    let ctor = reflector.constructor_with(ty, &plan.params, Flags::INSTANCE_ANY_VISIBILITY)?;
    let created = ctor.create(&mut args)?;

    let members: Vec<(&MemberTarget, &Value)> = plan
        .slots
        .iter()
        .zip(inputs)
        .filter_map(|(slot, (_, value))| match slot {
            Slot::Member(member) => Some((member, value)),
            _ => None,
        })
        .collect();
    if members.is_empty() {
        return Ok(created);
    }

    // Value types are written through a cell so the member writes stick.
    let target = match created {
        boxed @ Value::Struct(_) => Value::Cell(ValueCell::new(boxed)),
        other => other,
    };
    for (member, value) in members {
        let flags = Flags::INSTANCE_ANY_VISIBILITY;
        let (setter, member_ty) = match member {
            MemberTarget::Property(name) => (
                reflector.property_setter_with(ty, name, flags)?,
                query::property(ty, name, flags)?.member.ty,
            ),
            MemberTarget::Field(name) => (
                reflector.field_setter_with(ty, name, flags)?,
                query::field(ty, name, flags)?.member.ty,
            ),
        };
        setter.set(&target, coerce(value, member_ty)?)?;
    }
    Ok(match target {
        Value::Cell(cell) => cell.get(),
        other => other,
    })
}

/// Creates a `ty` from the public instance fields and properties of `sample`.
pub fn try_create_instance_from(
    reflector: &Reflector,
    ty: TypeHandle,
    sample: &Value,
) -> ReflectResult<Value> {
    let source = registry()
        .type_of(sample)
        .ok_or_else(|| InvokeError::NullReference("sample is null".to_string()))?;
    let flags = Flags::INSTANCE_PUBLIC;

    let mut names: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    for field in query::fields(source, flags, &[])? {
        values.push(reflector.field_getter_with(source, &field.member.name, flags)?.get(sample)?);
        names.push(field.member.name);
    }
    for property in query::properties(source, flags, &[])? {
        if property.member.is_indexer() || property.member.getter.is_none() {
            continue;
        }
        let getter = reflector.property_getter_with(source, &property.member.name, flags)?;
        values.push(getter.get(sample)?);
        names.push(property.member.name);
    }

    let inputs: Vec<(&str, Value)> = names.iter().map(String::as_str).zip(values).collect();
    try_create_instance(reflector, ty, &inputs)
}

/// Coerces `values` onto the first parameter list, in declaration order,
/// that accepts all of them.
fn first_accepting<'a>(
    candidates: impl IntoIterator<Item = &'a [ParameterInfo]>,
    values: &[Value],
) -> Option<(Vec<TypeHandle>, Vec<Value>)> {
    candidates
        .into_iter()
        .filter(|params| params.len() == values.len())
        .find_map(|params| {
            let args = params
                .iter()
                .zip(values)
                .map(|(param, value)| coerce(value, param.ty).ok())
                .collect::<Option<Vec<Value>>>()?;
            Some((params.iter().map(|p| p.ty).collect(), args))
        })
}

/// Creates a `ty` with the first constructor whose parameters accept
/// `values` in order, converting where needed.
pub fn try_create_instance_with_values(
    reflector: &Reflector,
    ty: TypeHandle,
    values: &[Value],
) -> ReflectResult<Value> {
    let flags = Flags::INSTANCE_ANY_VISIBILITY;
    let ctors = query::constructors(ty, flags)?;
    let accepted = first_accepting(ctors.iter().map(|c| c.params.as_slice()), values);
    let Some((params, mut args)) = accepted else {
        return Err(ReflectError::ConstructorNotFound {
            type_name: ty.name(),
            params: describe_values(std::iter::empty(), values),
        });
    };
    Ok(reflector.constructor_with(ty, &params, flags)?.create(&mut args)?)
}

/// Calls the first method named `name` whose parameters accept `values` in
/// order, converting where needed. `target` is `None` for static methods.
pub fn try_call_method_with_values(
    reflector: &Reflector,
    ty: TypeHandle,
    target: Option<&Value>,
    name: &str,
    values: &[Value],
) -> ReflectResult<Value> {
    let flags = match target {
        Some(_) => Flags::INSTANCE_ANY_VISIBILITY,
        None => Flags::STATIC_ANY_VISIBILITY,
    };
    let methods: Vec<_> = query::methods(ty, flags, &[name])?
        .into_iter()
        .filter(|m| m.member.generic_arity == 0)
        .collect();
    let Some((params, mut args)) =
        first_accepting(methods.iter().map(|m| m.member.params.as_slice()), values)
    else {
        return Err(ReflectError::MethodNotFound {
            type_name: ty.name(),
            name: name.to_string(),
            params: describe_values(std::iter::empty(), values),
            flags,
        });
    };

    let invoker = reflector.method_with(ty, name, &params, flags)?;
    let result = match target {
        Some(target) => invoker.invoke(target, &mut args)?,
        None => invoker.invoke_static(&mut args)?,
    };
    Ok(result)
}

fn describe_values<'a>(names: impl Iterator<Item = &'a str>, values: &[Value]) -> String {
    let mut names = names;
    values
        .iter()
        .map(|value| match names.next() {
            Some(name) => format!("{name}: {}", value.describe()),
            None => value.describe(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Badge, Color, Person, PersonRecord, Point};

    fn person_of(value: &Value) -> (String, i32) {
        value
            .as_object()
            .and_then(|o| o.with(|p: &Person| (p.name.clone(), p.age)))
            .unwrap()
    }

    #[test]
    fn test_convert_numbers_and_text() {
        let b = registry().builtins();
        assert_eq!(convert(&Value::str("36"), b.int32), Some(Value::I32(36)));
        assert_eq!(convert(&Value::str(" 2.5 "), b.float64), Some(Value::F64(2.5)));
        assert_eq!(convert(&Value::str("TRUE"), b.boolean), Some(Value::Bool(true)));
        assert_eq!(convert(&Value::str("off"), b.boolean), Some(Value::Bool(false)));
        assert_eq!(convert(&Value::str("abc"), b.int32), None);
        assert_eq!(convert(&Value::str(""), b.int64), None);

        assert_eq!(convert(&Value::I32(7), b.int64), Some(Value::I64(7)));
        assert_eq!(convert(&Value::I64(i64::MAX), b.int32), None);
        assert_eq!(convert(&Value::F64(2.6), b.int32), Some(Value::I32(3)));
        assert_eq!(convert(&Value::F64(f64::NAN), b.int32), None);
        assert_eq!(convert(&Value::I32(42), b.string), Some(Value::str("42")));
        assert_eq!(convert(&Value::Bool(true), b.int32), Some(Value::I32(1)));
    }

    #[test]
    fn test_convert_enums() {
        let color = TypeHandle::of::<Color>();
        let green = Value::Enum(EnumValue::new(color, Color::Green as i64));
        assert_eq!(convert(&Value::str("Green"), color), Some(green.clone()));
        assert_eq!(convert(&Value::str("Color.Green"), color), Some(green.clone()));
        assert_eq!(convert(&Value::I32(Color::Green as i32), color), Some(green.clone()));
        assert_eq!(convert(&green, TypeHandle::of::<String>()), Some(Value::str("Green")));
        assert_eq!(
            convert(&green, TypeHandle::of::<i64>()),
            Some(Value::I64(Color::Green as i64))
        );
        assert_eq!(convert(&Value::str("Purple"), color), None);
    }

    #[test]
    fn test_convert_keeps_assignable_values() {
        let person = Value::new_object(Person::new("Ada", 36));
        assert_eq!(convert(&person, TypeHandle::object()), Some(person.clone()));
        assert_eq!(convert(&person, TypeHandle::of::<String>()), None);
    }

    #[test]
    fn test_create_by_parameter_names() {
        let reflector = Reflector::new();
        let person = TypeHandle::of::<Person>();
        let created = try_create_instance(
            &reflector,
            person,
            &[("Name", Value::str("Ada")), ("AGE", Value::I32(36))],
        )
        .unwrap();
        assert_eq!(person_of(&created), ("Ada".to_string(), 36));
    }

    #[test]
    fn test_create_converts_and_sets_leftovers() {
        let reflector = Reflector::new();
        let person = TypeHandle::of::<Person>();
        let created = try_create_instance(
            &reflector,
            person,
            &[
                ("age", Value::str("36")),
                ("name", Value::str("Ada")),
                ("secret", Value::str("hidden")),
            ],
        )
        .unwrap();
        assert_eq!(person_of(&created), ("Ada".to_string(), 36));
        let secret = reflector
            .field_getter(person, "secret")
            .unwrap()
            .get(&created)
            .unwrap();
        assert_eq!(secret, Value::str("hidden"));
    }

    #[test]
    fn test_create_value_type_from_members() {
        let reflector = Reflector::new();
        let point = TypeHandle::of::<Point>();
        let created = try_create_instance(
            &reflector,
            point,
            &[("x", Value::I32(3)), ("y", Value::str("4"))],
        )
        .unwrap();
        assert_eq!(created.to::<Point>().unwrap(), Point::new(3, 4));
    }

    #[test]
    fn test_incompatible_input_is_reported() {
        let reflector = Reflector::new();
        let person = TypeHandle::of::<Person>();
        let result = try_create_instance(
            &reflector,
            person,
            &[("age", Value::new_object(Badge::new("x")))],
        );
        assert!(matches!(result, Err(ReflectError::InvalidArgumentShape { .. })));
    }

    #[test]
    fn test_create_from_sample() {
        let reflector = Reflector::new();
        let sample = Value::new_object(PersonRecord::new("Grace", 45));
        let created =
            try_create_instance_from(&reflector, TypeHandle::of::<Person>(), &sample).unwrap();
        assert_eq!(person_of(&created), ("Grace".to_string(), 45));
    }

    #[test]
    fn test_create_with_positional_values() {
        let reflector = Reflector::new();
        let person = TypeHandle::of::<Person>();
        let created = try_create_instance_with_values(
            &reflector,
            person,
            &[Value::str("Ada"), Value::I64(36)],
        )
        .unwrap();
        assert_eq!(person_of(&created), ("Ada".to_string(), 36));

        assert!(matches!(
            try_create_instance_with_values(&reflector, person, &vec![Value::Bool(true); 3]),
            Err(ReflectError::ConstructorNotFound { .. })
        ));
    }

    #[test]
    fn test_call_method_with_values() {
        let reflector = Reflector::new();
        let person = TypeHandle::of::<Person>();
        let target = Value::new_object(Person::new("Ada", 36));

        let call = |values: &[Value]| {
            try_call_method_with_values(&reflector, person, Some(&target), "AddYears", values)
        };
        assert_eq!(call(&[Value::str("4")]).unwrap(), Value::I32(40));

        let made =
            try_call_method_with_values(&reflector, person, None, "Create", &[Value::str("Linus")])
                .unwrap();
        assert_eq!(person_of(&made), ("Linus".to_string(), 0));

        assert!(matches!(
            call(&[Value::str("x")]),
            Err(ReflectError::MethodNotFound { .. })
        ));
    }
}
