//! Field and property accessors

use super::{invoke, type_info, unexpected};
use crate::accessor::{ReadFn, WriteFn};
use crate::error::{ReflectError, ReflectResult};
use crate::meta::{registry, FieldAccess, FieldInfo, MethodRef, TypeHandle, Value};
use crate::resolver::MemberHandle;
use crate::value_cell::{require_writable_target, with_instance_mut, with_instance_ref, WriteBack};

/// Read closure for a resolved field or property.
pub(crate) fn compile_read(member: &MemberHandle) -> ReflectResult<ReadFn> {
    match member {
        MemberHandle::Field { declaring, index } => {
            let field = field_info(*declaring, *index)?;
            Ok(field_reader(*declaring, field))
        }
        MemberHandle::Property { accessor, .. } => {
            // Getters run against a local copy of a value-type target.
            let call = invoke::compile_call(*accessor, &[], WriteBack::Discard)?;
            Ok(Box::new(move |target: &Value| call(target, &mut [])))
        }
        other => Err(unexpected(other, "a readable member")),
    }
}

/// Write closure for a resolved field or property.
pub(crate) fn compile_write(member: &MemberHandle) -> ReflectResult<WriteFn> {
    match member {
        MemberHandle::Field { declaring, index } => {
            let field = field_info(*declaring, *index)?;
            field_writer(*declaring, field)
        }
        MemberHandle::Property { accessor, .. } => {
            let is_static = accessor_is_static(*accessor)?;
            let call = invoke::compile_call(*accessor, &[], WriteBack::Store)?;
            Ok(Box::new(move |target: &Value, value: Value| {
                if !is_static {
                    require_writable_target(target)?;
                }
                let mut args = [value];
                call(target, &mut args).map(|_| ())
            }))
        }
        other => Err(unexpected(other, "a writable member")),
    }
}

fn field_info(declaring: TypeHandle, index: usize) -> ReflectResult<FieldInfo> {
    let info = type_info(declaring)?;
    info.fields()
        .get(index)
        .cloned()
        .ok_or_else(|| ReflectError::AmbiguousOperation(format!("{} has no field #{index}", info.name())))
}

fn accessor_is_static(accessor: MethodRef) -> ReflectResult<bool> {
    let info = type_info(accessor.declaring)?;
    info.methods()
        .get(accessor.index)
        .map(|m| m.is_static)
        .ok_or_else(|| ReflectError::AmbiguousOperation(format!("{} has no method #{}", info.name(), accessor.index)))
}

fn field_reader(declaring: TypeHandle, field: FieldInfo) -> ReadFn {
    match field.access {
        FieldAccess::Literal(value) => Box::new(move |_: &Value| Ok(value.clone())),
        FieldAccess::Static { get, .. } => Box::new(move |_: &Value| get()),
        FieldAccess::Instance { get, .. } => Box::new(move |target: &Value| {
            with_instance_ref(target, declaring, |this| get(this))
        }),
    }
}

fn field_writer(declaring: TypeHandle, field: FieldInfo) -> ReflectResult<WriteFn> {
    let ty = field.ty;
    match field.access {
        FieldAccess::Static { set: Some(set), .. } => Ok(Box::new(move |_: &Value, value: Value| {
            set(registry().cast(value, ty)?)
        })),
        FieldAccess::Instance { set: Some(set), .. } => {
            Ok(Box::new(move |target: &Value, value: Value| {
                require_writable_target(target)?;
                let value = registry().cast(value, ty)?;
                with_instance_mut(target, declaring, WriteBack::Store, |this| {
                    set(this, value)
                })
            }))
        }
        _ => Err(ReflectError::MemberNotFound {
            type_name: declaring.name(),
            name: field.name,
            flags: Default::default(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Color, Person, Point};
    use crate::flags::Flags;
    use crate::meta::{InvokeError, ValueCell};
    use crate::resolver::MemberResolver;
    use crate::signature::{Direction, Signature};

    fn resolved(sig: Signature) -> MemberHandle {
        let mut working = sig;
        MemberResolver::new().resolve(&mut working).unwrap()
    }

    fn reader(ty: TypeHandle, name: &str, property: bool) -> ReadFn {
        let sig = if property {
            Signature::property(ty, name, Direction::Read, Flags::STATIC_INSTANCE_ANY_VISIBILITY)
        } else {
            Signature::field(ty, name, Direction::Read, Flags::STATIC_INSTANCE_ANY_VISIBILITY)
        };
        compile_read(&resolved(sig)).unwrap()
    }

    fn writer(ty: TypeHandle, name: &str, property: bool) -> WriteFn {
        let sig = if property {
            Signature::property(ty, name, Direction::Write, Flags::STATIC_INSTANCE_ANY_VISIBILITY)
        } else {
            Signature::field(ty, name, Direction::Write, Flags::STATIC_INSTANCE_ANY_VISIBILITY)
        };
        compile_write(&resolved(sig)).unwrap()
    }

    #[test]
    fn test_reference_type_round_trip() {
        let person = TypeHandle::of::<Person>();
        let target = Value::new_object(Person::new("Ada", 36));
        writer(person, "Age", false)(&target, Value::I32(37)).unwrap();
        assert_eq!(reader(person, "Age", false)(&target).unwrap(), Value::I32(37));

        writer(person, "Name", true)(&target, Value::str("Grace")).unwrap();
        assert_eq!(reader(person, "Name", true)(&target).unwrap(), Value::str("Grace"));
    }

    #[test]
    fn test_value_cell_field_write_back() {
        let point = TypeHandle::of::<Point>();
        let cell = Value::Cell(ValueCell::wrap(Point::new(1, 2)));
        writer(point, "X", false)(&cell, Value::I32(5)).unwrap();
        assert_eq!(reader(point, "X", false)(&cell).unwrap(), Value::I32(5));
        assert_eq!(reader(point, "Y", false)(&cell).unwrap(), Value::I32(2));
    }

    #[test]
    fn test_getter_side_effects_stay_local() {
        let point = TypeHandle::of::<Point>();
        let cell = ValueCell::wrap(Point::new(1, 2));
        let target = Value::Cell(cell.clone());
        let visits = reader(point, "Visits", true);
        assert_eq!(visits(&target).unwrap(), Value::I32(1));
        assert_eq!(visits(&target).unwrap(), Value::I32(1));
        assert_eq!(cell.read::<Point>().unwrap(), Point::new(1, 2));
    }

    #[test]
    fn test_value_is_cast_before_store() {
        let person = TypeHandle::of::<Person>();
        let target = Value::new_object(Person::new("Ada", 36));
        let err = writer(person, "Age", false)(&target, Value::str("old")).unwrap_err();
        assert!(matches!(err, InvokeError::InvalidCast { .. }));
    }

    #[test]
    fn test_cell_value_is_stored_by_content() {
        let person = TypeHandle::of::<Person>();
        let target = Value::new_object(Person::new("Ada", 36));
        let cell = ValueCell::new(Value::str("a"));
        writer(person, "secret", false)(&target, Value::Cell(cell.clone())).unwrap();
        writer(person, "Name", true)(&target, Value::Cell(cell.clone())).unwrap();
        cell.set(Value::str("b"));
        assert_eq!(reader(person, "secret", false)(&target).unwrap(), Value::str("a"));
        assert_eq!(reader(person, "Name", true)(&target).unwrap(), Value::str("a"));
    }

    #[test]
    fn test_boxed_struct_write_rejected() {
        let point = TypeHandle::of::<Point>();
        let boxed = Value::new_struct(Point::new(1, 2));
        assert!(matches!(
            writer(point, "X", false)(&boxed, Value::I32(5)),
            Err(InvokeError::TargetMismatch(_))
        ));
    }

    #[test]
    fn test_static_and_literal_fields() {
        let person = TypeHandle::of::<Person>();
        writer(person, "Population", false)(&Value::Null, Value::I32(8)).unwrap();
        assert_eq!(reader(person, "Population", false)(&Value::Null).unwrap(), Value::I32(8));

        let color = TypeHandle::of::<Color>();
        let green = reader(color, "Green", false)(&Value::Null).unwrap();
        assert_eq!(green.as_i64(), Some(Color::Green as i64));
    }

    #[test]
    fn test_null_instance() {
        let person = TypeHandle::of::<Person>();
        assert!(matches!(
            reader(person, "Age", false)(&Value::Null),
            Err(InvokeError::NullReference(_))
        ));
    }
}
