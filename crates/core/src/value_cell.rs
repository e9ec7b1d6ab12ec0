//! Instance adapter for compiled accessors
//!
//! Every instance accessor receives its target as a [`Value`]. This module
//! turns that value into the `&dyn Any` / `&mut dyn Any` view a member thunk
//! expects:
//!
//! ```text
//! Object(obj)  ──► lock ──► project runtime type → declaring type ──► thunk
//! Cell(cell)   ──► copy slot ──► local ──► thunk ──► store local (writes only)
//! Struct(val)  ──► copy ──► local ──► thunk         (local is discarded)
//! Null         ──► NullReference
//! ```
//!
//! A cell is never locked while member code runs; the copy-in/write-back pair
//! brackets the call instead. Object locks are not re-entrant: member code
//! that touches its own write-locked target through an argument alias gets
//! [`InvokeError::Reentrant`] rather than blocking.

use std::any::Any;

use crate::meta::{registry, InvokeError, InvokeResult, StructValue, TypeHandle, Value};

/// Whether a mutated value-type local is stored back into its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteBack {
    Store,
    Discard,
}

/// Runs `f` against a shared view of `target` as `declaring`.
pub fn with_instance_ref<R>(
    target: &Value,
    declaring: TypeHandle,
    f: impl FnOnce(&dyn Any) -> InvokeResult<R>,
) -> InvokeResult<R> {
    match target {
        Value::Object(object) => {
            let guard = object.read()?;
            let data: &dyn Any = &**guard;
            let view = registry()
                .project_ref(object.type_handle(), declaring, data)
                .ok_or_else(|| mismatch(object.type_handle(), declaring))?;
            f(view)
        }
        Value::Struct(boxed) => {
            check_value_type(boxed, declaring)?;
            f(boxed.as_any())
        }
        Value::Cell(cell) => with_instance_ref(&cell.get(), declaring, f),
        Value::Null => Err(null_target(declaring)),
        other => Err(InvokeError::TargetMismatch(format!(
            "{} has no members of {}",
            other.describe(),
            declaring.name()
        ))),
    }
}

/// Runs `f` against a mutable view of `target` as `declaring`.
///
/// Value-type targets are unboxed into a local first. With
/// [`WriteBack::Store`] a cell receives the mutated local after `f` succeeds;
/// a failing `f` leaves the cell untouched.
pub fn with_instance_mut<R>(
    target: &Value,
    declaring: TypeHandle,
    write_back: WriteBack,
    f: impl FnOnce(&mut dyn Any) -> InvokeResult<R>,
) -> InvokeResult<R> {
    match target {
        Value::Object(object) => {
            let mut guard = object.write()?;
            let data: &mut dyn Any = &mut **guard;
            let view = registry()
                .project_mut(object.type_handle(), declaring, data)
                .ok_or_else(|| mismatch(object.type_handle(), declaring))?;
            f(view)
        }
        Value::Struct(boxed) => {
            check_value_type(boxed, declaring)?;
            let mut local = boxed.to_local();
            f(local.as_any_mut())
        }
        Value::Cell(cell) => match cell.get() {
            Value::Struct(boxed) => {
                check_value_type(&boxed, declaring)?;
                let ty = boxed.type_handle();
                let mut local = boxed.to_local();
                let result = f(local.as_any_mut())?;
                if write_back == WriteBack::Store {
                    cell.set(Value::Struct(StructValue::from_local(ty, local)));
                }
                Ok(result)
            }
            inner @ Value::Object(_) => with_instance_mut(&inner, declaring, write_back, f),
            Value::Null => Err(null_target(declaring)),
            other => Err(InvokeError::TargetMismatch(format!(
                "cell holding {} has no members of {}",
                other.describe(),
                declaring.name()
            ))),
        },
        Value::Null => Err(null_target(declaring)),
        other => Err(InvokeError::TargetMismatch(format!(
            "{} has no members of {}",
            other.describe(),
            declaring.name()
        ))),
    }
}

/// Writes to a bare boxed value type would be lost with the local copy.
pub fn require_writable_target(target: &Value) -> InvokeResult<()> {
    match target {
        Value::Struct(boxed) => Err(InvokeError::TargetMismatch(format!(
            "value-type instance of {} must be passed in a ValueCell to be modified",
            boxed.type_handle().name()
        ))),
        _ => Ok(()),
    }
}

fn check_value_type(boxed: &StructValue, declaring: TypeHandle) -> InvokeResult<()> {
    if boxed.type_handle() == declaring {
        Ok(())
    } else {
        Err(mismatch(boxed.type_handle(), declaring))
    }
}

fn mismatch(actual: TypeHandle, declaring: TypeHandle) -> InvokeError {
    InvokeError::TargetMismatch(format!(
        "{} is not an instance of {}",
        actual.name(),
        declaring.name()
    ))
}

fn null_target(declaring: TypeHandle) -> InvokeError {
    InvokeError::NullReference(format!("instance member of {} needs a target", declaring.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Employee, Person, Point};
    use crate::meta::{ObjectRef, ValueCell};

    fn bump_x(this: &mut dyn Any) -> InvokeResult<()> {
        let point = this
            .downcast_mut::<Point>()
            .ok_or_else(|| InvokeError::thrown("not a point"))?;
        point.x += 1;
        Ok(())
    }

    #[test]
    fn test_cell_write_back() {
        let point = TypeHandle::of::<Point>();
        let cell = ValueCell::wrap(Point::new(1, 2));
        let target = Value::Cell(cell.clone());

        with_instance_mut(&target, point, WriteBack::Store, bump_x).unwrap();
        assert_eq!(cell.read::<Point>().unwrap(), Point::new(2, 2));

        with_instance_mut(&target, point, WriteBack::Discard, bump_x).unwrap();
        assert_eq!(cell.read::<Point>().unwrap(), Point::new(2, 2));
    }

    #[test]
    fn test_failed_call_skips_write_back() {
        let point = TypeHandle::of::<Point>();
        let cell = ValueCell::wrap(Point::new(1, 2));
        let result: InvokeResult<()> =
            with_instance_mut(&Value::Cell(cell.clone()), point, WriteBack::Store, |this| {
                bump_x(this)?;
                Err(InvokeError::thrown("after mutation"))
            });
        assert!(result.is_err());
        assert_eq!(cell.read::<Point>().unwrap(), Point::new(1, 2));
    }

    #[test]
    fn test_boxed_struct_is_copied() {
        let point = TypeHandle::of::<Point>();
        let boxed = Value::new_struct(Point::new(1, 2));
        with_instance_mut(&boxed, point, WriteBack::Store, bump_x).unwrap();
        assert_eq!(boxed.to::<Point>().unwrap(), Point::new(1, 2));
        assert!(require_writable_target(&boxed).is_err());
    }

    #[test]
    fn test_object_projects_to_base() {
        let person = TypeHandle::of::<Person>();
        let employee = Value::new_object(Employee::new("Ada", 36, "Analytical"));
        let age = with_instance_ref(&employee, person, |this| {
            Ok(this.downcast_ref::<Person>().map(|p| p.age))
        })
        .unwrap();
        assert_eq!(age, Some(36));
    }

    #[test]
    fn test_nested_access_to_locked_object() {
        let person = TypeHandle::of::<Person>();
        let target = Value::new_object(Person::new("Ada", 36));
        let object = target.as_object().cloned().unwrap();

        let nested = with_instance_ref(&target, person, |_| Ok(object.with(|p: &Person| p.age)))
            .unwrap();
        assert_eq!(nested, Some(36));

        let blocked = with_instance_mut(&target, person, WriteBack::Store, |_| {
            object.try_with(|p: &Person| p.age)
        });
        assert!(matches!(blocked, Err(InvokeError::Reentrant(_))));
        assert_eq!(object.with(|p: &Person| p.age), Some(36));
    }

    #[test]
    fn test_invalid_targets() {
        let point = TypeHandle::of::<Point>();
        assert!(matches!(
            with_instance_ref(&Value::Null, point, |_| Ok(())),
            Err(InvokeError::NullReference(_))
        ));
        let person = Value::Object(ObjectRef::new(TypeHandle::of::<Person>(), Person::default()));
        assert!(matches!(
            with_instance_ref(&person, point, |_| Ok(())),
            Err(InvokeError::TargetMismatch(_))
        ));
        assert!(matches!(
            with_instance_ref(&Value::I32(3), point, |_| Ok(())),
            Err(InvokeError::TargetMismatch(_))
        ));
    }
}
