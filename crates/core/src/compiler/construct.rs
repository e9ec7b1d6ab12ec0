//! Instance creation

use super::{type_info, unexpected};
use crate::accessor::CreateFn;
use crate::error::{ReflectError, ReflectResult};
use crate::marshal::ArgPlan;
use crate::meta::{registry, ArrayRef, InvokeError, InvokeResult, Value};
use crate::resolver::MemberHandle;

/// Create closure for a resolved constructor, zero-init or array allocation.
pub(crate) fn compile_create(member: &MemberHandle) -> ReflectResult<CreateFn> {
    match member {
        MemberHandle::ZeroInit(ty) => {
            let zero = registry().zero_value(*ty);
            Ok(Box::new(move |args: &mut [Value]| {
                if !args.is_empty() {
                    return Err(InvokeError::ArgumentCount {
                        expected: 0,
                        received: args.len(),
                    });
                }
                Ok(zero.clone())
            }))
        }
        MemberHandle::ArrayAlloc { element } => {
            let element = *element;
            Ok(Box::new(move |args: &mut [Value]| {
                let [length] = args else {
                    return Err(InvokeError::ArgumentCount {
                        expected: 1,
                        received: args.len(),
                    });
                };
                Ok(Value::Array(ArrayRef::zeroed(element, array_length(length)?)))
            }))
        }
        MemberHandle::Constructor { declaring, index } => {
            let info = type_info(*declaring)?;
            let ctor = info.constructors().get(*index).ok_or_else(|| {
                ReflectError::AmbiguousOperation(format!("{} has no constructor #{index}", info.name()))
            })?;
            let plan = ArgPlan::new(&ctor.params);
            let body = ctor.body().clone();
            Ok(Box::new(move |args: &mut [Value]| plan.call(args, |locals| body(locals))))
        }
        other => Err(unexpected(other, "a constructor")),
    }
}

fn array_length(length: &Value) -> InvokeResult<usize> {
    let raw = match length {
        Value::Cell(cell) => return array_length(&cell.get()),
        Value::I32(n) => i64::from(*n),
        Value::I64(n) => *n,
        other => {
            return Err(InvokeError::InvalidCast {
                expected: "Int32".to_string(),
                found: other.describe(),
            });
        }
    };
    usize::try_from(raw)
        .map_err(|_| InvokeError::InvalidArgument(format!("array length {raw} is negative")))
}
