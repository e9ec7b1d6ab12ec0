//! Array element access

use super::unexpected;
use crate::accessor::{ElementReadFn, ElementWriteFn};
use crate::error::ReflectResult;
use crate::meta::{registry, ArrayRef, InvokeError, InvokeResult, TypeHandle, Value};
use crate::resolver::MemberHandle;

pub(crate) fn compile_element_read(array_ty: TypeHandle, member: &MemberHandle) -> ReflectResult<ElementReadFn> {
    let MemberHandle::ArrayElement { .. } = member else {
        return Err(unexpected(member, "an array element"));
    };
    Ok(Box::new(move |target: &Value, index: usize| {
        with_array(target, array_ty, |array| array.get(index))
    }))
}

pub(crate) fn compile_element_write(
    array_ty: TypeHandle,
    member: &MemberHandle,
) -> ReflectResult<ElementWriteFn> {
    let MemberHandle::ArrayElement { element } = member else {
        return Err(unexpected(member, "an array element"));
    };
    let element = *element;
    Ok(Box::new(move |target: &Value, index: usize, value: Value| {
        let value = registry().cast(value, element)?;
        with_array(target, array_ty, |array| array.set(index, value))
    }))
}

fn with_array<R>(
    target: &Value,
    array_ty: TypeHandle,
    f: impl FnOnce(&ArrayRef) -> InvokeResult<R>,
) -> InvokeResult<R> {
    match target {
        Value::Array(array) if array.type_handle() == array_ty => f(array),
        Value::Cell(cell) => with_array(&cell.get(), array_ty, f),
        Value::Null => Err(InvokeError::NullReference(format!(
            "element access on a null {}",
            array_ty.name()
        ))),
        other => Err(InvokeError::InvalidCast {
            expected: array_ty.name(),
            found: other.describe(),
        }),
    }
}
