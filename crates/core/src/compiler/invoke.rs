//! Method call composition
//!
//! ```text
//! args ──► ArgPlan::copy_in ──► locals
//!                                 │
//!          target ──► dispatch ──►│──► body(Invocation) ──► result
//!                                 │
//! args ◄── ArgPlan::copy_out ◄────┘   (only when the body succeeded)
//! ```

use tracing::trace;

use super::type_info;
use crate::accessor::CallFn;
use crate::error::{ReflectError, ReflectResult};
use crate::marshal::ArgPlan;
use crate::meta::{
    registry, Invocation, InvokeResult, MethodBody, MethodRef, Receiver, TypeHandle, Value,
};
use crate::resolver::describe_types;
use crate::value_cell::{with_instance_mut, with_instance_ref, WriteBack};

/// How the body of a call is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    /// No target; the target argument is ignored
    Static,
    /// The resolved body, run against the declaring type
    Direct,
    /// The body in the runtime type's vtable slot
    Virtual { slot: usize },
}

/// Call closure for the method at `method` with generic arguments bound to
/// `type_args`.
pub(crate) fn compile_call(
    method: MethodRef,
    type_args: &[TypeHandle],
    write_back: WriteBack,
) -> ReflectResult<CallFn> {
    let info = type_info(method.declaring)?;
    let Some(target) = info.methods().get(method.index) else {
        return Err(ReflectError::AmbiguousOperation(format!(
            "{} has no method #{}",
            info.name(),
            method.index
        )));
    };
    if target.generic_arity != type_args.len() {
        return Err(ReflectError::InvalidArgumentShape {
            member: format!("{}.{}", info.name(), target.name),
            reason: format!(
                "expected {} type arguments, received [{}]",
                target.generic_arity,
                describe_types(type_args)
            ),
        });
    }

    let dispatch = match (target.is_static, target.is_virtual, target.slot) {
        (true, _, _) => Dispatch::Static,
        (false, true, Some(slot)) => Dispatch::Virtual { slot },
        (false, _, _) => Dispatch::Direct,
    };
    trace!(
        "Compiled {}.{} as {:?} call with {} parameters",
        info.name(),
        target.name,
        dispatch,
        target.params.len()
    );

    let plan = ArgPlan::new(&target.params);
    let body = Callee {
        owner: method.declaring,
        body: target.body().clone(),
        mutates_this: target.mutates_this,
    };
    let type_args = type_args.to_vec();

    let call: CallFn = match dispatch {
        Dispatch::Static => Box::new(move |_: &Value, args: &mut [Value]| {
            plan.call(args, |locals| {
                (body.body)(Invocation {
                    this: None,
                    args: locals,
                    type_args: &type_args,
                })
            })
        }),
        Dispatch::Direct => Box::new(move |target: &Value, args: &mut [Value]| {
            plan.call(args, |locals| body.run(target, write_back, locals, &type_args))
        }),
        Dispatch::Virtual { slot } => Box::new(move |target: &Value, args: &mut [Value]| {
            let chosen = override_for(target, slot, method);
            let callee = chosen.as_ref().unwrap_or(&body);
            plan.call(args, |locals| callee.run(target, write_back, locals, &type_args))
        }),
    };
    Ok(call)
}

/// A method body together with the type it runs against.
struct Callee {
    owner: TypeHandle,
    body: MethodBody,
    mutates_this: bool,
}

impl Callee {
    /// Runs the body against `target`. Read-only bodies keep an object
    /// target share-locked; the rest get an exclusive view.
    fn run(
        &self,
        target: &Value,
        write_back: WriteBack,
        args: &mut [Value],
        type_args: &[TypeHandle],
    ) -> InvokeResult<Value> {
        if self.mutates_this {
            with_instance_mut(target, self.owner, write_back, |this| {
                (self.body)(Invocation {
                    this: Some(Receiver::Exclusive(this)),
                    args,
                    type_args,
                })
            })
        } else {
            with_instance_ref(target, self.owner, |this| {
                (self.body)(Invocation {
                    this: Some(Receiver::Shared(this)),
                    args,
                    type_args,
                })
            })
        }
    }
}

/// Body occupying `slot` in the vtable of the target's runtime type, when it
/// differs from `resolved`.
fn override_for(target: &Value, slot: usize, resolved: MethodRef) -> Option<Callee> {
    let runtime = match target {
        Value::Object(object) => object.type_handle(),
        Value::Cell(cell) => cell.get().as_object()?.type_handle(),
        _ => return None,
    };
    let reg = registry();
    let entry = *reg.get(runtime)?.vtable().get(slot)?;
    if entry == resolved {
        return None;
    }
    let owner = reg.get(entry.declaring)?;
    let method = owner.methods().get(entry.index)?;
    Some(Callee {
        owner: entry.declaring,
        body: method.body().clone(),
        mutates_this: method.mutates_this,
    })
}
