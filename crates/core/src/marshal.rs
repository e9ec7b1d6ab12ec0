//! Argument marshalling for compiled invokers
//!
//! An [`ArgPlan`] is computed once per compiled method or constructor. At
//! call time it casts each argument to its declared type, prepares locals for
//! by-ref parameters and copies those locals back into the caller's argument
//! slots once the body returned.

use crate::meta::{registry, InvokeError, InvokeResult, ParamMode, ParameterInfo, TypeHandle, Value};

#[derive(Debug, Clone)]
struct ParamSlot {
    ty: TypeHandle,
    mode: ParamMode,
    /// Initial local of an `Out` parameter
    zero: Value,
}

/// Per-member marshalling plan.
#[derive(Debug, Clone)]
pub struct ArgPlan {
    params: Vec<ParamSlot>,
    has_by_ref: bool,
}

impl ArgPlan {
    pub fn new(params: &[ParameterInfo]) -> Self {
        let reg = registry();
        let params: Vec<ParamSlot> = params
            .iter()
            .map(|p| ParamSlot {
                ty: p.ty,
                mode: p.mode,
                zero: match p.mode {
                    ParamMode::Out => reg.zero_value(p.ty),
                    _ => Value::Null,
                },
            })
            .collect();
        let has_by_ref = params.iter().any(|p| p.mode.is_by_ref());
        Self { params, has_by_ref }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Casts `args` into the locals handed to the member body.
    pub fn copy_in(&self, args: &[Value]) -> InvokeResult<Vec<Value>> {
        if args.len() != self.params.len() {
            return Err(InvokeError::ArgumentCount {
                expected: self.params.len(),
                received: args.len(),
            });
        }
        let reg = registry();
        self.params
            .iter()
            .zip(args)
            .map(|(param, arg)| match param.mode {
                ParamMode::Out => Ok(param.zero.clone()),
                ParamMode::Ref => reg.cast(unwrap_cell(arg), param.ty),
                ParamMode::In => reg.cast(arg.clone(), param.ty),
            })
            .collect()
    }

    /// Stores by-ref locals into the caller's slots.
    ///
    /// A slot holding a [`ValueCell`](crate::meta::ValueCell) receives the
    /// value inside the cell; any other slot is overwritten.
    pub fn copy_out(&self, locals: &mut [Value], args: &mut [Value]) {
        if !self.has_by_ref {
            return;
        }
        for ((param, local), slot) in self.params.iter().zip(locals.iter_mut()).zip(args.iter_mut()) {
            if !param.mode.is_by_ref() {
                continue;
            }
            let value = std::mem::take(local);
            match slot {
                Value::Cell(cell) => cell.set(value),
                other => *other = value,
            }
        }
    }

    /// Runs `body` with marshalled locals, copying by-ref results out when it
    /// succeeds.
    pub fn call<R>(
        &self,
        args: &mut [Value],
        body: impl FnOnce(&mut [Value]) -> InvokeResult<R>,
    ) -> InvokeResult<R> {
        let mut locals = self.copy_in(args)?;
        let result = body(&mut locals)?;
        self.copy_out(&mut locals, args);
        Ok(result)
    }
}

fn unwrap_cell(arg: &Value) -> Value {
    match arg {
        Value::Cell(cell) => cell.get(),
        other => other.clone(),
    }
}
