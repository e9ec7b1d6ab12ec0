//! Compiled accessors
//!
//! Each accessor is immutable once compiled and safe to share between
//! threads. Failures raised while an accessor runs are the member's own
//! [`InvokeError`](crate::meta::InvokeError)s, passed through unchanged.

use std::fmt;

use crate::meta::{InvokeResult, Value};
use crate::signature::{MapSignature, Signature};

pub(crate) type ReadFn = Box<dyn Fn(&Value) -> InvokeResult<Value> + Send + Sync>;
pub(crate) type WriteFn = Box<dyn Fn(&Value, Value) -> InvokeResult<()> + Send + Sync>;
pub(crate) type CallFn = Box<dyn Fn(&Value, &mut [Value]) -> InvokeResult<Value> + Send + Sync>;
pub(crate) type CreateFn = Box<dyn Fn(&mut [Value]) -> InvokeResult<Value> + Send + Sync>;
pub(crate) type ElementReadFn = Box<dyn Fn(&Value, usize) -> InvokeResult<Value> + Send + Sync>;
pub(crate) type ElementWriteFn = Box<dyn Fn(&Value, usize, Value) -> InvokeResult<()> + Send + Sync>;

/// Reads a field or property.
pub struct MemberGetter {
    signature: Signature,
    read: ReadFn,
}

impl MemberGetter {
    pub(crate) fn new(signature: Signature, read: ReadFn) -> Self {
        Self { signature, read }
    }

    /// Reads the member of `target`; static members ignore the target.
    pub fn get(&self, target: &Value) -> InvokeResult<Value> {
        (self.read)(target)
    }

    pub fn get_static(&self) -> InvokeResult<Value> {
        (self.read)(&Value::Null)
    }

    /// The resolved signature this getter was compiled from.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

/// Writes a field or property.
pub struct MemberSetter {
    signature: Signature,
    write: WriteFn,
}

impl MemberSetter {
    pub(crate) fn new(signature: Signature, write: WriteFn) -> Self {
        Self { signature, write }
    }

    /// Casts `value` to the member type and stores it.
    ///
    /// A value-type target must be a [`ValueCell`](crate::meta::ValueCell);
    /// the cell holds the updated value afterwards.
    pub fn set(&self, target: &Value, value: impl Into<Value>) -> InvokeResult<()> {
        (self.write)(target, value.into())
    }

    pub fn set_static(&self, value: impl Into<Value>) -> InvokeResult<()> {
        (self.write)(&Value::Null, value.into())
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

/// Calls a method.
pub struct MethodInvoker {
    signature: Signature,
    call: CallFn,
}

impl MethodInvoker {
    pub(crate) fn new(signature: Signature, call: CallFn) -> Self {
        Self { signature, call }
    }

    /// Calls the method on `target`.
    ///
    /// By-ref arguments are written back into `args`. Void methods return
    /// [`Value::Null`].
    pub fn invoke(&self, target: &Value, args: &mut [Value]) -> InvokeResult<Value> {
        (self.call)(target, args)
    }

    pub fn invoke_static(&self, args: &mut [Value]) -> InvokeResult<Value> {
        (self.call)(&Value::Null, args)
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

/// Creates instances.
pub struct ConstructorInvoker {
    signature: Signature,
    create: CreateFn,
}

impl ConstructorInvoker {
    pub(crate) fn new(signature: Signature, create: CreateFn) -> Self {
        Self { signature, create }
    }

    /// Creates a boxed instance; by-ref arguments are written back into `args`.
    pub fn create(&self, args: &mut [Value]) -> InvokeResult<Value> {
        (self.create)(args)
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

pub struct ArrayElementGetter {
    signature: Signature,
    read: ElementReadFn,
}

impl ArrayElementGetter {
    pub(crate) fn new(signature: Signature, read: ElementReadFn) -> Self {
        Self { signature, read }
    }

    pub fn get(&self, array: &Value, index: usize) -> InvokeResult<Value> {
        (self.read)(array, index)
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

pub struct ArrayElementSetter {
    signature: Signature,
    write: ElementWriteFn,
}

impl ArrayElementSetter {
    pub(crate) fn new(signature: Signature, write: ElementWriteFn) -> Self {
        Self { signature, write }
    }

    /// Casts `value` to the element type and stores it at `index`.
    pub fn set(&self, array: &Value, index: usize, value: impl Into<Value>) -> InvokeResult<()> {
        (self.write)(array, index, value.into())
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

/// One source → target member pairing of an [`ObjectMapper`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedMember {
    pub source: String,
    pub target: String,
}

pub(crate) struct MapStep {
    pub(crate) member: MappedMember,
    pub(crate) read: ReadFn,
    pub(crate) write: WriteFn,
}

/// Copies matching members from a source instance to a target instance.
pub struct ObjectMapper {
    signature: MapSignature,
    steps: Vec<MapStep>,
}

impl ObjectMapper {
    pub(crate) fn new(signature: MapSignature, steps: Vec<MapStep>) -> Self {
        Self { signature, steps }
    }

    /// Copies every paired member, in pairing order.
    ///
    /// Stops at the first failing member; members copied before it keep
    /// their new values.
    pub fn map(&self, source: &Value, target: &Value) -> InvokeResult<()> {
        for step in &self.steps {
            let value = (step.read)(source)?;
            (step.write)(target, value)?;
        }
        Ok(())
    }

    pub fn members(&self) -> impl Iterator<Item = &MappedMember> {
        self.steps.iter().map(|step| &step.member)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn signature(&self) -> &MapSignature {
        &self.signature
    }
}

macro_rules! signature_debug {
    ($($ty:ident),* $(,)?) => {
        $(
            impl fmt::Debug for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_struct(stringify!($ty))
                        .field("signature", &self.signature)
                        .finish_non_exhaustive()
                }
            }
        )*
    };
}

signature_debug!(
    MemberGetter,
    MemberSetter,
    MethodInvoker,
    ConstructorInvoker,
    ArrayElementGetter,
    ArrayElementSetter,
);

impl fmt::Debug for ObjectMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectMapper")
            .field("signature", &self.signature)
            .field("members", &self.members().collect::<Vec<_>>())
            .finish()
    }
}
