//! Boxed value model
//!
//! ```text
//! Value ─┬─ Null / Bool / I32 / I64 / F64 / Str      built-ins
//!        ├─ Enum(EnumValue)                          integral + type
//!        ├─ Struct(StructValue)                      immutable boxed value type
//!        ├─ Object(ObjectRef)                        shared, lock-guarded instance
//!        ├─ Array(ArrayRef)                          shared element storage
//!        └─ Cell(ValueCell)                          mutable slot holding a value type
//! ```
//!
//! Value types are copied: a `StructValue` is never mutated in place. Code
//! that needs to mutate a value type works on a local copy and, when the
//! value came from a [`ValueCell`], writes the copy back into the cell.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{InvokeError, InvokeResult};
use crate::registry::{registry, Reflect};
use crate::types::TypeHandle;

/// Object-safe view of a value-type payload.
pub trait DynValue: Any + Send + Sync {
    fn clone_value(&self) -> Box<dyn DynValue>;
    fn eq_value(&self, other: &dyn DynValue) -> bool;
    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T> DynValue for T
where
    T: Any + Clone + PartialEq + fmt::Debug + Send + Sync,
{
    fn clone_value(&self) -> Box<dyn DynValue> {
        Box::new(self.clone())
    }

    fn eq_value(&self, other: &dyn DynValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Enum member: underlying integral value tagged with its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub ty: TypeHandle,
    pub value: i64,
}

impl EnumValue {
    pub fn new(ty: TypeHandle, value: i64) -> Self {
        Self { ty, value }
    }
}

/// Boxed value-type instance.
#[derive(Clone)]
pub struct StructValue {
    ty: TypeHandle,
    data: Arc<dyn DynValue>,
}

impl StructValue {
    pub fn new<T: DynValue>(ty: TypeHandle, value: T) -> Self {
        Self {
            ty,
            data: Arc::new(value),
        }
    }

    /// Reboxes a local copy produced by [`StructValue::to_local`].
    pub fn from_local(ty: TypeHandle, local: Box<dyn DynValue>) -> Self {
        Self {
            ty,
            data: Arc::from(local),
        }
    }

    pub fn type_handle(&self) -> TypeHandle {
        self.ty
    }

    /// Unboxes into a private mutable copy.
    pub fn to_local(&self) -> Box<dyn DynValue> {
        self.data.clone_value()
    }

    pub fn as_any(&self) -> &dyn Any {
        self.data.as_any()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.as_any().downcast_ref::<T>()
    }
}

impl PartialEq for StructValue {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && self.data.eq_value(other.data.as_ref())
    }
}

impl fmt::Debug for StructValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.data.fmt_value(f)
    }
}

type ObjectData = Box<dyn Any + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hold {
    Shared,
    Exclusive,
}

thread_local! {
    /// Object locks held by the current thread, innermost last.
    static HELD: RefCell<Vec<(usize, Hold)>> = const { RefCell::new(Vec::new()) };
}

fn hold_of(key: usize) -> Option<Hold> {
    HELD.with(|held| {
        let held = held.borrow();
        if held.iter().any(|&(k, hold)| k == key && hold == Hold::Exclusive) {
            Some(Hold::Exclusive)
        } else if held.iter().any(|&(k, _)| k == key) {
            Some(Hold::Shared)
        } else {
            None
        }
    })
}

fn push_hold(key: usize, hold: Hold) {
    HELD.with(|held| held.borrow_mut().push((key, hold)));
}

fn pop_hold(key: usize, hold: Hold) {
    HELD.with(|held| {
        let mut held = held.borrow_mut();
        if let Some(pos) = held.iter().rposition(|&entry| entry == (key, hold)) {
            held.remove(pos);
        }
    });
}

/// Wait limit for object locks held by other threads, in microseconds; 0 waits forever.
static LOCK_TIMEOUT_MICROS: AtomicU64 = AtomicU64::new(0);

/// Bounds how long [`ObjectRef::read`] and [`ObjectRef::write`] wait for a
/// lock held by another thread. `None` (the default) waits indefinitely.
///
/// Re-entrance on one thread is always detected. Two threads that lock
/// objects in opposite orders can only be told apart from slow work by a
/// wait limit; with one set, the losing side gets
/// [`InvokeError::LockTimeout`] and releases what it holds.
pub fn set_lock_timeout(timeout: Option<Duration>) {
    let micros = timeout.map_or(0, |limit| {
        u64::try_from(limit.as_micros()).unwrap_or(u64::MAX).max(1)
    });
    LOCK_TIMEOUT_MICROS.store(micros, Ordering::Relaxed);
}

pub fn lock_timeout() -> Option<Duration> {
    match LOCK_TIMEOUT_MICROS.load(Ordering::Relaxed) {
        0 => None,
        micros => Some(Duration::from_micros(micros)),
    }
}

/// Shared access to an object's payload.
pub struct ObjectReadGuard<'a> {
    guard: RwLockReadGuard<'a, ObjectData>,
    key: usize,
}

impl Deref for ObjectReadGuard<'_> {
    type Target = ObjectData;

    fn deref(&self) -> &ObjectData {
        &self.guard
    }
}

impl Drop for ObjectReadGuard<'_> {
    fn drop(&mut self) {
        pop_hold(self.key, Hold::Shared);
    }
}

/// Exclusive access to an object's payload.
pub struct ObjectWriteGuard<'a> {
    guard: RwLockWriteGuard<'a, ObjectData>,
    key: usize,
}

impl Deref for ObjectWriteGuard<'_> {
    type Target = ObjectData;

    fn deref(&self) -> &ObjectData {
        &self.guard
    }
}

impl DerefMut for ObjectWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut ObjectData {
        &mut self.guard
    }
}

impl Drop for ObjectWriteGuard<'_> {
    fn drop(&mut self) {
        pop_hold(self.key, Hold::Exclusive);
    }
}

struct ObjectInner {
    ty: TypeHandle,
    data: RwLock<ObjectData>,
}

/// Shared reference-type instance.
///
/// Clones alias the same object; equality is identity.
///
/// Locking is not re-entrant. A thread that already holds an object's write
/// lock gets [`InvokeError::Reentrant`] from any further `read` or `write` on
/// it, and a thread holding a read lock may read again but not write. Nested
/// access through an alias fails instead of blocking forever.
///
/// Across threads, member code that locks a second object while holding the
/// first must take them in a consistent order. Otherwise two threads can wait
/// on each other; [`set_lock_timeout`] turns that wait into an error.
#[derive(Clone)]
pub struct ObjectRef {
    inner: Arc<ObjectInner>,
}

impl ObjectRef {
    pub fn new<T: Any + Send + Sync>(ty: TypeHandle, value: T) -> Self {
        Self {
            inner: Arc::new(ObjectInner {
                ty,
                data: RwLock::new(Box::new(value)),
            }),
        }
    }

    /// Runtime type of the object.
    pub fn type_handle(&self) -> TypeHandle {
        self.inner.ty
    }

    fn key(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    fn reentrant(&self, held: Hold) -> InvokeError {
        let mode = match held {
            Hold::Shared => "read",
            Hold::Exclusive => "write",
        };
        InvokeError::Reentrant(format!(
            "{} instance is already locked for {mode} by this thread",
            self.inner.ty.name()
        ))
    }

    fn timed_out(&self, mode: &str, limit: Duration) -> InvokeError {
        InvokeError::LockTimeout(format!(
            "{} instance not available for {mode} within {limit:?}",
            self.inner.ty.name()
        ))
    }

    pub fn read(&self) -> InvokeResult<ObjectReadGuard<'_>> {
        let key = self.key();
        if let Some(Hold::Exclusive) = hold_of(key) {
            return Err(self.reentrant(Hold::Exclusive));
        }
        // Recursive so a nested read never queues behind a waiting writer.
        let guard = match lock_timeout() {
            None => self.inner.data.read_recursive(),
            Some(limit) => self
                .inner
                .data
                .try_read_recursive_for(limit)
                .ok_or_else(|| self.timed_out("read", limit))?,
        };
        push_hold(key, Hold::Shared);
        Ok(ObjectReadGuard { guard, key })
    }

    pub fn write(&self) -> InvokeResult<ObjectWriteGuard<'_>> {
        let key = self.key();
        if let Some(held) = hold_of(key) {
            return Err(self.reentrant(held));
        }
        let guard = match lock_timeout() {
            None => self.inner.data.write(),
            Some(limit) => self
                .inner
                .data
                .try_write_for(limit)
                .ok_or_else(|| self.timed_out("write", limit))?,
        };
        push_hold(key, Hold::Exclusive);
        Ok(ObjectWriteGuard { guard, key })
    }

    /// Runs `f` against the object viewed as `T`, which may be a base class
    /// of the runtime type.
    pub fn try_with<T: Reflect, R>(&self, f: impl FnOnce(&T) -> R) -> InvokeResult<R> {
        let guard = self.read()?;
        let data: &dyn Any = &**guard;
        registry()
            .project_ref(self.inner.ty, TypeHandle::of::<T>(), data)
            .and_then(|view| view.downcast_ref::<T>())
            .map(f)
            .ok_or_else(InvokeError::target_mismatch::<T>)
    }

    pub fn try_with_mut<T: Reflect, R>(&self, f: impl FnOnce(&mut T) -> R) -> InvokeResult<R> {
        let mut guard = self.write()?;
        let data: &mut dyn Any = &mut **guard;
        registry()
            .project_mut(self.inner.ty, TypeHandle::of::<T>(), data)
            .and_then(|view| view.downcast_mut::<T>())
            .map(f)
            .ok_or_else(InvokeError::target_mismatch::<T>)
    }

    /// [`try_with`](Self::try_with) with failures collapsed to `None`.
    pub fn with<T: Reflect, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.try_with(f).ok()
    }

    pub fn with_mut<T: Reflect, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.try_with_mut(f).ok()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({}@{:p})", self.inner.ty.name(), Arc::as_ptr(&self.inner))
    }
}

struct ArrayInner {
    ty: TypeHandle,
    element: TypeHandle,
    items: RwLock<Vec<Value>>,
}

/// Shared single-dimensional array; the length is fixed at construction.
#[derive(Clone)]
pub struct ArrayRef {
    inner: Arc<ArrayInner>,
}

impl ArrayRef {
    /// Array of `element` holding `items`; items are not re-checked.
    pub fn new(element: TypeHandle, items: Vec<Value>) -> Self {
        Self {
            inner: Arc::new(ArrayInner {
                ty: registry().array_of(element),
                element,
                items: RwLock::new(items),
            }),
        }
    }

    /// `len` elements, each the zero value of `element`.
    pub fn zeroed(element: TypeHandle, len: usize) -> Self {
        let zero = registry().zero_value(element);
        Self::new(element, vec![zero; len])
    }

    /// The array type itself (`Element[]`).
    pub fn type_handle(&self) -> TypeHandle {
        self.inner.ty
    }

    pub fn element_type(&self) -> TypeHandle {
        self.inner.element
    }

    pub fn len(&self) -> usize {
        self.inner.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> InvokeResult<Value> {
        let items = self.inner.items.read();
        items
            .get(index)
            .cloned()
            .ok_or(InvokeError::IndexOutOfRange {
                index,
                len: items.len(),
            })
    }

    pub fn set(&self, index: usize, value: Value) -> InvokeResult<()> {
        let mut items = self.inner.items.write();
        let len = items.len();
        match items.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(InvokeError::IndexOutOfRange { index, len }),
        }
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.inner.items.read().clone()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.items.read().iter()).finish()
    }
}

/// Mutable slot holding a value-type instance.
///
/// Passing a cell as the target of a setter or method lets the mutation be
/// observed by the caller: the engine copies the slot out, mutates the copy
/// and stores it back.
#[derive(Clone)]
pub struct ValueCell {
    slot: Arc<Mutex<Value>>,
}

impl ValueCell {
    pub fn new(value: Value) -> Self {
        Self {
            slot: Arc::new(Mutex::new(value)),
        }
    }

    pub fn wrap(value: impl IntoValue) -> Self {
        Self::new(value.into_value())
    }

    /// Copy of the current content.
    pub fn get(&self) -> Value {
        self.slot.lock().clone()
    }

    pub fn set(&self, value: Value) {
        *self.slot.lock() = value;
    }

    pub fn replace(&self, value: Value) -> Value {
        std::mem::replace(&mut *self.slot.lock(), value)
    }

    /// Runtime type of the held value.
    pub fn type_handle(&self) -> Option<TypeHandle> {
        registry().type_of(&self.get())
    }

    /// Current content converted to `T`.
    pub fn read<T: FromValue>(&self) -> InvokeResult<T> {
        T::from_value(&self.get())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl fmt::Debug for ValueCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ValueCell").field(&*self.slot.lock()).finish()
    }
}

/// A boxed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    Str(Arc<str>),
    Enum(EnumValue),
    Struct(StructValue),
    Object(ObjectRef),
    Array(ArrayRef),
    Cell(ValueCell),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    /// Boxes a value-type instance.
    pub fn new_struct<T: Reflect + DynValue>(value: T) -> Self {
        Value::Struct(StructValue::new(TypeHandle::of::<T>(), value))
    }

    /// Allocates a reference-type instance.
    pub fn new_object<T: Reflect>(value: T) -> Self {
        Value::Object(ObjectRef::new(TypeHandle::of::<T>(), value))
    }

    pub fn new_cell(value: impl IntoValue) -> Self {
        Value::Cell(ValueCell::wrap(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Integral content, widening `I32` and reading enum members.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            Value::Enum(e) => Some(e.value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_cell(&self) -> Option<&ValueCell> {
        match self {
            Value::Cell(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Runtime type; `None` for `Null`.
    pub fn runtime_type(&self) -> Option<TypeHandle> {
        registry().type_of(self)
    }

    /// Converts to `T`, see [`FromValue`].
    pub fn to<T: FromValue>(&self) -> InvokeResult<T> {
        T::from_value(self)
    }

    /// Short description used in cast errors.
    pub fn describe(&self) -> String {
        match self.runtime_type() {
            Some(ty) => ty.name(),
            None => "null".to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Cell(a), Value::Cell(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(v) => write!(f, "Bool({v})"),
            Value::I32(v) => write!(f, "I32({v})"),
            Value::I64(v) => write!(f, "I64({v})"),
            Value::F64(v) => write!(f, "F64({v})"),
            Value::Str(v) => write!(f, "Str({v:?})"),
            Value::Enum(e) => write!(f, "Enum({}::{})", e.ty.name(), e.value),
            Value::Struct(s) => write!(f, "Struct({s:?})"),
            Value::Object(o) => fmt::Debug::fmt(o, f),
            Value::Array(a) => write!(f, "Array({a:?})"),
            Value::Cell(c) => fmt::Debug::fmt(c, f),
        }
    }
}

/// Conversion into a boxed [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Conversion out of a boxed [`Value`].
///
/// Conversions are exact: an `I32` does not convert to `i64`. Cast the value
/// to the wanted type first when widening is intended.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> InvokeResult<Self>;
}

pub(crate) fn cast_error(expected: &str, found: &Value) -> InvokeError {
    InvokeError::InvalidCast {
        expected: expected.to_string(),
        found: found.describe(),
    }
}

macro_rules! primitive_value {
    ($($ty:ty => $variant:ident, $name:literal;)*) => {
        $(
            impl IntoValue for $ty {
                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }

            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }

            impl FromValue for $ty {
                fn from_value(value: &Value) -> InvokeResult<Self> {
                    match value {
                        Value::$variant(v) => Ok(*v),
                        Value::Cell(cell) => Self::from_value(&cell.get()),
                        other => Err(cast_error($name, other)),
                    }
                }
            }
        )*
    };
}

primitive_value! {
    bool => Bool, "Bool";
    i32 => I32, "Int32";
    i64 => I64, "Int64";
    f64 => F64, "Float64";
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Str(Arc::from(self))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        value.into_value()
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::str(self)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::str(value)
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> InvokeResult<Self> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            Value::Null => Err(InvokeError::NullReference(
                "null cannot be read as a String".to_string(),
            )),
            other => Err(cast_error("String", other)),
        }
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Null
    }
}

impl FromValue for () {
    fn from_value(_: &Value) -> InvokeResult<Self> {
        Ok(())
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> InvokeResult<Self> {
        Ok(value.clone())
    }
}

impl IntoValue for ObjectRef {
    fn into_value(self) -> Value {
        Value::Object(self)
    }
}

impl FromValue for ObjectRef {
    fn from_value(value: &Value) -> InvokeResult<Self> {
        match value {
            Value::Object(o) => Ok(o.clone()),
            other => Err(cast_error("Object", other)),
        }
    }
}

impl IntoValue for ArrayRef {
    fn into_value(self) -> Value {
        Value::Array(self)
    }
}

impl FromValue for ArrayRef {
    fn from_value(value: &Value) -> InvokeResult<Self> {
        match value {
            Value::Array(a) => Ok(a.clone()),
            other => Err(cast_error("Array", other)),
        }
    }
}

impl IntoValue for ValueCell {
    fn into_value(self) -> Value {
        Value::Cell(self)
    }
}

impl FromValue for ValueCell {
    fn from_value(value: &Value) -> InvokeResult<Self> {
        match value {
            Value::Cell(c) => Ok(c.clone()),
            other => Err(cast_error("ValueCell", other)),
        }
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> InvokeResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: IntoValue + Reflect> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        let items = self.into_iter().map(IntoValue::into_value).collect();
        Value::Array(ArrayRef::new(TypeHandle::of::<T>(), items))
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> InvokeResult<Self> {
        match value {
            Value::Array(a) => a.to_vec().iter().map(T::from_value).collect(),
            other => Err(cast_error("Array", other)),
        }
    }
}
