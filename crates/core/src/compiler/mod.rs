//! Accessor compilers
//!
//! Every compiler follows the same protocol:
//!
//! 1. resolve the request's working copy with the [`MemberResolver`]
//! 2. compose the member's primitive thunks into a specialized closure
//! 3. wrap the closure as a typed accessor
//!
//! Nothing is looked up by name once an accessor exists; the closures hold
//! the resolved thunks, marshalling plans and dispatch slots directly.

mod array;
mod construct;
mod invoke;
mod mapper;
mod member;

use std::any::Any;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use crate::accessor::{
    ArrayElementGetter, ArrayElementSetter, ConstructorInvoker, MemberGetter, MemberSetter,
    MethodInvoker, ObjectMapper,
};
use crate::error::{ReflectError, ReflectResult};
use crate::meta::{registry, TypeHandle, TypeInfo};
use crate::resolver::{MemberHandle, MemberResolver};
use crate::signature::{Direction, MapSignature, Signature};
use crate::value_cell::WriteBack;

/// One compilation algorithm.
pub trait AccessorCompiler {
    type Key: Clone + Eq + Hash + Debug;
    type Output: Any + Send + Sync;

    /// Compiles the accessor for `key`, recording resolution results in it.
    fn compile(&self, key: &mut Self::Key, resolver: &MemberResolver) -> ReflectResult<Self::Output>;
}

/// Field and property reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetterCompiler;

impl AccessorCompiler for GetterCompiler {
    type Key = Signature;
    type Output = MemberGetter;

    fn compile(&self, key: &mut Signature, resolver: &MemberResolver) -> ReflectResult<MemberGetter> {
        expect_direction(key, Direction::Read)?;
        let member = resolver.resolve(key)?;
        let read = member::compile_read(&member)?;
        Ok(MemberGetter::new(key.clone(), read))
    }
}

/// Field and property writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetterCompiler;

impl AccessorCompiler for SetterCompiler {
    type Key = Signature;
    type Output = MemberSetter;

    fn compile(&self, key: &mut Signature, resolver: &MemberResolver) -> ReflectResult<MemberSetter> {
        expect_direction(key, Direction::Write)?;
        let member = resolver.resolve(key)?;
        let write = member::compile_write(&member)?;
        Ok(MemberSetter::new(key.clone(), write))
    }
}

/// Method calls, including indexer accessors and generic methods.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvokerCompiler;

impl AccessorCompiler for InvokerCompiler {
    type Key = Signature;
    type Output = MethodInvoker;

    fn compile(&self, key: &mut Signature, resolver: &MemberResolver) -> ReflectResult<MethodInvoker> {
        let member = resolver.resolve(key)?;
        let MemberHandle::Method(method) = member else {
            return Err(unexpected(&member, "a method"));
        };
        let call = invoke::compile_call(method, key.generic_types(), WriteBack::Store)?;
        Ok(MethodInvoker::new(key.clone(), call))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConstructorCompiler;

impl AccessorCompiler for ConstructorCompiler {
    type Key = Signature;
    type Output = ConstructorInvoker;

    fn compile(
        &self,
        key: &mut Signature,
        resolver: &MemberResolver,
    ) -> ReflectResult<ConstructorInvoker> {
        let member = resolver.resolve(key)?;
        let create = construct::compile_create(&member)?;
        Ok(ConstructorInvoker::new(key.clone(), create))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayGetterCompiler;

impl AccessorCompiler for ArrayGetterCompiler {
    type Key = Signature;
    type Output = ArrayElementGetter;

    fn compile(
        &self,
        key: &mut Signature,
        resolver: &MemberResolver,
    ) -> ReflectResult<ArrayElementGetter> {
        expect_direction(key, Direction::Read)?;
        let member = resolver.resolve(key)?;
        let read = array::compile_element_read(key.target(), &member)?;
        Ok(ArrayElementGetter::new(key.clone(), read))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ArraySetterCompiler;

impl AccessorCompiler for ArraySetterCompiler {
    type Key = Signature;
    type Output = ArrayElementSetter;

    fn compile(
        &self,
        key: &mut Signature,
        resolver: &MemberResolver,
    ) -> ReflectResult<ArrayElementSetter> {
        expect_direction(key, Direction::Write)?;
        let member = resolver.resolve(key)?;
        let write = array::compile_element_write(key.target(), &member)?;
        Ok(ArrayElementSetter::new(key.clone(), write))
    }
}

/// Bulk member copies between two types.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapperCompiler;

impl AccessorCompiler for MapperCompiler {
    type Key = MapSignature;
    type Output = ObjectMapper;

    fn compile(&self, key: &mut MapSignature, resolver: &MemberResolver) -> ReflectResult<ObjectMapper> {
        let steps = mapper::compile_steps(key, resolver)?;
        Ok(ObjectMapper::new(key.clone(), steps))
    }
}

fn expect_direction(key: &Signature, direction: Direction) -> ReflectResult<()> {
    if key.direction() == direction {
        Ok(())
    } else {
        Err(ReflectError::AmbiguousOperation(format!(
            "{:?} request compiled as {:?} accessor",
            key.direction(),
            direction
        )))
    }
}

pub(crate) fn type_info(ty: TypeHandle) -> ReflectResult<Arc<TypeInfo>> {
    registry().get(ty).ok_or_else(|| ReflectError::UnknownType(ty.name()))
}

pub(crate) fn unexpected(member: &MemberHandle, wanted: &str) -> ReflectError {
    ReflectError::AmbiguousOperation(format!("{member:?} is not {wanted}"))
}
