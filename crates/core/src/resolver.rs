//! Member resolution
//!
//! Turns a [`Signature`] into a concrete [`MemberHandle`] by walking the
//! target's type chain, most-derived type first. Resolution writes the handle
//! and the member's actual parameter types back into the signature it was
//! given, which is always the compiler's working copy, never the cache key.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::error::{ReflectError, ReflectResult};
use crate::flags::{names_equal, Flags, MemberKinds};
use crate::meta::{
    registry, MethodInfo, MethodRef, ParameterInfo, PropertyInfo, TypeHandle, TypeInfo, TypeKind,
};
use crate::signature::{Direction, MemberKind, Signature};

/// A resolved member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberHandle {
    /// `fields()[index]` of `declaring`
    Field { declaring: TypeHandle, index: usize },
    /// A property read or write through `accessor`
    ///
    /// `property` is `None` when the accessor was found by its `get_` / `set_`
    /// name without a property descriptor.
    Property {
        declaring: TypeHandle,
        property: Option<usize>,
        accessor: MethodRef,
    },
    Method(MethodRef),
    /// `constructors()[index]` of `declaring`
    Constructor { declaring: TypeHandle, index: usize },
    /// Parameterless construction of a value type
    ZeroInit(TypeHandle),
    /// Construction of an array from a length
    ArrayAlloc { element: TypeHandle },
    ArrayElement { element: TypeHandle },
}

/// A readable or writable data member, as seen by the object mapper.
#[derive(Debug, Clone)]
pub struct DataMember {
    pub name: String,
    pub ty: TypeHandle,
    pub kind: MemberKind,
    pub read: Option<MemberHandle>,
    pub write: Option<MemberHandle>,
}

/// Resolves signatures against the global type registry.
#[derive(Debug, Default)]
pub struct MemberResolver {
    resolutions: AtomicU64,
}

impl MemberResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful resolutions so far.
    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    /// Resolves `signature`, recording the result in it.
    pub fn resolve(&self, signature: &mut Signature) -> ReflectResult<MemberHandle> {
        let (member, params, is_static) = match signature.kind() {
            MemberKind::Field => self.resolve_field(signature)?,
            MemberKind::Property => self.resolve_property(signature)?,
            MemberKind::Method => self.resolve_method(signature)?,
            MemberKind::Constructor => self.resolve_constructor(signature)?,
            MemberKind::ArrayElement => self.resolve_array_element(signature)?,
            MemberKind::Mapping => {
                return Err(ReflectError::AmbiguousOperation(
                    "a mapping pairs members, it does not resolve to a single member".to_string(),
                ));
            }
        };

        self.resolutions.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Resolved {:?} {}.{} -> {:?}",
            signature.kind(),
            signature.target().name(),
            signature.name().unwrap_or("<ctor>"),
            member
        );
        signature.set_resolved(member.clone(), params, is_static);
        Ok(member)
    }

    /// Types searched for members of `target`, most-derived first.
    pub fn type_chain(&self, target: TypeHandle, flags: Flags) -> ReflectResult<Vec<Arc<TypeInfo>>> {
        type_chain(target, flags)
    }

    fn resolve_field(&self, sig: &Signature) -> ReflectResult<(MemberHandle, Vec<TypeHandle>, bool)> {
        let name = sig.name().unwrap_or_default();
        let flags = sig.flags();
        let writing = sig.direction() == Direction::Write;

        for info in self.type_chain(sig.target(), flags)? {
            let matches: Vec<usize> = info
                .fields()
                .iter()
                .enumerate()
                .filter(|(_, f)| flags.matches_name(&f.name, name))
                .filter(|(_, f)| flags.matches_binding(f.visibility, f.is_static()))
                .filter(|(_, f)| !writing || f.is_writable())
                .map(|(index, _)| index)
                .collect();

            let Some(index) = pick(&info, &matches, name, |i| &info.fields()[i].name)? else {
                continue;
            };
            let field = &info.fields()[index];
            let member = MemberHandle::Field {
                declaring: info.handle(),
                index,
            };
            return Ok((member, vec![field.ty], field.is_static()));
        }

        Err(member_not_found(sig))
    }

    fn resolve_property(
        &self,
        sig: &Signature,
    ) -> ReflectResult<(MemberHandle, Vec<TypeHandle>, bool)> {
        let name = sig.name().unwrap_or_default();
        let flags = sig.flags();
        let writing = sig.direction() == Direction::Write;
        let chain = self.type_chain(sig.target(), flags)?;

        for info in &chain {
            let matches: Vec<usize> = info
                .properties()
                .iter()
                .enumerate()
                .filter(|(_, p)| !p.is_indexer() && flags.matches_name(&p.name, name))
                .filter(|(_, p)| flags.matches_binding(p.visibility, p.is_static))
                .map(|(index, _)| index)
                .collect();

            let Some(index) = pick(info, &matches, name, |i| &info.properties()[i].name)? else {
                continue;
            };
            let property = &info.properties()[index];
            let own = if writing {
                property.setter.as_deref()
            } else {
                property.getter.as_deref()
            };

            // The property's own accessor, then the conventional accessor name.
            let fallback = accessor_name(&property.name, writing);
            let accessor = own
                .and_then(|method| find_accessor(&chain, method, flags))
                .or_else(|| find_accessor(&chain, &fallback, flags));
            if let Some(accessor) = accessor {
                return accessor_result(sig, accessor, Some((info.handle(), index, property)));
            }
        }

        // No descriptor: a bare get_X / set_X pair still forms a property.
        let conventional = accessor_name(name, writing);
        match find_accessor(&chain, &conventional, flags & !Flags::PARTIAL_NAME_MATCH) {
            Some(accessor) => accessor_result(sig, accessor, None),
            None => Err(member_not_found(sig)),
        }
    }

    fn resolve_method(&self, sig: &Signature) -> ReflectResult<(MemberHandle, Vec<TypeHandle>, bool)> {
        let name = sig.name().unwrap_or_default();
        let flags = sig.flags();
        let reg = registry();

        for info in self.type_chain(sig.target(), flags)? {
            let matches: Vec<(usize, bool)> = info
                .methods()
                .iter()
                .enumerate()
                .filter(|(_, m)| flags.matches_name(&m.name, name))
                .filter(|(_, m)| flags.matches_binding(m.visibility, m.is_static))
                .filter(|(_, m)| m.generic_arity == sig.generic_types().len())
                .filter_map(|(index, m)| {
                    bind_params(&m.params, sig.param_types(), flags).map(|exact| (index, exact))
                })
                .collect();

            let index = match matches.as_slice() {
                [] => continue,
                [(index, _)] => *index,
                _ => {
                    // Exact parameter matches win over assignable ones.
                    let exact: Vec<usize> =
                        matches.iter().filter(|(_, e)| *e).map(|(i, _)| *i).collect();
                    let preferred: Vec<usize> = if exact.is_empty() {
                        matches.iter().map(|(i, _)| *i).collect()
                    } else {
                        exact
                    };
                    match pick(&info, &preferred, name, |i| &info.methods()[i].name)? {
                        Some(index) => index,
                        None => continue,
                    }
                }
            };

            let method = &info.methods()[index];
            let member = MemberHandle::Method(MethodRef {
                declaring: info.handle(),
                index,
            });
            return Ok((member, method.param_types(), method.is_static));
        }

        Err(ReflectError::MethodNotFound {
            type_name: reg.name_of(sig.target()),
            name: name.to_string(),
            params: describe_types(sig.param_types()),
            flags,
        })
    }

    fn resolve_constructor(
        &self,
        sig: &Signature,
    ) -> ReflectResult<(MemberHandle, Vec<TypeHandle>, bool)> {
        let reg = registry();
        let target = sig.target();
        let info = reg.get(target).ok_or_else(|| ReflectError::UnknownType(target.name()))?;
        let params = sig.param_types();
        let builtins = reg.builtins();

        if let (TypeKind::Array, [length]) = (info.kind(), params) {
            if *length == builtins.int32 || *length == builtins.int64 {
                let element = info.element().ok_or_else(|| {
                    ReflectError::AmbiguousOperation(format!("array type {} has no element", info.name()))
                })?;
                return Ok((MemberHandle::ArrayAlloc { element }, params.to_vec(), true));
            }
        }

        if info.is_value_type() && params.is_empty() {
            return Ok((MemberHandle::ZeroInit(target), Vec::new(), true));
        }

        let flags = sig.flags();
        let matches: Vec<(usize, bool)> = info
            .constructors()
            .iter()
            .enumerate()
            .filter(|(_, c)| flags.matches_binding(c.visibility, false))
            .filter_map(|(index, c)| bind_params(&c.params, params, flags).map(|exact| (index, exact)))
            .collect();

        let index = match matches.as_slice() {
            [] => {
                return Err(ReflectError::ConstructorNotFound {
                    type_name: info.name().to_string(),
                    params: describe_types(params),
                });
            }
            [(index, _)] => *index,
            _ => {
                let exact: Vec<usize> = matches.iter().filter(|(_, e)| *e).map(|(i, _)| *i).collect();
                match exact.as_slice() {
                    [index] => *index,
                    _ => {
                        return Err(ReflectError::AmbiguousOperation(format!(
                            "{} constructors of {} accept ({})",
                            matches.len(),
                            info.name(),
                            describe_types(params)
                        )));
                    }
                }
            }
        };

        let member = MemberHandle::Constructor {
            declaring: target,
            index,
        };
        Ok((member, info.constructors()[index].param_types(), true))
    }

    fn resolve_array_element(
        &self,
        sig: &Signature,
    ) -> ReflectResult<(MemberHandle, Vec<TypeHandle>, bool)> {
        let target = sig.target();
        let info = registry()
            .get(target)
            .ok_or_else(|| ReflectError::UnknownType(target.name()))?;
        let element = match (info.kind(), info.element()) {
            (TypeKind::Array, Some(element)) => element,
            _ => {
                return Err(ReflectError::AmbiguousOperation(format!(
                    "{} is not an array type",
                    info.name()
                )));
            }
        };
        let int32 = registry().builtins().int32;
        let params = match sig.direction() {
            Direction::Read => vec![int32],
            Direction::Write => vec![int32, element],
        };
        Ok((MemberHandle::ArrayElement { element }, params, false))
    }

    /// Data members of `ty` selected by `kinds` and `flags`.
    ///
    /// A member hides same-named members of its base types. Indexers and
    /// literal fields are never data members.
    pub fn data_members(
        &self,
        ty: TypeHandle,
        kinds: MemberKinds,
        flags: Flags,
    ) -> ReflectResult<Vec<DataMember>> {
        let chain = self.type_chain(ty, flags)?;
        let mut members: Vec<DataMember> = Vec::new();
        let seen = |members: &[DataMember], name: &str| members.iter().any(|m| m.name == name);

        for info in &chain {
            if kinds.contains(MemberKinds::FIELD) {
                for (index, field) in info.fields().iter().enumerate() {
                    if field.is_literal()
                        || !flags.matches_binding(field.visibility, field.is_static())
                        || seen(&members, &field.name)
                    {
                        continue;
                    }
                    let handle = MemberHandle::Field {
                        declaring: info.handle(),
                        index,
                    };
                    members.push(DataMember {
                        name: field.name.clone(),
                        ty: field.ty,
                        kind: MemberKind::Field,
                        write: field.is_writable().then(|| handle.clone()),
                        read: Some(handle),
                    });
                }
            }

            if kinds.contains(MemberKinds::PROPERTY) {
                for (index, property) in info.properties().iter().enumerate() {
                    if property.is_indexer()
                        || !flags.matches_binding(property.visibility, property.is_static)
                        || seen(&members, &property.name)
                    {
                        continue;
                    }
                    let accessor = |writing: bool| {
                        let own = if writing { &property.setter } else { &property.getter };
                        let method = own.as_deref()?;
                        let accessor = find_accessor(&chain, method, flags)?;
                        check_accessor_shape(property, accessor, writing).ok()?;
                        Some(MemberHandle::Property {
                            declaring: info.handle(),
                            property: Some(index),
                            accessor,
                        })
                    };
                    members.push(DataMember {
                        name: property.name.clone(),
                        ty: property.ty,
                        kind: MemberKind::Property,
                        read: accessor(false),
                        write: accessor(true),
                    });
                }
            }
        }

        Ok(members)
    }
}

/// Types searched for members of `target`, most-derived first.
pub(crate) fn type_chain(target: TypeHandle, flags: Flags) -> ReflectResult<Vec<Arc<TypeInfo>>> {
    let reg = registry();
    let first = reg.get(target).ok_or_else(|| ReflectError::UnknownType(target.name()))?;
    let mut chain = vec![first];
    if flags.contains(Flags::DECLARED_ONLY) {
        return Ok(chain);
    }
    let mut next = chain[0].base();
    while let Some(ty) = next {
        let info = reg.get(ty).ok_or_else(|| ReflectError::UnknownType(ty.name()))?;
        next = info.base();
        chain.push(info);
    }
    Ok(chain)
}

/// Chooses one of `matches` on `info`; several matches are ambiguous unless
/// exactly one spells the requested name exactly.
fn pick<'a>(
    info: &TypeInfo,
    matches: &[usize],
    name: &str,
    name_of: impl Fn(usize) -> &'a String,
) -> ReflectResult<Option<usize>> {
    match matches {
        [] => Ok(None),
        [index] => Ok(Some(*index)),
        _ => {
            let exact: Vec<usize> = matches.iter().copied().filter(|i| name_of(*i) == name).collect();
            match exact.as_slice() {
                [index] => Ok(Some(*index)),
                _ => Err(ReflectError::AmbiguousOperation(format!(
                    "{} members of {} match '{}'",
                    matches.len(),
                    info.name(),
                    name
                ))),
            }
        }
    }
}

/// Whether declared `params` accept the requested argument types.
///
/// Returns `Some(true)` for an exact match, `Some(false)` for an assignable
/// one and `None` when the parameters do not bind.
fn bind_params(params: &[ParameterInfo], requested: &[TypeHandle], flags: Flags) -> Option<bool> {
    if params.len() != requested.len() {
        return None;
    }
    let reg = registry();
    let mut exact = true;
    for (param, &arg) in params.iter().zip(requested) {
        if param.ty == arg {
            continue;
        }
        // By-ref parameters bind exactly: the value is copied back out.
        if flags.contains(Flags::EXACT_BINDING) || param.mode.is_by_ref() {
            return None;
        }
        if !reg.is_assignable(param.ty, arg) {
            return None;
        }
        exact = false;
    }
    Some(exact)
}

fn accessor_name(property: &str, writing: bool) -> String {
    if writing {
        format!("set_{property}")
    } else {
        format!("get_{property}")
    }
}

/// Finds an accessor method by exact name along `chain`.
fn find_accessor(chain: &[Arc<TypeInfo>], method: &str, flags: Flags) -> Option<MethodRef> {
    let ignore_case = flags.contains(Flags::IGNORE_CASE);
    chain.iter().find_map(|info| {
        info.methods()
            .iter()
            .position(|m| {
                m.generic_arity == 0
                    && names_equal(&m.name, method, ignore_case)
                    && flags.matches_binding(m.visibility, m.is_static)
            })
            .map(|index| MethodRef {
                declaring: info.handle(),
                index,
            })
    })
}

fn method_of(accessor: MethodRef) -> ReflectResult<Arc<TypeInfo>> {
    registry()
        .get(accessor.declaring)
        .ok_or_else(|| ReflectError::UnknownType(accessor.declaring.name()))
}

fn check_shape(method: &MethodInfo, index_count: usize, writing: bool) -> ReflectResult<()> {
    let shape_error = |reason: String| ReflectError::InvalidArgumentShape {
        member: method.name.clone(),
        reason,
    };
    if writing {
        if method.params.len() != index_count + 1 {
            return Err(shape_error(format!(
                "a setter takes {} index parameters and one value, found {} parameters",
                index_count,
                method.params.len()
            )));
        }
        if method.params.iter().any(|p| p.mode.is_by_ref()) {
            return Err(shape_error("setter parameters cannot be passed by reference".to_string()));
        }
    } else if method.params.len() != index_count {
        return Err(shape_error(format!(
            "a getter takes {} index parameters, found {}",
            index_count,
            method.params.len()
        )));
    }
    Ok(())
}

fn check_accessor_shape(property: &PropertyInfo, accessor: MethodRef, writing: bool) -> ReflectResult<()> {
    let info = method_of(accessor)?;
    check_shape(&info.methods()[accessor.index], property.index_types.len(), writing)
}

fn accessor_result(
    sig: &Signature,
    accessor: MethodRef,
    property: Option<(TypeHandle, usize, &PropertyInfo)>,
) -> ReflectResult<(MemberHandle, Vec<TypeHandle>, bool)> {
    let writing = sig.direction() == Direction::Write;
    let info = method_of(accessor)?;
    let method = &info.methods()[accessor.index];
    let index_count = property.map_or(0, |(_, _, p)| p.index_types.len());
    check_shape(method, index_count, writing)?;

    let member = MemberHandle::Property {
        declaring: property.map_or(accessor.declaring, |(declaring, _, _)| declaring),
        property: property.map(|(_, index, _)| index),
        accessor,
    };
    Ok((member, method.param_types(), method.is_static))
}

fn member_not_found(sig: &Signature) -> ReflectError {
    ReflectError::MemberNotFound {
        type_name: sig.target().name(),
        name: sig.name().unwrap_or_default().to_string(),
        flags: sig.flags(),
    }
}

pub(crate) fn describe_types(types: &[TypeHandle]) -> String {
    types.iter().map(|ty| ty.name()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Bag, Color, Employee, Person, Point};

    fn resolve(sig: Signature) -> ReflectResult<(MemberHandle, Signature)> {
        let mut working = sig;
        let member = MemberResolver::new().resolve(&mut working)?;
        Ok((member, working))
    }

    #[test]
    fn test_field_resolution_records_member_type() {
        let point = TypeHandle::of::<Point>();
        let (member, sig) =
            resolve(Signature::field(point, "X", Direction::Read, Flags::DEFAULT)).unwrap();
        assert!(matches!(member, MemberHandle::Field { declaring, .. } if declaring == point));
        assert_eq!(sig.resolved_params(), &[TypeHandle::of::<i32>()]);
        assert!(!sig.is_static());
    }

    #[test]
    fn test_inherited_field_found_unless_declared_only() {
        let employee = TypeHandle::of::<Employee>();
        let found = resolve(Signature::field(employee, "Age", Direction::Read, Flags::DEFAULT));
        assert!(matches!(
            found,
            Ok((MemberHandle::Field { declaring, .. }, _)) if declaring == TypeHandle::of::<Person>()
        ));

        let declared = Flags::DEFAULT | Flags::DECLARED_ONLY;
        let missing = resolve(Signature::field(employee, "Age", Direction::Read, declared));
        assert!(matches!(missing, Err(ReflectError::MemberNotFound { .. })));
    }

    #[test]
    fn test_visibility_and_case_rules() {
        let person = TypeHandle::of::<Person>();
        let public_only = Flags::INSTANCE_PUBLIC;
        assert!(resolve(Signature::field(person, "secret", Direction::Read, public_only)).is_err());
        assert!(resolve(Signature::field(person, "secret", Direction::Read, Flags::DEFAULT)).is_ok());
        assert!(resolve(Signature::field(person, "AGE", Direction::Read, Flags::DEFAULT)).is_err());
        assert!(resolve(Signature::field(
            person,
            "AGE",
            Direction::Read,
            Flags::DEFAULT | Flags::IGNORE_CASE
        ))
        .is_ok());
    }

    #[test]
    fn test_readonly_field_has_no_writer() {
        let person = TypeHandle::of::<Person>();
        assert!(resolve(Signature::field(person, "Id", Direction::Read, Flags::DEFAULT)).is_ok());
        assert!(matches!(
            resolve(Signature::field(person, "Id", Direction::Write, Flags::DEFAULT)),
            Err(ReflectError::MemberNotFound { .. })
        ));
    }

    #[test]
    fn test_literal_field_is_static() {
        let color = TypeHandle::of::<Color>();
        let flags = Flags::STATIC_ANY_VISIBILITY;
        let (_, sig) = resolve(Signature::field(color, "Green", Direction::Read, flags)).unwrap();
        assert!(sig.is_static());
        assert!(resolve(Signature::field(color, "Green", Direction::Write, flags)).is_err());
    }

    #[test]
    fn test_property_uses_accessor_methods() {
        let person = TypeHandle::of::<Person>();
        let (member, sig) =
            resolve(Signature::property(person, "Name", Direction::Write, Flags::DEFAULT)).unwrap();
        let MemberHandle::Property { accessor, property, .. } = member else {
            panic!("expected a property");
        };
        assert!(property.is_some());
        assert_eq!(person.info().methods()[accessor.index].name, "set_Name");
        assert_eq!(sig.resolved_params(), &[TypeHandle::of::<String>()]);
    }

    #[test]
    fn test_accessor_without_descriptor() {
        let person = TypeHandle::of::<Person>();
        let (member, _) =
            resolve(Signature::property(person, "Nickname", Direction::Read, Flags::DEFAULT))
                .unwrap();
        assert!(matches!(member, MemberHandle::Property { property: None, .. }));
    }

    #[test]
    fn test_malformed_accessor_shape() {
        let person = TypeHandle::of::<Person>();
        assert!(matches!(
            resolve(Signature::property(person, "Nickname", Direction::Write, Flags::DEFAULT)),
            Err(ReflectError::InvalidArgumentShape { .. })
        ));
    }

    #[test]
    fn test_method_binding() {
        let person = TypeHandle::of::<Person>();
        let int32 = TypeHandle::of::<i32>();
        let (member, sig) =
            resolve(Signature::method(person, "AddYears", &[int32], Flags::DEFAULT)).unwrap();
        assert!(matches!(member, MemberHandle::Method(_)));
        assert!(!sig.is_static());

        assert!(matches!(
            resolve(Signature::method(person, "AddYears", &[], Flags::DEFAULT)),
            Err(ReflectError::MethodNotFound { .. })
        ));
        assert!(matches!(
            resolve(Signature::method(person, "AddYears", &[TypeHandle::of::<i64>()], Flags::DEFAULT)),
            Err(ReflectError::MethodNotFound { .. })
        ));
    }

    #[test]
    fn test_assignable_arguments_unless_exact() {
        let person = TypeHandle::of::<Person>();
        let employee = TypeHandle::of::<Employee>();
        assert!(resolve(Signature::method(person, "Greet", &[employee], Flags::DEFAULT)).is_ok());
        let exact = Flags::DEFAULT | Flags::EXACT_BINDING;
        assert!(resolve(Signature::method(person, "Greet", &[employee], exact)).is_err());
        assert!(resolve(Signature::method(person, "Greet", &[person], exact)).is_ok());
    }

    #[test]
    fn test_static_method_needs_static_flag() {
        let person = TypeHandle::of::<Person>();
        let string = TypeHandle::of::<String>();
        assert!(resolve(Signature::method(person, "Create", &[string], Flags::DEFAULT)).is_err());
        let (_, sig) =
            resolve(Signature::method(person, "Create", &[string], Flags::STATIC_ANY_VISIBILITY))
                .unwrap();
        assert!(sig.is_static());
    }

    #[test]
    fn test_constructor_shapes() {
        let point = TypeHandle::of::<Point>();
        let (member, _) = resolve(Signature::constructor(point, &[], Flags::DEFAULT)).unwrap();
        assert_eq!(member, MemberHandle::ZeroInit(point));

        let array = registry().array_of(point);
        let (member, _) =
            resolve(Signature::constructor(array, &[TypeHandle::of::<i32>()], Flags::DEFAULT))
                .unwrap();
        assert_eq!(member, MemberHandle::ArrayAlloc { element: point });

        let person = TypeHandle::of::<Person>();
        let string = TypeHandle::of::<String>();
        let int32 = TypeHandle::of::<i32>();
        let (member, sig) =
            resolve(Signature::constructor(person, &[string, int32], Flags::DEFAULT)).unwrap();
        assert!(matches!(member, MemberHandle::Constructor { .. }));
        assert_eq!(sig.resolved_params(), &[string, int32]);

        assert!(matches!(
            resolve(Signature::constructor(person, &[int32, int32, int32], Flags::DEFAULT)),
            Err(ReflectError::ConstructorNotFound { .. })
        ));
    }

    #[test]
    fn test_array_element_requires_array() {
        let point = TypeHandle::of::<Point>();
        assert!(matches!(
            resolve(Signature::array_element(point, Direction::Read)),
            Err(ReflectError::AmbiguousOperation(_))
        ));
        let array = registry().array_of(point);
        let (member, sig) = resolve(Signature::array_element(array, Direction::Write)).unwrap();
        assert_eq!(member, MemberHandle::ArrayElement { element: point });
        assert_eq!(sig.resolved_params().len(), 2);
    }

    #[test]
    fn test_indexer_is_not_a_plain_property() {
        let bag = TypeHandle::of::<Bag>();
        assert!(resolve(Signature::property(bag, "Item", Direction::Read, Flags::DEFAULT)).is_err());
        let int32 = TypeHandle::of::<i32>();
        assert!(resolve(Signature::method(bag, "get_Item", &[int32], Flags::DEFAULT)).is_ok());
    }

    #[test]
    fn test_data_members_hide_base_members() {
        let resolver = MemberResolver::new();
        let members = resolver
            .data_members(TypeHandle::of::<Employee>(), MemberKinds::ALL, Flags::DEFAULT)
            .unwrap();
        let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
        assert!(names.contains(&"Company"));
        assert!(names.contains(&"Age"));
        assert!(names.contains(&"Name"));
        let id = members.iter().find(|m| m.name == "Id").unwrap();
        assert!(id.read.is_some());
        assert!(id.write.is_none());
    }

    #[test]
    fn test_resolution_counter() {
        let resolver = MemberResolver::new();
        let mut sig = Signature::field(TypeHandle::of::<Point>(), "X", Direction::Read, Flags::DEFAULT);
        resolver.resolve(&mut sig).unwrap();
        let mut missing =
            Signature::field(TypeHandle::of::<Point>(), "Z", Direction::Read, Flags::DEFAULT);
        assert!(resolver.resolve(&mut missing).is_err());
        assert_eq!(resolver.resolutions(), 1);
    }
}
