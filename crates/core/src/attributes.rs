//! Attribute lookups and type relations
//!
//! Attribute names match exactly. In member queries an empty name list
//! selects every member of the requested kinds, attributed or not; the member
//! rules (hiding, visibility, declared-only) are those of [`query`](crate::query).

use crate::error::ReflectResult;
use crate::flags::Flags;
use crate::meta::{
    registry, Attribute, ConstructorInfo, EnumValue, FieldAccess, FieldInfo, MethodInfo,
    PropertyInfo, TypeHandle, TypeInfo, Value,
};
use crate::query::{self, Declared};
use crate::signature::MemberKind;

/// Anything that carries attributes.
pub trait AttributeProvider {
    fn attribute_list(&self) -> &[Attribute];

    /// The first attribute, in declaration order.
    fn first_attribute(&self) -> Option<&Attribute> {
        self.attribute_list().first()
    }

    /// The first attribute named `name`.
    fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attribute_list().iter().find(|a| a.is(name))
    }

    /// Attributes named by any of `names`; all of them when `names` is empty.
    fn attributes_named(&self, names: &[&str]) -> Vec<&Attribute> {
        self.attribute_list()
            .iter()
            .filter(|a| names.is_empty() || names.iter().any(|n| a.is(n)))
            .collect()
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    fn has_any_attribute(&self, names: &[&str]) -> bool {
        !self.attributes_named(names).is_empty()
    }

    /// Holds trivially for an empty `names`.
    fn has_all_attributes(&self, names: &[&str]) -> bool {
        names.iter().all(|n| self.has_attribute(n))
    }
}

macro_rules! attribute_provider {
    ($($ty:ty),* $(,)?) => {
        $(
            impl AttributeProvider for $ty {
                fn attribute_list(&self) -> &[Attribute] {
                    &self.attributes
                }
            }
        )*
    };
}

attribute_provider!(FieldInfo, PropertyInfo, MethodInfo, ConstructorInfo);

impl AttributeProvider for TypeInfo {
    fn attribute_list(&self) -> &[Attribute] {
        self.attributes()
    }
}

impl<T: AttributeProvider> AttributeProvider for Declared<T> {
    fn attribute_list(&self) -> &[Attribute] {
        self.member.attribute_list()
    }
}

/// A member returned by [`members_with`].
#[derive(Debug, Clone)]
pub enum AttributedMember {
    Field(Declared<FieldInfo>),
    Property(Declared<PropertyInfo>),
    Method(Declared<MethodInfo>),
    Constructor(Declared<ConstructorInfo>),
}

impl AttributedMember {
    pub fn kind(&self) -> MemberKind {
        match self {
            AttributedMember::Field(_) => MemberKind::Field,
            AttributedMember::Property(_) => MemberKind::Property,
            AttributedMember::Method(_) => MemberKind::Method,
            AttributedMember::Constructor(_) => MemberKind::Constructor,
        }
    }

    /// Member name; constructors are named `.ctor`.
    pub fn name(&self) -> &str {
        match self {
            AttributedMember::Field(f) => &f.member.name,
            AttributedMember::Property(p) => &p.member.name,
            AttributedMember::Method(m) => &m.member.name,
            AttributedMember::Constructor(_) => ".ctor",
        }
    }

    pub fn declaring(&self) -> TypeHandle {
        match self {
            AttributedMember::Field(f) => f.declaring,
            AttributedMember::Property(p) => p.declaring,
            AttributedMember::Method(m) => m.declaring,
            AttributedMember::Constructor(c) => c.declaring,
        }
    }
}

impl AttributeProvider for AttributedMember {
    fn attribute_list(&self) -> &[Attribute] {
        match self {
            AttributedMember::Field(f) => f.attribute_list(),
            AttributedMember::Property(p) => p.attribute_list(),
            AttributedMember::Method(m) => m.attribute_list(),
            AttributedMember::Constructor(c) => c.attribute_list(),
        }
    }
}

fn selected<T: AttributeProvider>(members: Vec<T>, names: &[&str]) -> Vec<T> {
    if names.is_empty() {
        return members;
    }
    members.into_iter().filter(|m| m.has_any_attribute(names)).collect()
}

pub fn fields_with(
    ty: TypeHandle,
    flags: Flags,
    names: &[&str],
) -> ReflectResult<Vec<Declared<FieldInfo>>> {
    Ok(selected(query::fields(ty, flags, &[])?, names))
}

pub fn properties_with(
    ty: TypeHandle,
    flags: Flags,
    names: &[&str],
) -> ReflectResult<Vec<Declared<PropertyInfo>>> {
    Ok(selected(query::properties(ty, flags, &[])?, names))
}

pub fn methods_with(
    ty: TypeHandle,
    flags: Flags,
    names: &[&str],
) -> ReflectResult<Vec<Declared<MethodInfo>>> {
    Ok(selected(query::methods(ty, flags, &[])?, names))
}

pub fn constructors_with(
    ty: TypeHandle,
    flags: Flags,
    names: &[&str],
) -> ReflectResult<Vec<Declared<ConstructorInfo>>> {
    let constructors = query::constructors(ty, flags)?
        .into_iter()
        .map(|member| Declared {
            declaring: ty,
            member,
        })
        .collect();
    Ok(selected(constructors, names))
}

/// Members of the given kinds carrying any of `names`, in kind order.
///
/// Kinds other than fields, properties, methods and constructors select
/// nothing.
pub fn members_with(
    ty: TypeHandle,
    kinds: &[MemberKind],
    flags: Flags,
    names: &[&str],
) -> ReflectResult<Vec<AttributedMember>> {
    let mut found = Vec::new();
    if kinds.contains(&MemberKind::Field) {
        found.extend(fields_with(ty, flags, names)?.into_iter().map(AttributedMember::Field));
    }
    if kinds.contains(&MemberKind::Property) {
        found.extend(
            properties_with(ty, flags, names)?
                .into_iter()
                .map(AttributedMember::Property),
        );
    }
    if kinds.contains(&MemberKind::Method) {
        found.extend(methods_with(ty, flags, names)?.into_iter().map(AttributedMember::Method));
    }
    if kinds.contains(&MemberKind::Constructor) {
        found.extend(
            constructors_with(ty, flags, names)?
                .into_iter()
                .map(AttributedMember::Constructor),
        );
    }
    Ok(found)
}

pub fn fields_and_properties_with(
    ty: TypeHandle,
    flags: Flags,
    names: &[&str],
) -> ReflectResult<Vec<AttributedMember>> {
    members_with(ty, &[MemberKind::Field, MemberKind::Property], flags, names)
}

/// Every member of the given kinds that carries at least one of `names`
/// (or any attribute, when `names` is empty), paired with those attributes.
pub fn members_and_attributes(
    ty: TypeHandle,
    kinds: &[MemberKind],
    flags: Flags,
    names: &[&str],
) -> ReflectResult<Vec<(AttributedMember, Vec<Attribute>)>> {
    Ok(members_with(ty, kinds, flags, &[])?
        .into_iter()
        .filter_map(|member| {
            let attributes: Vec<Attribute> =
                member.attributes_named(names).into_iter().cloned().collect();
            (!attributes.is_empty()).then_some((member, attributes))
        })
        .collect())
}

/// Attributes of the enum member `value` stands for; empty when the value
/// matches no declared member.
pub fn enum_attributes(value: &EnumValue) -> Vec<Attribute> {
    let Some(info) = registry().get(value.ty) else {
        return Vec::new();
    };
    info.fields()
        .iter()
        .find(|field| match &field.access {
            FieldAccess::Literal(Value::Enum(member)) => member.value == value.value,
            _ => false,
        })
        .map(|field| field.attributes.clone())
        .unwrap_or_default()
}

/// The first attribute of the enum member `value` stands for.
pub fn enum_attribute(value: &EnumValue, name: &str) -> Option<Attribute> {
    enum_attributes(value).into_iter().find(|a| a.is(name))
}

/// Whether `ty` derives from `base`.
///
/// A type never inherits from itself; every other type inherits `Object`.
pub fn inherits(ty: TypeHandle, base: TypeHandle) -> bool {
    let reg = registry();
    if ty == base {
        return false;
    }
    if base == reg.builtins().object {
        return true;
    }
    let mut current = reg.get(ty).and_then(|info| info.base());
    while let Some(handle) = current {
        if handle == base {
            return true;
        }
        current = reg.get(handle).and_then(|info| info.base());
    }
    false
}

/// Whether `ty` implements the interface `interface`, directly, through a
/// base type, or through another interface.
pub fn implements(ty: TypeHandle, interface: TypeHandle) -> bool {
    let reg = registry();
    reg.get(interface).is_some_and(|info| info.is_interface()) && reg.implements(ty, interface)
}

/// [`implements`] when `base` is an interface, [`inherits`] otherwise.
pub fn inherits_or_implements(ty: TypeHandle, base: TypeHandle) -> bool {
    if registry().get(base).is_some_and(|info| info.is_interface()) {
        implements(ty, base)
    } else {
        inherits(ty, base)
    }
}
