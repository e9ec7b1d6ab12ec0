//! Member queries
//!
//! Lists the members of a type the way the resolver sees them: the type
//! chain is walked most-derived first (only the type itself with
//! `DECLARED_ONLY`) and a member hides same-named members of its bases.
//! Methods hide base methods with the same name and parameter types.
//!
//! An empty `names` filter selects every member; otherwise a member is kept
//! when its name matches one entry under the flags' name rules.

use crate::error::{ReflectError, ReflectResult};
use crate::flags::Flags;
use crate::meta::{registry, ConstructorInfo, FieldInfo, MethodInfo, PropertyInfo, TypeHandle};
use crate::resolver::{describe_types, type_chain};

/// A member together with the type that declares it.
#[derive(Debug, Clone)]
pub struct Declared<T> {
    pub declaring: TypeHandle,
    pub member: T,
}

fn name_selected(flags: Flags, member: &str, names: &[&str]) -> bool {
    names.is_empty() || names.iter().any(|name| flags.matches_name(member, name))
}

pub fn fields(ty: TypeHandle, flags: Flags, names: &[&str]) -> ReflectResult<Vec<Declared<FieldInfo>>> {
    let mut found: Vec<Declared<FieldInfo>> = Vec::new();
    for info in type_chain(ty, flags)? {
        for field in info.fields() {
            if !flags.matches_binding(field.visibility, field.is_static())
                || (flags.contains(Flags::EXCLUDE_BACKING_MEMBERS) && field.is_backing_field())
                || !name_selected(flags, &field.name, names)
                || found.iter().any(|f| f.member.name == field.name)
            {
                continue;
            }
            found.push(Declared {
                declaring: info.handle(),
                member: field.clone(),
            });
        }
    }
    Ok(found)
}

pub fn properties(
    ty: TypeHandle,
    flags: Flags,
    names: &[&str],
) -> ReflectResult<Vec<Declared<PropertyInfo>>> {
    let mut found: Vec<Declared<PropertyInfo>> = Vec::new();
    for info in type_chain(ty, flags)? {
        for property in info.properties() {
            if !flags.matches_binding(property.visibility, property.is_static)
                || !name_selected(flags, &property.name, names)
                || found.iter().any(|p| p.member.name == property.name)
            {
                continue;
            }
            found.push(Declared {
                declaring: info.handle(),
                member: property.clone(),
            });
        }
    }
    Ok(found)
}

pub fn methods(ty: TypeHandle, flags: Flags, names: &[&str]) -> ReflectResult<Vec<Declared<MethodInfo>>> {
    let mut found: Vec<Declared<MethodInfo>> = Vec::new();
    for info in type_chain(ty, flags)? {
        for method in info.methods() {
            if !flags.matches_binding(method.visibility, method.is_static)
                || (flags.contains(Flags::EXCLUDE_BACKING_MEMBERS) && method.is_property_accessor())
                || !name_selected(flags, &method.name, names)
            {
                continue;
            }
            let params = method.param_types();
            let hidden = found
                .iter()
                .any(|m| m.member.name == method.name && m.member.param_types() == params);
            if !hidden {
                found.push(Declared {
                    declaring: info.handle(),
                    member: method.clone(),
                });
            }
        }
    }
    Ok(found)
}

/// Constructors of `ty` itself; constructors are never inherited.
pub fn constructors(ty: TypeHandle, flags: Flags) -> ReflectResult<Vec<ConstructorInfo>> {
    let info = registry().get(ty).ok_or_else(|| ReflectError::UnknownType(ty.name()))?;
    Ok(info
        .constructors()
        .iter()
        .filter(|c| flags.matches_binding(c.visibility, false))
        .cloned()
        .collect())
}

/// The first field named `name`, most-derived first.
pub fn field(ty: TypeHandle, name: &str, flags: Flags) -> ReflectResult<Declared<FieldInfo>> {
    fields(ty, flags, &[name])?
        .into_iter()
        .next()
        .ok_or_else(|| ReflectError::MemberNotFound {
            type_name: ty.name(),
            name: name.to_string(),
            flags,
        })
}

pub fn property(ty: TypeHandle, name: &str, flags: Flags) -> ReflectResult<Declared<PropertyInfo>> {
    properties(ty, flags, &[name])?
        .into_iter()
        .next()
        .ok_or_else(|| ReflectError::MemberNotFound {
            type_name: ty.name(),
            name: name.to_string(),
            flags,
        })
}

/// The first method named `name` whose parameter types equal `params`.
pub fn method(
    ty: TypeHandle,
    name: &str,
    params: &[TypeHandle],
    flags: Flags,
) -> ReflectResult<Declared<MethodInfo>> {
    methods(ty, flags, &[name])?
        .into_iter()
        .find(|m| m.member.param_types() == params)
        .ok_or_else(|| ReflectError::MethodNotFound {
            type_name: ty.name(),
            name: name.to_string(),
            params: describe_types(params),
            flags,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Employee, Person};

    #[test]
    fn test_fields_include_inherited_unless_declared_only() {
        let employee = TypeHandle::of::<Employee>();
        let all = fields(employee, Flags::DEFAULT, &[]).unwrap();
        assert!(all.iter().any(|f| f.member.name == "Company"));
        let age = all.iter().find(|f| f.member.name == "Age").unwrap();
        assert_eq!(age.declaring, TypeHandle::of::<Person>());

        let own = fields(employee, Flags::DEFAULT | Flags::DECLARED_ONLY, &[]).unwrap();
        assert!(own.iter().all(|f| f.declaring == employee));
    }

    #[test]
    fn test_visibility_filters() {
        let person = TypeHandle::of::<Person>();
        let public = fields(person, Flags::INSTANCE_PUBLIC, &[]).unwrap();
        assert!(public.iter().all(|f| f.member.name != "secret"));
        let any = fields(person, Flags::INSTANCE_ANY_VISIBILITY, &[]).unwrap();
        assert!(any.iter().any(|f| f.member.name == "secret"));
        let statics = fields(person, Flags::STATIC_ANY_VISIBILITY, &[]).unwrap();
        assert_eq!(statics.len(), 1);
        assert_eq!(statics[0].member.name, "Population");
    }

    #[test]
    fn test_backing_members_excluded() {
        let person = TypeHandle::of::<Person>();
        let flags = Flags::INSTANCE_ANY_VISIBILITY;
        let with = methods(person, flags, &[]).unwrap();
        assert!(with.iter().any(|m| m.member.name == "get_Name"));
        let without = methods(person, flags | Flags::EXCLUDE_BACKING_MEMBERS, &[]).unwrap();
        assert!(without.iter().all(|m| !m.member.is_property_accessor()));
        assert!(without.iter().any(|m| m.member.name == "AddYears"));

        let fields_without = fields(person, flags | Flags::EXCLUDE_BACKING_MEMBERS, &[]).unwrap();
        assert!(fields_without.iter().all(|f| !f.member.is_backing_field()));
        let fields_with = fields(person, flags, &[]).unwrap();
        assert!(fields_with.iter().any(|f| f.member.is_backing_field()));
    }

    #[test]
    fn test_overrides_hide_base_methods() {
        let employee = TypeHandle::of::<Employee>();
        let describe = methods(employee, Flags::DEFAULT, &["Describe"]).unwrap();
        assert_eq!(describe.len(), 1);
        assert_eq!(describe[0].declaring, employee);
    }

    #[test]
    fn test_name_filters() {
        let person = TypeHandle::of::<Person>();
        let partial = Flags::DEFAULT | Flags::PARTIAL_NAME_MATCH | Flags::IGNORE_CASE;
        let names: Vec<String> = methods(person, partial, &["years"])
            .unwrap()
            .into_iter()
            .map(|m| m.member.name)
            .collect();
        assert_eq!(names, vec!["AddYears".to_string()]);

        let props = properties(person, Flags::DEFAULT, &["Name"]).unwrap();
        assert_eq!(props.len(), 1);
    }

    #[test]
    fn test_single_lookups() {
        let person = TypeHandle::of::<Person>();
        let int32 = TypeHandle::of::<i32>();
        assert_eq!(field(person, "Age", Flags::DEFAULT).unwrap().member.ty, int32);
        assert!(matches!(
            field(person, "Missing", Flags::DEFAULT),
            Err(ReflectError::MemberNotFound { .. })
        ));
        assert!(property(person, "Name", Flags::DEFAULT).is_ok());
        assert!(method(person, "AddYears", &[int32], Flags::DEFAULT).is_ok());
        assert!(matches!(
            method(person, "AddYears", &[], Flags::DEFAULT),
            Err(ReflectError::MethodNotFound { .. })
        ));
    }

    #[test]
    fn test_constructors_by_visibility() {
        let person = TypeHandle::of::<Person>();
        let public = constructors(person, Flags::INSTANCE_PUBLIC).unwrap();
        let all = constructors(person, Flags::INSTANCE_ANY_VISIBILITY).unwrap();
        assert!(public.len() < all.len());
    }
}
