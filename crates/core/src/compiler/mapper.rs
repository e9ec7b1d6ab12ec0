//! Object mapper pairing
//!
//! Every writable member of the target is paired with the readable source
//! member of the same name. A pairing is kept when the target member's type
//! accepts the source member's type; an allow-list restricts it further.

use tracing::debug;

use super::member;
use crate::accessor::{MapStep, MappedMember};
use crate::error::{ReflectError, ReflectResult};
use crate::flags::{names_equal, Flags};
use crate::meta::registry;
use crate::resolver::{DataMember, MemberResolver};
use crate::signature::MapSignature;

pub(crate) fn compile_steps(key: &MapSignature, resolver: &MemberResolver) -> ReflectResult<Vec<MapStep>> {
    let ignore_case = key.ignores_case();
    let name_flags = if ignore_case {
        key.flags() | Flags::IGNORE_CASE
    } else {
        key.flags()
    };
    let allowed = |name: &str| {
        key.names().is_empty() || key.names().iter().any(|n| name_flags.matches_name(name, n))
    };

    let sources: Vec<DataMember> = resolver
        .data_members(key.source(), key.source_kinds(), key.flags())?
        .into_iter()
        .filter(|m| m.read.is_some() && allowed(&m.name))
        .collect();
    let targets: Vec<DataMember> = resolver
        .data_members(key.target(), key.target_kinds(), key.flags())?
        .into_iter()
        .filter(|m| m.write.is_some() && allowed(&m.name))
        .collect();

    let reg = registry();
    let mut pairs: Vec<(&DataMember, &DataMember)> = Vec::new();
    for target in &targets {
        let candidates: Vec<&DataMember> = sources
            .iter()
            .filter(|s| names_equal(&s.name, &target.name, ignore_case))
            .filter(|s| reg.is_assignable(target.ty, s.ty))
            .collect();
        match candidates.as_slice() {
            [] => {}
            [source] => pairs.push((source, target)),
            _ => {
                return Err(ReflectError::AmbiguousMapping {
                    target: format!("{}.{}", key.target().name(), target.name),
                    candidates: candidates.iter().map(|s| s.name.clone()).collect(),
                });
            }
        }
    }

    // One source member must not feed two target members either.
    for (source, _) in &pairs {
        let fed: Vec<String> = pairs
            .iter()
            .filter(|(s, _)| s.name == source.name)
            .map(|(_, t)| t.name.clone())
            .collect();
        if fed.len() > 1 {
            return Err(ReflectError::AmbiguousMapping {
                target: format!("{}.{}", key.source().name(), source.name),
                candidates: fed,
            });
        }
    }

    let mut steps = Vec::with_capacity(pairs.len());
    for (source, target) in pairs {
        let (Some(read), Some(write)) = (&source.read, &target.write) else {
            continue;
        };
        steps.push(MapStep {
            member: MappedMember {
                source: source.name.clone(),
                target: target.name.clone(),
            },
            read: member::compile_read(read)?,
            write: member::compile_write(write)?,
        });
    }

    debug!(
        "Mapped {} members from {} to {}",
        steps.len(),
        key.source().name(),
        key.target().name()
    );
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::ObjectMapper;
    use crate::fixtures::{Badge, DuplicateNames, PersonRecord, PersonView, Point};
    use crate::flags::MemberKinds;
    use crate::meta::{TypeHandle, Value, ValueCell};

    fn mapper(
        source: TypeHandle,
        target: TypeHandle,
        source_kinds: MemberKinds,
        target_kinds: MemberKinds,
        names: &[&str],
    ) -> ReflectResult<ObjectMapper> {
        mapper_with(source, target, source_kinds, target_kinds, names, Flags::DEFAULT)
    }

    fn mapper_with(
        source: TypeHandle,
        target: TypeHandle,
        source_kinds: MemberKinds,
        target_kinds: MemberKinds,
        names: &[&str],
        flags: Flags,
    ) -> ReflectResult<ObjectMapper> {
        let key = MapSignature::new(source, target, source_kinds, target_kinds, names, flags);
        let steps = compile_steps(&key, &MemberResolver::new())?;
        Ok(ObjectMapper::new(key, steps))
    }

    #[test]
    fn test_fields_onto_property_and_field() {
        let mapper = mapper(
            TypeHandle::of::<PersonRecord>(),
            TypeHandle::of::<PersonView>(),
            MemberKinds::ALL,
            MemberKinds::ALL,
            &[],
        )
        .unwrap();
        assert_eq!(mapper.len(), 2);

        let source = Value::new_object(PersonRecord::new("Ada", 36));
        let target = Value::new_object(PersonView::default());
        mapper.map(&source, &target).unwrap();
        let copied = target
            .as_object()
            .and_then(|o| o.with(|v: &PersonView| (v.name.clone(), v.age)));
        assert_eq!(copied, Some(("Ada".to_string(), 36)));
    }

    #[test]
    fn test_kind_change_ignores_case() {
        let mapper = mapper(
            TypeHandle::of::<Badge>(),
            TypeHandle::of::<PersonView>(),
            MemberKinds::FIELD,
            MemberKinds::PROPERTY,
            &[],
        )
        .unwrap();
        let pairs: Vec<&MappedMember> = mapper.members().collect();
        assert_eq!(
            pairs,
            vec![&MappedMember {
                source: "name".to_string(),
                target: "Name".to_string()
            }]
        );

        let target = Value::new_object(PersonView::default());
        mapper
            .map(&Value::new_object(Badge::new("Grace")), &target)
            .unwrap();
        let name = target.as_object().and_then(|o| o.with(|v: &PersonView| v.name.clone()));
        assert_eq!(name.as_deref(), Some("Grace"));
    }

    #[test]
    fn test_same_kinds_are_case_sensitive() {
        let mapper = mapper(
            TypeHandle::of::<Badge>(),
            TypeHandle::of::<PersonRecord>(),
            MemberKinds::FIELD,
            MemberKinds::FIELD,
            &[],
        )
        .unwrap();
        assert!(mapper.is_empty());
    }

    #[test]
    fn test_allow_list() {
        let mapper = mapper(
            TypeHandle::of::<PersonRecord>(),
            TypeHandle::of::<PersonView>(),
            MemberKinds::ALL,
            MemberKinds::ALL,
            &["Age"],
        )
        .unwrap();
        assert_eq!(mapper.len(), 1);
        assert_eq!(mapper.members().next().map(|m| m.target.as_str()), Some("Age"));
    }

    #[test]
    fn test_partial_name_allow_list() {
        let record = TypeHandle::of::<PersonRecord>();
        let view = TypeHandle::of::<PersonView>();
        let exact = mapper(record, view, MemberKinds::ALL, MemberKinds::ALL, &["Ag"]).unwrap();
        assert!(exact.is_empty());

        let partial = mapper_with(
            record,
            view,
            MemberKinds::ALL,
            MemberKinds::ALL,
            &["Ag"],
            Flags::DEFAULT | Flags::PARTIAL_NAME_MATCH,
        )
        .unwrap();
        assert_eq!(partial.len(), 1);
        assert_eq!(partial.members().next().map(|m| m.target.as_str()), Some("Age"));

        // Field to property mapping folds case for partial names too.
        let folded = mapper_with(
            TypeHandle::of::<Badge>(),
            view,
            MemberKinds::FIELD,
            MemberKinds::PROPERTY,
            &["NAM"],
            Flags::DEFAULT | Flags::PARTIAL_NAME_MATCH,
        )
        .unwrap();
        assert_eq!(folded.len(), 1);
    }

    #[test]
    fn test_case_folded_collision_is_ambiguous() {
        let result = mapper(
            TypeHandle::of::<DuplicateNames>(),
            TypeHandle::of::<PersonView>(),
            MemberKinds::FIELD,
            MemberKinds::PROPERTY,
            &[],
        );
        assert!(matches!(result, Err(ReflectError::AmbiguousMapping { .. })));
    }

    #[test]
    fn test_value_type_target_written_back() {
        let point = TypeHandle::of::<Point>();
        let mapper = mapper(point, point, MemberKinds::FIELD, MemberKinds::FIELD, &[]).unwrap();
        let cell = ValueCell::wrap(Point::default());
        mapper
            .map(&Value::new_struct(Point::new(3, 4)), &Value::Cell(cell.clone()))
            .unwrap();
        assert_eq!(cell.read::<Point>().unwrap(), Point::new(3, 4));
    }
}
