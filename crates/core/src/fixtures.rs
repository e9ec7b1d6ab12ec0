//! Reflectable types shared by the unit tests

use std::sync::atomic::{AtomicI32, Ordering};

use crate::meta::{
    generic_method, registry, Attribute, FieldInfo, InvokeError, InvokeResult, MethodInfo,
    ObjectRef, ParameterInfo, TypeBuilder, TypeHandle, Value,
};
use crate::Reflect;

fn int32() -> TypeHandle {
    TypeHandle::of::<i32>()
}

fn string() -> TypeHandle {
    TypeHandle::of::<String>()
}

fn arg<T: crate::meta::FromValue>(args: &[Value], index: usize) -> InvokeResult<T> {
    let value = args.get(index).ok_or(InvokeError::ArgumentCount {
        expected: index + 1,
        received: args.len(),
    })?;
    value.to()
}

#[derive(Debug, Clone, PartialEq, Default, Reflect)]
#[reflect(name = "Point", extend = "describe_point")]
pub struct Point {
    #[reflect(name = "X")]
    pub(crate) x: i32,

    #[reflect(name = "Y")]
    pub(crate) y: i32,

    /// Bumped by every read of `Visits`
    #[reflect(skip)]
    pub(crate) visits: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y, visits: 0 }
    }
}

fn describe_point(builder: TypeBuilder<Point>) -> TypeBuilder<Point> {
    builder
        .readonly_property("Visits", int32(), |p: &mut Point| {
            p.visits += 1;
            Ok(Value::I32(p.visits))
        })
        .method(MethodInfo::instance(
            "Offset",
            vec![ParameterInfo::new("dx", int32()), ParameterInfo::new("dy", int32())],
            TypeHandle::void(),
            |p: &mut Point, args: &mut [Value]| {
                p.x += arg::<i32>(args, 0)?;
                p.y += arg::<i32>(args, 1)?;
                Ok(Value::Null)
            },
        ))
}

static POPULATION: AtomicI32 = AtomicI32::new(0);

/// Interface implemented by [`Person`] and, through it, [`Employee`].
pub struct Greeter;

impl crate::meta::Reflect for Greeter {
    fn describe() -> TypeBuilder<Self> {
        TypeBuilder::interface("IGreeter")
    }
}

#[derive(Debug, Default, Reflect)]
#[reflect(
    class,
    name = "Person",
    extend = "describe_person",
    implements = "Greeter",
    attr = "Serializable"
)]
pub struct Person {
    #[reflect(skip)]
    pub(crate) name: String,

    #[reflect(name = "Age", attr = "Indexed")]
    pub(crate) age: i32,

    #[reflect(private, attr = "Sensitive")]
    pub(crate) secret: String,

    #[reflect(name = "Id", readonly)]
    pub(crate) id: i32,

    #[reflect(skip)]
    pub(crate) nickname: String,
}

impl Person {
    pub fn new(name: &str, age: i32) -> Self {
        Self {
            name: name.to_string(),
            age,
            ..Self::default()
        }
    }

    fn summary(&self) -> String {
        format!("{} ({})", self.name, self.age)
    }
}

fn describe_person(builder: TypeBuilder<Person>) -> TypeBuilder<Person> {
    let person = TypeHandle::of::<Person>();
    builder
        .member_attribute("Name", Attribute::new("Column", Value::str("full_name")))
        .member_attribute("AddYears", Attribute::marker("Mutator"))
        .field(
            FieldInfo::readonly("<Nickname>k__BackingField", string(), |p: &Person| {
                Value::str(&p.nickname)
            })
            .non_public(),
        )
        .field(FieldInfo::static_field(
            "Population",
            int32(),
            || Value::I32(POPULATION.load(Ordering::Relaxed)),
            |value| {
                POPULATION.store(value.to()?, Ordering::Relaxed);
                Ok(())
            },
        ))
        .property(
            "Name",
            string(),
            |p: &mut Person| Ok(Value::str(&p.name)),
            |p: &mut Person, value| {
                p.name = value.to()?;
                Ok(())
            },
        )
        // Accessor pair without a property descriptor; the setter is malformed.
        .method(MethodInfo::instance(
            "get_Nickname",
            Vec::new(),
            string(),
            |p: &mut Person, _args: &mut [Value]| Ok(Value::str(&p.nickname)),
        ))
        .method(MethodInfo::instance(
            "set_Nickname",
            Vec::new(),
            TypeHandle::void(),
            |_p: &mut Person, _args: &mut [Value]| Ok(Value::Null),
        ))
        .method(MethodInfo::instance(
            "AddYears",
            vec![ParameterInfo::new("years", int32())],
            int32(),
            |p: &mut Person, args: &mut [Value]| {
                p.age += arg::<i32>(args, 0)?;
                Ok(Value::I32(p.age))
            },
        ))
        .method(MethodInfo::instance_ref(
            "Greet",
            vec![ParameterInfo::new("other", person)],
            string(),
            |p: &Person, args: &mut [Value]| {
                let other = other_person(args)?.try_with(|other: &Person| other.name.clone())?;
                Ok(Value::from(format!("Hello {other}, I am {}", p.name)))
            },
        ))
        .method(MethodInfo::instance(
            "CopyFrom",
            vec![ParameterInfo::new("other", person)],
            TypeHandle::void(),
            |p: &mut Person, args: &mut [Value]| {
                let (name, age) =
                    other_person(args)?.try_with(|other: &Person| (other.name.clone(), other.age))?;
                p.name = name;
                p.age = age;
                Ok(Value::Null)
            },
        ))
        .method(
            MethodInfo::instance_ref(
                "Describe",
                Vec::new(),
                string(),
                |p: &Person, _args: &mut [Value]| Ok(Value::from(p.summary())),
            )
            .as_virtual(),
        )
        .method(MethodInfo::static_fn(
            "Create",
            vec![ParameterInfo::new("name", string())],
            person,
            |args| {
                let name: String = arg(args, 0)?;
                Ok(Value::new_object(Person::new(&name, 0)))
            },
        ))
        .method(MethodInfo::static_fn(
            "Swap",
            vec![ParameterInfo::by_ref("a", int32()), ParameterInfo::by_ref("b", int32())],
            TypeHandle::void(),
            |args| {
                if args.len() == 2 {
                    args.swap(0, 1);
                }
                Ok(Value::Null)
            },
        ))
        .method(MethodInfo::static_fn(
            "TryHalve",
            vec![ParameterInfo::new("value", int32()), ParameterInfo::out("half", int32())],
            TypeHandle::of::<bool>(),
            |args| {
                let value: i32 = arg(args, 0)?;
                let even = value % 2 == 0;
                if let Some(half) = args.get_mut(1) {
                    *half = Value::I32(if even { value / 2 } else { 0 });
                }
                Ok(Value::Bool(even))
            },
        ))
        .method(generic_method(
            "Default",
            1,
            Vec::new(),
            TypeHandle::object(),
            true,
            |inv| {
                let ty = inv.type_args.first().copied().ok_or_else(|| {
                    InvokeError::InvalidArgument("missing type argument".to_string())
                })?;
                Ok(registry().zero_value(ty))
            },
        ))
        .constructor(
            vec![ParameterInfo::new("name", string()), ParameterInfo::new("age", int32())],
            |args| {
                let name: String = arg(args, 0)?;
                Ok(Person::new(&name, arg(args, 1)?))
            },
        )
        .constructor_attribute(Attribute::marker("Preferred"))
        .constructor(vec![ParameterInfo::by_ref("seed", int32())], |args| {
            let seed: i32 = arg(args, 0)?;
            args[0] = Value::I32(seed + 1);
            Ok(Person {
                age: seed,
                ..Person::default()
            })
        })
        .constructor(Vec::new(), |_| Ok(Person::default()))
        .non_public_constructor()
}

#[derive(Debug, Reflect)]
#[reflect(class, name = "Employee", extend = "describe_employee", attr = "Audited")]
pub struct Employee {
    #[reflect(base)]
    pub(crate) person: Person,

    #[reflect(name = "Company")]
    pub(crate) company: String,
}

impl Employee {
    pub fn new(name: &str, age: i32, company: &str) -> Self {
        Self {
            person: Person::new(name, age),
            company: company.to_string(),
        }
    }
}

fn other_person(args: &[Value]) -> InvokeResult<&ObjectRef> {
    args.first()
        .and_then(Value::as_object)
        .ok_or_else(|| InvokeError::NullReference("no other person".to_string()))
}

fn describe_employee(builder: TypeBuilder<Employee>) -> TypeBuilder<Employee> {
    builder.method(
        MethodInfo::instance(
            "Describe",
            Vec::new(),
            string(),
            |e: &mut Employee, _args: &mut [Value]| {
                Ok(Value::from(format!("{} at {}", e.person.summary(), e.company)))
            },
        )
        .as_virtual(),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
#[reflect(name = "Color")]
pub enum Color {
    #[reflect(attr = "Primary")]
    Red,
    Green,
    Blue,
}

#[derive(Debug, Default, Reflect)]
#[reflect(class, name = "Bag", extend = "describe_bag")]
pub struct Bag {
    #[reflect(skip)]
    pub(crate) items: Vec<String>,
}

impl Bag {
    pub fn with_items(items: &[&str]) -> Self {
        Self {
            items: items.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn slot(&mut self, args: &[Value]) -> InvokeResult<&mut String> {
        let index: i32 = arg(args, 0)?;
        let len = self.items.len();
        usize::try_from(index)
            .ok()
            .and_then(|i| self.items.get_mut(i))
            .ok_or(InvokeError::IndexOutOfRange {
                index: index.max(0) as usize,
                len,
            })
    }
}

fn describe_bag(builder: TypeBuilder<Bag>) -> TypeBuilder<Bag> {
    builder.indexer(
        vec![ParameterInfo::new("index", int32())],
        string(),
        |bag: &mut Bag, args: &mut [Value]| Ok(Value::str(bag.slot(args)?)),
        |bag: &mut Bag, args: &mut [Value]| {
            let value: String = arg(args, 1)?;
            *bag.slot(args)? = value;
            Ok(())
        },
    )
}

#[derive(Debug, Reflect)]
#[reflect(class, name = "PersonRecord")]
pub struct PersonRecord {
    #[reflect(name = "Name")]
    pub(crate) name: String,

    #[reflect(name = "Age")]
    pub(crate) age: i32,
}

impl PersonRecord {
    pub fn new(name: &str, age: i32) -> Self {
        Self {
            name: name.to_string(),
            age,
        }
    }
}

#[derive(Debug, Default, Reflect)]
#[reflect(class, name = "PersonView", extend = "describe_person_view")]
pub struct PersonView {
    #[reflect(skip)]
    pub(crate) name: String,

    #[reflect(name = "Age")]
    pub(crate) age: i32,
}

fn describe_person_view(builder: TypeBuilder<PersonView>) -> TypeBuilder<PersonView> {
    builder.property(
        "Name",
        string(),
        |v: &mut PersonView| Ok(Value::str(&v.name)),
        |v: &mut PersonView, value| {
            v.name = value.to()?;
            Ok(())
        },
    )
}

#[derive(Debug, Reflect)]
#[reflect(class, name = "Badge")]
pub struct Badge {
    pub(crate) name: String,
}

impl Badge {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// Two fields that differ only by case.
#[derive(Debug, Reflect)]
#[reflect(class, name = "DuplicateNames")]
pub struct DuplicateNames {
    pub(crate) name: String,

    #[reflect(name = "Name")]
    pub(crate) display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::TypeKind;

    #[test]
    fn test_derived_type_shapes() {
        let point = TypeHandle::of::<Point>().info();
        assert_eq!(point.kind(), TypeKind::Struct);
        assert_eq!(point.fields().len(), 2);

        let employee = TypeHandle::of::<Employee>().info();
        assert_eq!(employee.kind(), TypeKind::Class);
        assert_eq!(employee.base(), Some(TypeHandle::of::<Person>()));

        let color = TypeHandle::of::<Color>().info();
        assert!(color.fields().iter().all(|f| f.is_literal()));
        assert_eq!(color.fields().len(), 3);
    }

    #[test]
    fn test_override_takes_base_slot() {
        let person = TypeHandle::of::<Person>().info();
        let employee = TypeHandle::of::<Employee>().info();
        let base_slot = person.methods().iter().find(|m| m.name == "Describe").and_then(|m| m.slot);
        let derived_slot =
            employee.methods().iter().find(|m| m.name == "Describe").and_then(|m| m.slot);
        assert!(base_slot.is_some());
        assert_eq!(base_slot, derived_slot);
    }

    #[test]
    fn test_enum_conversions() {
        let green: Value = Color::Green.into();
        assert_eq!(green.to::<Color>().unwrap(), Color::Green);
        assert!(Value::I32(1).to::<Color>().is_err());
    }
}
