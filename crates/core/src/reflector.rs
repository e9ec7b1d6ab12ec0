//! Accessor requests
//!
//! A [`Reflector`] owns the resolver and the two accessor caches. Every
//! request builds a fresh [`Signature`], looks it up and compiles on a miss:
//!
//! ```text
//! field_getter(ty, "Age")
//!        │
//!        ▼
//! Signature ──► AccessorCache ──hit──► Arc<MemberGetter>
//!                     │
//!                    miss
//!                     ▼
//!        GetterCompiler::compile(&mut working copy)
//!                     │
//!                     ▼
//!             publish (insert-if-absent)
//! ```

use std::fmt;
use std::sync::{Arc, LazyLock};

use tracing::{debug, warn};

use crate::accessor::{
    ArrayElementGetter, ArrayElementSetter, ConstructorInvoker, MemberGetter, MemberSetter,
    MethodInvoker, ObjectMapper,
};
use crate::cache::{AccessorCache, CacheStats, CacheStrategy};
use crate::compiler::{
    AccessorCompiler, ArrayGetterCompiler, ArraySetterCompiler, ConstructorCompiler,
    GetterCompiler, InvokerCompiler, MapperCompiler, SetterCompiler,
};
use crate::config::{engine_config_path, CacheConfig, ConfigError, ConfigResult, EngineConfig};
use crate::error::{ReflectError, ReflectResult};
use crate::flags::{Flags, MemberKinds};
use crate::meta::{set_lock_timeout, TypeHandle};
use crate::resolver::MemberResolver;
use crate::signature::{Direction, MapSignature, Signature};

static GLOBAL: LazyLock<Reflector> = LazyLock::new(Reflector::from_environment);

/// Process-wide reflector.
///
/// Configured from the engine config file when one exists, otherwise with
/// defaults.
pub fn global() -> &'static Reflector {
    &GLOBAL
}

/// Compiles and caches accessors.
pub struct Reflector {
    resolver: MemberResolver,
    members: AccessorCache<Signature>,
    mappers: AccessorCache<MapSignature>,
    default_flags: Flags,
}

impl Reflector {
    pub fn new() -> Self {
        Self::with_strategy(CacheStrategy::default())
    }

    pub fn with_strategy(strategy: CacheStrategy) -> Self {
        Self::with_cache_config(&CacheConfig {
            strategy,
            soft_limit: None,
        })
    }

    pub fn with_cache_config(cache: &CacheConfig) -> Self {
        Self {
            resolver: MemberResolver::new(),
            members: AccessorCache::with_soft_limit(cache.strategy, cache.soft_limit),
            mappers: AccessorCache::with_soft_limit(cache.strategy, cache.soft_limit),
            default_flags: Flags::DEFAULT,
        }
    }

    pub fn with_config(config: &EngineConfig) -> ConfigResult<Self> {
        let mut reflector = Self::with_cache_config(&config.cache);
        reflector.default_flags = config.flags()?;
        // Object locks are process-wide, so only an explicit setting changes them.
        if let Some(limit) = config.lock_timeout() {
            set_lock_timeout(Some(limit));
        }
        debug!(
            "Reflector configured with {:?} cache and flags {}",
            config.cache.strategy, reflector.default_flags
        );
        Ok(reflector)
    }

    fn from_environment() -> Self {
        let path = engine_config_path();
        if !path.exists() {
            return Self::new();
        }
        let loaded = std::fs::read_to_string(&path)
            .map_err(ConfigError::from)
            .and_then(|content| EngineConfig::from_toml_str(&content))
            .and_then(|config| Self::with_config(&config));
        match loaded {
            Ok(reflector) => reflector,
            Err(e) => {
                warn!("Ignoring engine config at {:?}: {}", path, e);
                Self::new()
            }
        }
    }

    /// Flags of method, constructor and mapping requests without explicit flags.
    pub fn default_flags(&self) -> Flags {
        self.default_flags
    }

    /// Member requests also see static members.
    fn member_flags(&self) -> Flags {
        self.default_flags | Flags::STATIC
    }

    fn static_flags(&self) -> Flags {
        (self.default_flags - Flags::INSTANCE) | Flags::STATIC
    }

    /// Runs `compiler` for `key` through the member cache.
    pub(crate) fn compile<C>(&self, compiler: &C, key: &Signature) -> ReflectResult<Arc<C::Output>>
    where
        C: AccessorCompiler<Key = Signature>,
    {
        self.members
            .get_or_compile(key, |working| compiler.compile(working, &self.resolver))
    }

    // === Fields and properties ===

    pub fn field_getter(&self, ty: TypeHandle, name: &str) -> ReflectResult<Arc<MemberGetter>> {
        self.field_getter_with(ty, name, self.member_flags())
    }

    pub fn field_getter_with(
        &self,
        ty: TypeHandle,
        name: &str,
        flags: Flags,
    ) -> ReflectResult<Arc<MemberGetter>> {
        self.compile(&GetterCompiler, &Signature::field(ty, name, Direction::Read, flags))
    }

    pub fn field_setter(&self, ty: TypeHandle, name: &str) -> ReflectResult<Arc<MemberSetter>> {
        self.field_setter_with(ty, name, self.member_flags())
    }

    pub fn field_setter_with(
        &self,
        ty: TypeHandle,
        name: &str,
        flags: Flags,
    ) -> ReflectResult<Arc<MemberSetter>> {
        self.compile(&SetterCompiler, &Signature::field(ty, name, Direction::Write, flags))
    }

    pub fn property_getter(&self, ty: TypeHandle, name: &str) -> ReflectResult<Arc<MemberGetter>> {
        self.property_getter_with(ty, name, self.member_flags())
    }

    pub fn property_getter_with(
        &self,
        ty: TypeHandle,
        name: &str,
        flags: Flags,
    ) -> ReflectResult<Arc<MemberGetter>> {
        self.compile(&GetterCompiler, &Signature::property(ty, name, Direction::Read, flags))
    }

    pub fn property_setter(&self, ty: TypeHandle, name: &str) -> ReflectResult<Arc<MemberSetter>> {
        self.property_setter_with(ty, name, self.member_flags())
    }

    pub fn property_setter_with(
        &self,
        ty: TypeHandle,
        name: &str,
        flags: Flags,
    ) -> ReflectResult<Arc<MemberSetter>> {
        self.compile(&SetterCompiler, &Signature::property(ty, name, Direction::Write, flags))
    }

    /// Getter for a field named `name`, or else a property.
    pub fn member_getter(&self, ty: TypeHandle, name: &str) -> ReflectResult<Arc<MemberGetter>> {
        match self.field_getter(ty, name) {
            Err(ReflectError::MemberNotFound { .. }) => self.property_getter(ty, name),
            other => other,
        }
    }

    /// Setter for a field named `name`, or else a property.
    pub fn member_setter(&self, ty: TypeHandle, name: &str) -> ReflectResult<Arc<MemberSetter>> {
        match self.field_setter(ty, name) {
            Err(ReflectError::MemberNotFound { .. }) => self.property_setter(ty, name),
            other => other,
        }
    }

    // === Methods and constructors ===

    pub fn method(
        &self,
        ty: TypeHandle,
        name: &str,
        params: &[TypeHandle],
    ) -> ReflectResult<Arc<MethodInvoker>> {
        self.method_with(ty, name, params, self.default_flags)
    }

    pub fn method_with(
        &self,
        ty: TypeHandle,
        name: &str,
        params: &[TypeHandle],
        flags: Flags,
    ) -> ReflectResult<Arc<MethodInvoker>> {
        self.compile(&InvokerCompiler, &Signature::method(ty, name, params, flags))
    }

    pub fn static_method(
        &self,
        ty: TypeHandle,
        name: &str,
        params: &[TypeHandle],
    ) -> ReflectResult<Arc<MethodInvoker>> {
        self.method_with(ty, name, params, self.static_flags())
    }

    /// Invoker for a generic method instantiated with `type_args`.
    pub fn generic_method(
        &self,
        ty: TypeHandle,
        name: &str,
        params: &[TypeHandle],
        type_args: &[TypeHandle],
        flags: Flags,
    ) -> ReflectResult<Arc<MethodInvoker>> {
        let key = Signature::method(ty, name, params, flags).with_generic_types(type_args);
        self.compile(&InvokerCompiler, &key)
    }

    pub fn constructor(
        &self,
        ty: TypeHandle,
        params: &[TypeHandle],
    ) -> ReflectResult<Arc<ConstructorInvoker>> {
        self.constructor_with(ty, params, self.default_flags)
    }

    pub fn constructor_with(
        &self,
        ty: TypeHandle,
        params: &[TypeHandle],
        flags: Flags,
    ) -> ReflectResult<Arc<ConstructorInvoker>> {
        self.compile(&ConstructorCompiler, &Signature::constructor(ty, params, flags))
    }

    // === Arrays and indexers ===

    pub fn array_getter(&self, array_ty: TypeHandle) -> ReflectResult<Arc<ArrayElementGetter>> {
        self.compile(&ArrayGetterCompiler, &Signature::array_element(array_ty, Direction::Read))
    }

    pub fn array_setter(&self, array_ty: TypeHandle) -> ReflectResult<Arc<ArrayElementSetter>> {
        self.compile(&ArraySetterCompiler, &Signature::array_element(array_ty, Direction::Write))
    }

    /// Invoker for `get_Item` taking `index_types`.
    pub fn indexer_getter(
        &self,
        ty: TypeHandle,
        index_types: &[TypeHandle],
    ) -> ReflectResult<Arc<MethodInvoker>> {
        self.method(ty, "get_Item", index_types)
    }

    /// Invoker for `set_Item` taking `index_types` followed by `value_ty`.
    pub fn indexer_setter(
        &self,
        ty: TypeHandle,
        index_types: &[TypeHandle],
        value_ty: TypeHandle,
    ) -> ReflectResult<Arc<MethodInvoker>> {
        let mut params = index_types.to_vec();
        params.push(value_ty);
        self.method(ty, "set_Item", &params)
    }

    // === Mapping ===

    /// Mapper copying every field and property of `source` with a same-named
    /// writable counterpart on `target`.
    pub fn mapper(&self, source: TypeHandle, target: TypeHandle) -> ReflectResult<Arc<ObjectMapper>> {
        self.mapper_with(source, target, MemberKinds::ALL, MemberKinds::ALL, &[], self.default_flags)
    }

    pub fn mapper_with(
        &self,
        source: TypeHandle,
        target: TypeHandle,
        source_kinds: MemberKinds,
        target_kinds: MemberKinds,
        names: &[&str],
        flags: Flags,
    ) -> ReflectResult<Arc<ObjectMapper>> {
        let key = MapSignature::new(source, target, source_kinds, target_kinds, names, flags);
        self.mappers
            .get_or_compile(&key, |working| MapperCompiler.compile(working, &self.resolver))
    }

    // === Bookkeeping ===

    pub fn resolver(&self) -> &MemberResolver {
        &self.resolver
    }

    /// Counters of the member accessor cache.
    pub fn stats(&self) -> CacheStats {
        self.members.stats()
    }

    pub fn mapper_stats(&self) -> CacheStats {
        self.mappers.stats()
    }

    /// Live accessors in both caches.
    pub fn len(&self) -> usize {
        self.members.len() + self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reclaims cached accessors no caller holds; see [`AccessorCache::purge`].
    pub fn purge(&self) -> usize {
        self.members.purge() + self.mappers.purge()
    }

    /// Drops every cached accessor. Accessors already handed out stay valid.
    pub fn clear(&self) {
        self.members.clear();
        self.mappers.clear();
    }
}

impl Default for Reflector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Reflector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reflector")
            .field("default_flags", &self.default_flags)
            .field("members", &self.members)
            .field("mappers", &self.mappers)
            .field("resolutions", &self.resolver.resolutions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Bag, Color, Employee, Person, PersonRecord, PersonView, Point};
    use crate::meta::{registry, ArrayRef, InvokeError, Value, ValueCell};

    #[test]
    fn test_equal_requests_share_one_accessor() {
        let reflector = Reflector::new();
        let person = TypeHandle::of::<Person>();
        let first = reflector.field_getter(person, "Age").unwrap();
        let second = reflector.field_getter(person, "Age").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reflector.resolver().resolutions(), 1);

        let stats = reflector.stats();
        assert_eq!((stats.hits, stats.misses, stats.compilations), (1, 1, 1));
    }

    #[test]
    fn test_distinct_identity_distinct_accessors() {
        let reflector = Reflector::new();
        let person = TypeHandle::of::<Person>();
        let a = reflector.field_getter(person, "Age").unwrap();
        let b = reflector
            .field_getter_with(person, "Age", Flags::INSTANCE_PUBLIC)
            .unwrap();
        let c = reflector.field_getter(TypeHandle::of::<Employee>(), "Age").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(reflector.resolver().resolutions(), 3);
    }

    #[test]
    fn test_reference_round_trip() {
        let reflector = Reflector::new();
        let person = TypeHandle::of::<Person>();
        let target = Value::new_object(Person::new("Ada", 36));

        reflector.member_setter(person, "Name").unwrap().set(&target, "Grace").unwrap();
        let name = reflector.member_getter(person, "Name").unwrap().get(&target).unwrap();
        assert_eq!(name, Value::str("Grace"));

        let employee = Value::new_object(Employee::new("Linus", 20, "Transmeta"));
        reflector.field_setter(person, "Age").unwrap().set(&employee, 21).unwrap();
        let age = reflector
            .field_getter(TypeHandle::of::<Employee>(), "Age")
            .unwrap()
            .get(&employee)
            .unwrap();
        assert_eq!(age, Value::I32(21));
    }

    #[test]
    fn test_value_cell_members() {
        let reflector = Reflector::new();
        let point = TypeHandle::of::<Point>();
        let cell = Value::Cell(ValueCell::wrap(Point::new(1, 2)));

        reflector.field_setter(point, "X").unwrap().set(&cell, 5).unwrap();
        assert_eq!(reflector.field_getter(point, "X").unwrap().get(&cell).unwrap(), Value::I32(5));
        assert_eq!(reflector.field_getter(point, "Y").unwrap().get(&cell).unwrap(), Value::I32(2));
    }

    #[test]
    fn test_static_enum_field() {
        let reflector = Reflector::new();
        let green = reflector
            .field_getter(TypeHandle::of::<Color>(), "Green")
            .unwrap()
            .get_static()
            .unwrap();
        assert_eq!(green.as_i64(), Some(Color::Green as i64));
    }

    #[test]
    fn test_methods_and_constructors() {
        let reflector = Reflector::new();
        let person = TypeHandle::of::<Person>();
        let string = TypeHandle::of::<String>();
        let int32 = TypeHandle::of::<i32>();

        let create = reflector.static_method(person, "Create", &[string]).unwrap();
        let created = create.invoke_static(&mut [Value::str("Ada")]).unwrap();
        let describe = reflector.method(person, "Describe", &[]).unwrap();
        assert_eq!(describe.invoke(&created, &mut []).unwrap(), Value::str("Ada (0)"));

        let ctor = reflector.constructor(person, &[string, int32]).unwrap();
        let built = ctor.create(&mut [Value::str("Grace"), Value::I32(45)]).unwrap();
        assert_eq!(describe.invoke(&built, &mut []).unwrap(), Value::str("Grace (45)"));

        let zero = reflector.constructor(TypeHandle::of::<Point>(), &[]).unwrap();
        assert_eq!(zero.create(&mut []).unwrap().to::<Point>().unwrap(), Point::default());

        let default = reflector
            .generic_method(person, "Default", &[], &[string], Flags::STATIC_ANY_VISIBILITY)
            .unwrap();
        assert_eq!(default.invoke_static(&mut []).unwrap(), Value::Null);
    }

    #[test]
    fn test_arrays_and_indexers() {
        let reflector = Reflector::new();
        let string = TypeHandle::of::<String>();
        let array_ty = registry().array_of(string);
        let array = Value::Array(ArrayRef::zeroed(string, 2));
        reflector.array_setter(array_ty).unwrap().set(&array, 1, "b").unwrap();
        assert_eq!(reflector.array_getter(array_ty).unwrap().get(&array, 1).unwrap(), Value::str("b"));

        let bag = TypeHandle::of::<Bag>();
        let int32 = TypeHandle::of::<i32>();
        let target = Value::new_object(Bag::with_items(&["x", "y"]));
        let set = reflector.indexer_setter(bag, &[int32], string).unwrap();
        set.invoke(&target, &mut [Value::I32(0), Value::str("z")]).unwrap();
        let get = reflector.indexer_getter(bag, &[int32]).unwrap();
        assert_eq!(get.invoke(&target, &mut [Value::I32(0)]).unwrap(), Value::str("z"));
        assert!(matches!(
            get.invoke(&target, &mut [Value::I32(5)]),
            Err(InvokeError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_mapper_is_cached() {
        let reflector = Reflector::new();
        let record = TypeHandle::of::<PersonRecord>();
        let view = TypeHandle::of::<PersonView>();
        let first = reflector.mapper(record, view).unwrap();
        let second = reflector.mapper(record, view).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reflector.mapper_stats().compilations, 1);
    }

    #[test]
    fn test_unheld_accessor_is_still_a_hit() {
        let reflector = Reflector::new();
        let person = TypeHandle::of::<Person>();
        let target = Value::new_object(Person::new("Ada", 36));
        for _ in 0..3 {
            let age = reflector.field_getter(person, "Age").unwrap().get(&target).unwrap();
            assert_eq!(age, Value::I32(36));
        }
        assert_eq!(reflector.resolver().resolutions(), 1);
        let stats = reflector.stats();
        assert_eq!((stats.hits, stats.compilations), (2, 1));
    }

    #[test]
    fn test_temporary_and_permanent_strategies() {
        let person = TypeHandle::of::<Person>();

        let temporary = Reflector::new();
        let held = temporary.field_getter(person, "Age").unwrap();
        drop(temporary.field_getter(person, "Id").unwrap());
        assert_eq!(temporary.len(), 2);
        assert_eq!(temporary.purge(), 1);
        assert!(Arc::ptr_eq(&held, &temporary.field_getter(person, "Age").unwrap()));

        let config = EngineConfig {
            cache: CacheConfig {
                strategy: CacheStrategy::Permanent,
                soft_limit: Some(0),
            },
            ..EngineConfig::default()
        };
        let permanent = Reflector::with_config(&config).unwrap();
        drop(permanent.field_getter(person, "Age").unwrap());
        assert_eq!(permanent.purge(), 0);
        assert_eq!(permanent.len(), 1);
        permanent.clear();
        assert!(permanent.is_empty());
    }

    #[test]
    fn test_configured_default_flags() {
        let config = EngineConfig {
            default_flags: vec!["INSTANCE_PUBLIC".to_string()],
            ..EngineConfig::default()
        };
        let reflector = Reflector::with_config(&config).unwrap();
        assert_eq!(reflector.default_flags(), Flags::INSTANCE_PUBLIC);
        let person = TypeHandle::of::<Person>();
        assert!(matches!(
            reflector.field_getter(person, "secret"),
            Err(ReflectError::MemberNotFound { .. })
        ));
    }

    #[test]
    fn test_global_is_shared() {
        assert!(std::ptr::eq(global(), global()));
    }
}
