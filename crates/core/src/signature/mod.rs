//! Signatures - identity keys for accessor compilation
//!
//! A [`Signature`] names the operation a caller wants compiled: the target
//! type, the member kind and direction, the member name, the binding flags
//! and the ordered parameter and generic type lists. Two signatures are equal
//! iff all of those identity fields are equal, in order.
//!
//! Resolution fills in derived fields (the resolved member and its actual
//! parameter types). Those never take part in equality or hashing, so a
//! resolved working copy still equals the request it came from.
//!
//! ```text
//! caller ──► Signature (identity) ──► cache lookup ──hit──► accessor
//!                                          │
//!                                         miss
//!                                          ▼
//!                 working copy ──► resolver ──► compiler ──► publish
//! ```

pub mod hash;
mod map;

use std::hash::{Hash, Hasher};

use crate::flags::Flags;
use crate::meta::TypeHandle;
use crate::resolver::MemberHandle;

pub use map::MapSignature;

use hash::{positional_sum, Fnv1a};

/// What kind of member a signature targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field,
    Property,
    Method,
    Constructor,
    ArrayElement,
    Mapping,
}

impl MemberKind {
    fn tag(self) -> u8 {
        match self {
            MemberKind::Field => 1,
            MemberKind::Property => 2,
            MemberKind::Method => 3,
            MemberKind::Constructor => 4,
            MemberKind::ArrayElement => 5,
            MemberKind::Mapping => 6,
        }
    }
}

/// Data direction of a member access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Read,
    Write,
}

/// Identity of a compilation request, plus derived resolution results.
#[derive(Debug, Clone)]
pub struct Signature {
    target: TypeHandle,
    flags: Flags,
    kind: MemberKind,
    direction: Direction,
    name: Option<String>,
    param_types: Vec<TypeHandle>,
    generic_types: Vec<TypeHandle>,

    resolved: Option<MemberHandle>,
    resolved_params: Vec<TypeHandle>,
    is_static: bool,
}

impl Signature {
    fn new(
        target: TypeHandle,
        kind: MemberKind,
        direction: Direction,
        name: Option<String>,
        flags: Flags,
    ) -> Self {
        Self {
            target,
            flags,
            kind,
            direction,
            name,
            param_types: Vec::new(),
            generic_types: Vec::new(),
            resolved: None,
            resolved_params: Vec::new(),
            is_static: flags.contains(Flags::STATIC) && !flags.contains(Flags::INSTANCE),
        }
    }

    pub fn field(target: TypeHandle, name: impl Into<String>, direction: Direction, flags: Flags) -> Self {
        Self::new(target, MemberKind::Field, direction, Some(name.into()), flags)
    }

    pub fn property(
        target: TypeHandle,
        name: impl Into<String>,
        direction: Direction,
        flags: Flags,
    ) -> Self {
        Self::new(target, MemberKind::Property, direction, Some(name.into()), flags)
    }

    pub fn method(
        target: TypeHandle,
        name: impl Into<String>,
        param_types: &[TypeHandle],
        flags: Flags,
    ) -> Self {
        Self::new(target, MemberKind::Method, Direction::Read, Some(name.into()), flags)
            .with_param_types(param_types)
    }

    pub fn constructor(target: TypeHandle, param_types: &[TypeHandle], flags: Flags) -> Self {
        Self::new(target, MemberKind::Constructor, Direction::Read, None, flags)
            .with_param_types(param_types)
    }

    /// Element access on array type `target`.
    pub fn array_element(target: TypeHandle, direction: Direction) -> Self {
        Self::new(
            target,
            MemberKind::ArrayElement,
            direction,
            None,
            Flags::INSTANCE_ANY_VISIBILITY,
        )
    }

    pub(crate) fn mapping(target: TypeHandle, flags: Flags) -> Self {
        Self::new(target, MemberKind::Mapping, Direction::Write, None, flags)
    }

    pub fn with_param_types(mut self, param_types: &[TypeHandle]) -> Self {
        self.param_types = param_types.to_vec();
        self
    }

    pub fn with_generic_types(mut self, generic_types: &[TypeHandle]) -> Self {
        self.generic_types = generic_types.to_vec();
        self
    }

    pub fn target(&self) -> TypeHandle {
        self.target
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Requested parameter types.
    pub fn param_types(&self) -> &[TypeHandle] {
        &self.param_types
    }

    pub fn generic_types(&self) -> &[TypeHandle] {
        &self.generic_types
    }

    /// Member found by resolution, if any.
    pub fn resolved(&self) -> Option<&MemberHandle> {
        self.resolved.as_ref()
    }

    /// The resolved member's actual parameter types.
    ///
    /// May differ from [`Signature::param_types`] when requested types were
    /// assignable but not identical.
    pub fn resolved_params(&self) -> &[TypeHandle] {
        &self.resolved_params
    }

    /// Static when the flags select only static members, refined to the
    /// resolved member once known.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub(crate) fn set_resolved(&mut self, member: MemberHandle, params: Vec<TypeHandle>, is_static: bool) {
        self.resolved = Some(member);
        self.resolved_params = params;
        self.is_static = is_static;
    }

    /// Discriminator hash of the identity fields.
    pub fn discriminator(&self) -> u64 {
        let head = Fnv1a::new()
            .handle(self.target)
            .bytes(&[self.kind.tag()])
            .str(self.name.as_deref())
            .u64(self.flags.bits())
            .bytes(&[matches!(self.direction, Direction::Write) as u8])
            .finish();
        head ^ positional_sum(&self.param_types)
            ^ positional_sum(&self.generic_types).rotate_left(32)
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
            && self.kind == other.kind
            && self.direction == other.direction
            && self.flags == other.flags
            && self.name == other.name
            && self.param_types == other.param_types
            && self.generic_types == other.generic_types
    }
}

impl Eq for Signature {}

impl Hash for Signature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.discriminator());
    }
}
