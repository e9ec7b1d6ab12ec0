//! Identity of an object-mapping request

use std::hash::{Hash, Hasher};

use super::hash::{positional_str_sum, Fnv1a};
use super::Signature;
use crate::flags::{Flags, MemberKinds};
use crate::meta::TypeHandle;

/// A [`Signature`] for copying members from `source` to the signature's
/// target type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapSignature {
    base: Signature,
    source: TypeHandle,
    source_kinds: MemberKinds,
    target_kinds: MemberKinds,
    names: Vec<String>,
}

impl MapSignature {
    /// Mapping of `source_kinds` members of `source` onto `target_kinds`
    /// members of `target`. An empty `names` list maps every match.
    pub fn new(
        source: TypeHandle,
        target: TypeHandle,
        source_kinds: MemberKinds,
        target_kinds: MemberKinds,
        names: &[&str],
        flags: Flags,
    ) -> Self {
        Self {
            base: Signature::mapping(target, flags),
            source,
            source_kinds,
            target_kinds,
            names: names.iter().map(|name| name.to_string()).collect(),
        }
    }

    pub fn source(&self) -> TypeHandle {
        self.source
    }

    pub fn target(&self) -> TypeHandle {
        self.base.target()
    }

    pub fn flags(&self) -> Flags {
        self.base.flags()
    }

    pub fn source_kinds(&self) -> MemberKinds {
        self.source_kinds
    }

    pub fn target_kinds(&self) -> MemberKinds {
        self.target_kinds
    }

    /// Member-name allow-list, in request order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Names compare case-insensitively when asked to, or when fields are
    /// mapped onto properties (or the reverse).
    pub fn ignores_case(&self) -> bool {
        self.flags().contains(Flags::IGNORE_CASE) || self.source_kinds != self.target_kinds
    }

    pub fn discriminator(&self) -> u64 {
        let extra = Fnv1a::new()
            .handle(self.source)
            .bytes(&[self.source_kinds.bits(), self.target_kinds.bits()])
            .finish();
        self.base.discriminator() ^ extra ^ positional_str_sum(&self.names).rotate_left(16)
    }
}

// Equal signatures share a discriminator.
impl Hash for MapSignature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.discriminator());
    }
}
