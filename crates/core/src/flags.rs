//! Binding flags and member-kind selectors

use std::fmt;

use bitflags::bitflags;

use crate::meta::Visibility;

bitflags! {
    /// Rules that select members during resolution
    ///
    /// The low bits follow the conventional binding-flag layout; the high bits
    /// are selectors of this library.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags: u64 {
        /// Compare member names case-insensitively
        const IGNORE_CASE = 1 << 0;
        /// Only members declared on the type itself, not inherited ones
        const DECLARED_ONLY = 1 << 1;
        /// Instance members
        const INSTANCE = 1 << 2;
        /// Static members
        const STATIC = 1 << 3;
        /// Public members
        const PUBLIC = 1 << 4;
        /// Non-public members
        const NON_PUBLIC = 1 << 5;
        /// Parameter types must match exactly, by-ref modifiers included
        const EXACT_BINDING = 1 << 16;
        /// A member matches when its name contains the requested name
        const PARTIAL_NAME_MATCH = 1 << 32;
        /// Skip backing fields and property accessor methods in queries
        const EXCLUDE_BACKING_MEMBERS = 1 << 35;

        const ANY_VISIBILITY = Self::PUBLIC.bits() | Self::NON_PUBLIC.bits();
        const INSTANCE_PUBLIC = Self::INSTANCE.bits() | Self::PUBLIC.bits();
        const INSTANCE_ANY_VISIBILITY = Self::INSTANCE.bits() | Self::ANY_VISIBILITY.bits();
        const STATIC_PUBLIC = Self::STATIC.bits() | Self::PUBLIC.bits();
        const STATIC_ANY_VISIBILITY = Self::STATIC.bits() | Self::ANY_VISIBILITY.bits();
        const STATIC_INSTANCE_ANY_VISIBILITY =
            Self::STATIC.bits() | Self::INSTANCE.bits() | Self::ANY_VISIBILITY.bits();
    }
}

/// Single-bit flags in display order
const FLAG_NAMES: &[(Flags, &str)] = &[
    (Flags::DECLARED_ONLY, "DeclaredOnly"),
    (Flags::EXACT_BINDING, "ExactBinding"),
    (Flags::EXCLUDE_BACKING_MEMBERS, "ExcludeBackingMembers"),
    (Flags::IGNORE_CASE, "IgnoreCase"),
    (Flags::INSTANCE, "Instance"),
    (Flags::NON_PUBLIC, "NonPublic"),
    (Flags::PARTIAL_NAME_MATCH, "PartialNameMatch"),
    (Flags::PUBLIC, "Public"),
    (Flags::STATIC, "Static"),
];

impl Flags {
    /// Default rule set for method, constructor and mapping requests.
    pub const DEFAULT: Flags = Flags::INSTANCE_ANY_VISIBILITY;

    /// Parses a flag by constant name (`"INSTANCE"`, `"STATIC_ANY_VISIBILITY"`, ...).
    pub fn parse_name(name: &str) -> Option<Flags> {
        Flags::from_name(name.trim())
    }

    /// Whether a member with the given visibility and staticness is selected.
    pub fn matches_binding(self, visibility: Visibility, is_static: bool) -> bool {
        let visible = match visibility {
            Visibility::Public => self.contains(Flags::PUBLIC),
            Visibility::NonPublic => self.contains(Flags::NON_PUBLIC),
        };
        let storage = if is_static {
            self.contains(Flags::STATIC)
        } else {
            self.contains(Flags::INSTANCE)
        };
        visible && storage
    }

    /// Whether `member` matches the requested `name` under these flags.
    pub fn matches_name(self, member: &str, name: &str) -> bool {
        let ignore_case = self.contains(Flags::IGNORE_CASE);
        if self.contains(Flags::PARTIAL_NAME_MATCH) {
            if ignore_case {
                member.to_lowercase().contains(&name.to_lowercase())
            } else {
                member.contains(name)
            }
        } else {
            names_equal(member, name, ignore_case)
        }
    }
}

/// Name equality, optionally ignoring case.
pub fn names_equal(a: &str, b: &str, ignore_case: bool) -> bool {
    if !ignore_case {
        return a == b;
    }
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    a.to_lowercase() == b.to_lowercase()
}

impl Default for Flags {
    fn default() -> Self {
        Flags::DEFAULT
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = FLAG_NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            f.write_str("None")
        } else {
            f.write_str(&names.join(" | "))
        }
    }
}

bitflags! {
    /// Member kinds considered by the object mapper
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemberKinds: u8 {
        const FIELD = 0x01;
        const PROPERTY = 0x02;

        const ALL = Self::FIELD.bits() | Self::PROPERTY.bits();
    }
}
