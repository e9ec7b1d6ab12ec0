//! FNV-1a hashing for signature discrimination
//!
//! Hashes only discriminate; equality of the identity fields decides every
//! cache hit.

use crate::meta::TypeHandle;

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001B3;

/// FNV-1a 64-bit hash (compile-time capable)
pub const fn fnv1a_64(data: &[u8]) -> u64 {
    fnv1a_extend(FNV_OFFSET_BASIS, data)
}

/// Continues an FNV-1a hash over more bytes
pub const fn fnv1a_extend(mut hash: u64, data: &[u8]) -> u64 {
    let mut i = 0;
    while i < data.len() {
        hash ^= data[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Incremental FNV-1a over heterogeneous parts
#[derive(Debug, Clone, Copy)]
pub struct Fnv1a(u64);

impl Fnv1a {
    pub const fn new() -> Self {
        Self(FNV_OFFSET_BASIS)
    }

    pub fn bytes(self, data: &[u8]) -> Self {
        Self(fnv1a_extend(self.0, data))
    }

    pub fn u64(self, value: u64) -> Self {
        self.bytes(&value.to_le_bytes())
    }

    pub fn handle(self, ty: TypeHandle) -> Self {
        self.u64(ty.to_bits())
    }

    /// Hashes an optional string; absent and empty stay distinct.
    pub fn str(self, value: Option<&str>) -> Self {
        match value {
            Some(s) => self.bytes(&[1]).bytes(s.as_bytes()),
            None => self.bytes(&[0]),
        }
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for Fnv1a {
    fn default() -> Self {
        Self::new()
    }
}

/// Sum of element hashes weighted by 1-based position.
///
/// Swapping two different types changes the sum, so `(A, B)` and `(B, A)`
/// hash apart.
pub fn positional_sum(types: &[TypeHandle]) -> u64 {
    types
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, ty)| {
            let weight = i as u64 + 1;
            acc.wrapping_add(fnv1a_64(&ty.to_bits().to_le_bytes()).wrapping_mul(weight))
        })
}

/// Positional sum over strings, used for mapper allow-lists.
pub fn positional_str_sum(names: &[String]) -> u64 {
    names.iter().enumerate().fold(0u64, |acc, (i, name)| {
        acc.wrapping_add(fnv1a_64(name.as_bytes()).wrapping_mul(i as u64 + 1))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_64_vectors() {
        assert_eq!(fnv1a_64(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a_64(b"a"), 0xaf63dc4c8601ec8c);
        assert_eq!(fnv1a_64(b"foobar"), 0x85944171f73967e8);
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let whole = fnv1a_64(b"foobar");
        let parts = Fnv1a::new().bytes(b"foo").bytes(b"bar").finish();
        assert_eq!(whole, parts);
    }

    #[test]
    fn test_absent_and_empty_names_differ() {
        assert_ne!(Fnv1a::new().str(None).finish(), Fnv1a::new().str(Some("")).finish());
    }

    #[test]
    fn test_positional_sum_is_order_sensitive() {
        let a = TypeHandle::of::<i32>();
        let b = TypeHandle::of::<String>();
        assert_ne!(positional_sum(&[a, b]), positional_sum(&[b, a]));
        assert_eq!(positional_sum(&[]), 0);
    }

    #[test]
    fn test_const_evaluation() {
        const HASH: u64 = fnv1a_64(b"test");
        assert!(HASH != 0);
    }
}
