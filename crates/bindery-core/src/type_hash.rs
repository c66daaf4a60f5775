//! Deterministic hash-based identity for types and entry points.
//!
//! [`TypeHash`] is a 64-bit hash computed from a type's name, or from an entry
//! point's name and parameter types. Hashes are stable across runs and do not
//! depend on registration order, so a signature can name a type by hash before
//! the registry has seen it and validation happens at registration time.
//!
//! # Examples
//!
//! ```
//! use bindery_core::TypeHash;
//!
//! let int_hash = TypeHash::from_name("int32");
//! assert_eq!(int_hash, TypeHash::from_name("int32"));
//!
//! let f1 = TypeHash::from_function("incr", &[TypeHash::from_name("int32")]);
//! let f2 = TypeHash::from_function("incr", &[TypeHash::from_name("float64")]);
//! assert_ne!(f1, f2);
//! ```

use std::fmt;

use xxhash_rust::const_xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
///
/// Different entity kinds (types, functions, methods) mix in a distinct constant
/// so that equal names never collide across kinds.
pub mod hash_constants {
    /// Separator constant for chained components.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for free function hashes.
    pub const FUNCTION: u64 = 0x5ea77ffbcdf5f302;

    /// Domain marker for instance and static method hashes.
    pub const METHOD: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for constructor hashes.
    pub const CONSTRUCTOR: u64 = 0x9a7f3d5e2b8c4601;

    /// Parameter position mixing constants, so that parameter order matters.
    pub const PARAM_MARKERS: [u64; 16] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
        0x7c3e9f2a5b8d1403,
        0x5d8c7b4a3e9f2106,
        0x3f1e9d8c7b5a4203,
        0x1a2b3c4d5e6f7089,
        0x9f8e7d6c5b4a3210,
        0x2468ace013579bdf,
        0xfdb97531eca86420,
        0x123456789abcdef0,
    ];
}

/// A deterministic 64-bit hash identifying a type or an entry point.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a type name.
    #[inline]
    pub const fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Create a free function hash from its name and parameter type hashes.
    #[inline]
    pub fn from_function(name: &str, param_hashes: &[TypeHash]) -> Self {
        let seed = hash_constants::FUNCTION ^ xxh64(name.as_bytes(), 0);
        TypeHash(mix_params(seed, param_hashes))
    }

    /// Create a method hash from owner type, name, parameter hashes and constness.
    ///
    /// Static methods use the same domain; the owner keeps them apart from
    /// free functions of the same name.
    #[inline]
    pub fn from_method(
        owner: TypeHash,
        name: &str,
        param_hashes: &[TypeHash],
        is_const: bool,
    ) -> Self {
        let const_modifier = if is_const { 0x1 } else { 0x0 };
        let seed = hash_constants::METHOD ^ owner.0 ^ xxh64(name.as_bytes(), 0) ^ const_modifier;
        TypeHash(mix_params(seed, param_hashes))
    }

    /// Create a constructor hash from owner type and parameter hashes.
    #[inline]
    pub fn from_constructor(owner: TypeHash, param_hashes: &[TypeHash]) -> Self {
        TypeHash(mix_params(hash_constants::CONSTRUCTOR ^ owner.0, param_hashes))
    }

    /// Create a derived type hash (`vector<T>`, `array<T, N>`, callback signatures).
    ///
    /// Argument order matters.
    #[inline]
    pub fn from_template_instance(template: TypeHash, args: &[TypeHash]) -> Self {
        TypeHash(mix_params(template.0, args))
    }

    /// Check if this is an empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

fn mix_params(seed: u64, params: &[TypeHash]) -> u64 {
    let mut hash = seed;
    for (i, param) in params.iter().enumerate() {
        let marker = hash_constants::PARAM_MARKERS
            .get(i)
            .copied()
            .unwrap_or_else(|| hash_constants::PARAM_MARKERS[0].wrapping_add(i as u64));
        // wrapping_mul keeps the mix non-commutative
        hash = hash.wrapping_mul(hash_constants::SEP).wrapping_add(marker ^ param.0);
    }
    hash
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Hashes of the built-in primitive types.
pub mod primitives {
    use super::TypeHash;

    pub const VOID: TypeHash = TypeHash::from_name("void");
    pub const BOOL: TypeHash = TypeHash::from_name("bool");
    pub const INT8: TypeHash = TypeHash::from_name("int8");
    pub const INT16: TypeHash = TypeHash::from_name("int16");
    pub const INT32: TypeHash = TypeHash::from_name("int32");
    pub const INT64: TypeHash = TypeHash::from_name("int64");
    pub const UINT8: TypeHash = TypeHash::from_name("uint8");
    pub const UINT16: TypeHash = TypeHash::from_name("uint16");
    pub const UINT32: TypeHash = TypeHash::from_name("uint32");
    pub const UINT64: TypeHash = TypeHash::from_name("uint64");
    pub const FLOAT32: TypeHash = TypeHash::from_name("float32");
    pub const FLOAT64: TypeHash = TypeHash::from_name("float64");
    /// Owned string (`std::string`).
    pub const STRING: TypeHash = TypeHash::from_name("string");
    /// Nullable C string (`const char *`).
    pub const CSTRING: TypeHash = TypeHash::from_name("cstring");
    /// Byte span aliasing a dynamic-side buffer.
    pub const BUFFER: TypeHash = TypeHash::from_name("buffer");
}

/// Hashes of the derived type constructors.
pub mod templates {
    use super::TypeHash;

    /// Fixed-length array, instantiated with `[element, length]`.
    pub const ARRAY: TypeHash = TypeHash::from_name("array");
    /// Variable-length vector, instantiated with `[element]`.
    pub const VECTOR: TypeHash = TypeHash::from_name("vector");
    /// Callback signature, instantiated with `[return, params...]`.
    pub const CALLBACK: TypeHash = TypeHash::from_name("callback");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_hash_determinism() {
        assert_eq!(TypeHash::from_name("Coord"), TypeHash::from_name("Coord"));
        assert_ne!(TypeHash::from_name("Coord"), TypeHash::from_name("coord"));
    }

    #[test]
    fn function_hash_overload_distinction() {
        let f1 = TypeHash::from_function("multiTest", &[primitives::INT32]);
        let f2 = TypeHash::from_function("multiTest", &[primitives::INT32, primitives::INT32]);
        assert_ne!(f1, f2);
    }

    #[test]
    fn function_hash_parameter_order_matters() {
        let f1 = TypeHash::from_function("f", &[primitives::INT32, primitives::STRING]);
        let f2 = TypeHash::from_function("f", &[primitives::STRING, primitives::INT32]);
        assert_ne!(f1, f2);
    }

    #[test]
    fn method_hash_includes_owner_and_constness() {
        let a = TypeHash::from_name("A");
        let b = TypeHash::from_name("B");
        assert_ne!(
            TypeHash::from_method(a, "use", &[], false),
            TypeHash::from_method(b, "use", &[], false)
        );
        assert_ne!(
            TypeHash::from_method(a, "use", &[], false),
            TypeHash::from_method(a, "use", &[], true)
        );
        assert_ne!(
            TypeHash::from_method(a, "use", &[], false),
            TypeHash::from_function("use", &[])
        );
    }

    #[test]
    fn constructor_hash_overload_distinction() {
        let owner = TypeHash::from_name("PrimitiveMethods");
        assert_ne!(
            TypeHash::from_constructor(owner, &[]),
            TypeHash::from_constructor(owner, &[primitives::INT32])
        );
    }

    #[test]
    fn template_instance_hash() {
        let v_int = TypeHash::from_template_instance(templates::VECTOR, &[primitives::INT32]);
        let v_str = TypeHash::from_template_instance(templates::VECTOR, &[primitives::STRING]);
        assert_ne!(v_int, v_str);
        assert_ne!(v_int, templates::VECTOR);
    }

    #[test]
    fn primitive_constants_are_unique() {
        let all = [
            primitives::VOID,
            primitives::BOOL,
            primitives::INT8,
            primitives::INT16,
            primitives::INT32,
            primitives::INT64,
            primitives::UINT8,
            primitives::UINT16,
            primitives::UINT32,
            primitives::UINT64,
            primitives::FLOAT32,
            primitives::FLOAT64,
            primitives::STRING,
            primitives::CSTRING,
            primitives::BUFFER,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn hash_display_and_debug() {
        let h = TypeHash(0x1234);
        assert_eq!(format!("{}", h), "0x0000000000001234");
        assert_eq!(format!("{:?}", h), "TypeHash(0x0000000000001234)");
    }

    #[test]
    fn empty_hash() {
        assert!(TypeHash::EMPTY.is_empty());
        assert!(!primitives::INT32.is_empty());
    }
}
