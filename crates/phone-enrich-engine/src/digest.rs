//! Input identity digest.
//!
//! A checkpoint is only trusted for the exact input it was written against.
//! The digest is FNV-1a 64-bit over the raw input bytes, serialized as
//! `"fnv1a64:<16 lowercase hex digits>"`. It is an identity check, not a
//! security primitive.

pub const DIGEST_PREFIX: &str = "fnv1a64:";

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001b3;

pub fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

pub fn input_digest(bytes: &[u8]) -> String {
    format!("{DIGEST_PREFIX}{:016x}", fnv1a64(bytes))
}
