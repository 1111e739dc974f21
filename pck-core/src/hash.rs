//! Cheap, non-cryptographic fingerprinting for `Trajectory::input_hash`.
//!
//! Open question, resolved per the spec's instruction to preserve
//! rather than "correct": a 32-bit FNV-1a rolling hash suffices.
//! Collisions are expected and tolerated — nothing downstream treats
//! `input_hash` as a unique key, only as an advisory fingerprint for
//! "did this trajectory start from roughly the same text as another."
//! Do not upgrade to a cryptographic hash without first auditing every
//! caller that compares `input_hash` values.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// FNV-1a 32-bit hash of `input`'s UTF-8 bytes.
pub fn fnv1a_32(input: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in input.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_hashes_to_offset_basis() {
        assert_eq!(fnv1a_32(""), FNV_OFFSET_BASIS);
    }

    #[test]
    fn same_input_hashes_identically() {
        let text = "Teaching fractions with visual models";
        assert_eq!(fnv1a_32(text), fnv1a_32(text));
    }

    #[test]
    fn different_input_usually_hashes_differently() {
        assert_ne!(fnv1a_32("fractions"), fnv1a_32("decimals"));
    }
}
