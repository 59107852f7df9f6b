//! Byte-permutation post-processor (C8).
//!
//! A digit permutation such as `3412` lists, left to right, which
//! 1-indexed source byte becomes the next assembled (conceptually
//! big-endian) byte. Given file bytes `raw[0..P]` and permutation digits
//! `perm[0..P]` (each in `1..=P`, no repeats), the assembled big-endian
//! byte sequence is `assembled[i] = raw[perm[i] - 1]`.
//!
//! Permutations are only valid where the permutation length equals the
//! field's in-file byte count (§3), so no padding is needed here: the
//! caller zero-extends the assembled bytes to the field's promoted
//! storage width exactly as it would for a plain big-endian field.
use crate::field::ByteOrder;

/// Reorder `raw` according to `permutation`, producing the byte sequence
/// that a plain big-endian read would need to see to recover the
/// original value.
///
/// # Panics
/// Panics if `raw.len() != permutation.len()` or if any permutation digit
/// is out of range; both are guaranteed not to happen for a
/// [`ByteOrder`] that passed [`ByteOrder::parse`] validation and was
/// matched against a field whose in-file byte count equals the
/// permutation width.
pub fn permute_bytes(raw: &[u8], permutation: &[u8]) -> Vec<u8> {
    assert_eq!(raw.len(), permutation.len());
    permutation
        .iter()
        .map(|&p| raw[usize::from(p) - 1])
        .collect()
}

/// Invert a permutation: `invert(perm)[perm[i] - 1] = i + 1`. Used by the
/// encoder to go from an assembled big-endian byte sequence back to the
/// file's on-wire byte order.
pub fn invert_permutation(permutation: &[u8]) -> Vec<u8> {
    let mut inverse = vec![0_u8; permutation.len()];
    for (i, &p) in permutation.iter().enumerate() {
        inverse[usize::from(p) - 1] = (i + 1) as u8;
    }
    inverse
}

/// Reorder `raw` according to `order`, if `order` is a
/// [`ByteOrder::Permutation`]; otherwise returns `raw` unchanged (the
/// caller is expected to have already handled `Big`/`Little` via a plain
/// byteswap).
pub fn apply_byte_order_permutation(raw: &[u8], order: &ByteOrder) -> Vec<u8> {
    match order {
        ByteOrder::Permutation(digits) => permute_bytes(raw, digits),
        _ => raw.to_vec(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn s5_permutation_3412_recovers_big_endian_order() {
        // Original big-endian value 0x11223344 stored on the wire using
        // byte_order "3412": file bytes are permuted so that applying
        // the 3412 gather recovers [0x11, 0x22, 0x33, 0x44].
        let original = [0x11, 0x22, 0x33, 0x44];
        let perm = vec![3_u8, 4, 1, 2];

        // Construct file bytes such that permute_bytes(file, perm) == original.
        // assembled[i] = file[perm[i]-1]  =>  file[perm[i]-1] = original[i]
        let mut file = [0_u8; 4];
        for (i, &p) in perm.iter().enumerate() {
            file[usize::from(p) - 1] = original[i];
        }

        let recovered = permute_bytes(&file, &perm);
        assert_eq!(recovered, original);
    }

    #[test]
    fn identity_permutation_is_noop() {
        let raw = [1, 2, 3, 4];
        let perm = vec![1_u8, 2, 3, 4];
        assert_eq!(permute_bytes(&raw, &perm), raw);
    }

    #[test]
    fn invert_permutation_round_trips() {
        let perm = vec![3_u8, 4, 1, 2];
        let inverse = invert_permutation(&perm);
        let original = [0x11, 0x22, 0x33, 0x44];
        let assembled = permute_bytes(&original, &inverse);
        let recovered = permute_bytes(&assembled, &perm);
        assert_eq!(recovered, original);
    }
}
