//! Deterministic bucketing hash.

/// Hashes a string to a value in `[0, 1)`.
///
/// 32-bit rolling hash `h = h * 31 + unit` over the UTF-16 code units with
/// wrapping arithmetic, mapped through `|h| / 2^31`. The result is stable
/// across processes and platforms, so a given input always lands in the same
/// bucket.
pub fn hash_to_unit(input: &str) -> f64 {
    let hash = input.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    });
    // |i32::MIN| is exactly 2^31 and folds back to zero.
    f64::from(hash.unsigned_abs() % 0x8000_0000) / 2_147_483_648.0
}

/// Traffic gate input for a user within an experiment.
pub(crate) fn traffic_key(user_id: &str, experiment_id: &str) -> String {
    format!("{user_id}:traffic:{experiment_id}")
}

/// Variant bucketing input for a user within an experiment.
pub(crate) fn variant_key(user_id: &str, experiment_id: &str) -> String {
    format!("{user_id}{experiment_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_hashes_to_zero() {
        assert_eq!(hash_to_unit(""), 0.0);
    }

    #[test]
    fn matches_known_values() {
        assert_eq!(hash_to_unit("a"), 97.0 / 2_147_483_648.0);
        // 'a' * 31 + 'b'
        assert_eq!(hash_to_unit("ab"), 3105.0 / 2_147_483_648.0);
    }

    #[test]
    fn is_deterministic_and_in_range() {
        for i in 0..1000 {
            let key = format!("user-{i}experiment-42");
            let h = hash_to_unit(&key);
            assert!((0.0..1.0).contains(&h), "{key} hashed to {h}");
            assert_eq!(h, hash_to_unit(&key));
        }
    }

    #[test]
    fn hashes_utf16_code_units() {
        // U+1F600 is a surrogate pair in UTF-16.
        let expected = {
            let hi = 0xD83Di32;
            let lo = 0xDE00i32;
            let h = hi.wrapping_mul(31).wrapping_add(lo);
            f64::from(h.unsigned_abs()) / 2_147_483_648.0
        };
        assert_eq!(hash_to_unit("\u{1F600}"), expected);
    }
}
