//! Power-of-two factorization of ranges and constant sets.
//!
//! Backend bit-vectors are cheapest at exact widths, so declared ranges are
//! cut into maximal power-of-two-*aligned* sub-ranges and finite constant
//! sets get the smallest covering power-of-two slot count. Width-1 pieces
//! are the caller's cue to build a Singleton instead.

/// Decompose `[lo, hi]` into maximal power-of-two-aligned sub-ranges, in
/// ascending order. Each piece has `2^k` elements and starts at a multiple
/// of its own size (euclidean, so negative ranges align the same way).
pub fn split_pow2_aligned(lo: i128, hi: i128) -> Vec<(i128, i128)> {
    assert!(lo <= hi, "inverted range {lo}..{hi}");
    let mut out = Vec::new();
    let mut cursor = lo;
    while cursor <= hi {
        let mut k = 0u32;
        while k < 126 {
            let size = 1i128 << (k + 1);
            let fits = cursor.rem_euclid(size) == 0
                && cursor
                    .checked_add(size - 1)
                    .is_some_and(|end| end <= hi);
            if fits {
                k += 1;
            } else {
                break;
            }
        }
        let size = 1i128 << k;
        out.push((cursor, cursor + size - 1));
        cursor += size;
    }
    out
}

/// Bit width needed to index `n` values (`n >= 1`). `n = 1` yields 0, the
/// caller's Singleton case.
pub fn index_width(n: usize) -> u32 {
    debug_assert!(n >= 1);
    usize::BITS - (n - 1).leading_zeros()
}

/// Number of inhabitants of a width-`w` piece.
pub fn slot_count(width: u32) -> u128 {
    1u128 << width
}
