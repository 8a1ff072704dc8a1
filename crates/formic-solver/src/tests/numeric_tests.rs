use crate::embedding::numeric::{
    nat_decode, nat_decode_expr, nat_encode, nat_encode_expr, neg_decode, neg_encode, pos_decode,
    pos_decode_expr, pos_encode, pos_encode_expr,
};
use formic_smt::BExpr;

#[test]
fn test_pos_encoding_is_the_alternating_scheme() {
    // 1, 2, 3, 4, 5 <-> 0, 1, -1, 2, -2
    assert_eq!(pos_encode(1), 0);
    assert_eq!(pos_encode(2), 1);
    assert_eq!(pos_encode(3), -1);
    assert_eq!(pos_encode(4), 2);
    assert_eq!(pos_encode(5), -2);
}

#[test]
fn test_bijections_round_trip() {
    for v in 1..=64i128 {
        assert_eq!(pos_decode(pos_encode(v)), v);
    }
    for v in 0..=64i128 {
        assert_eq!(nat_decode(nat_encode(v)), v);
    }
    for v in (-64..=-1i128).rev() {
        assert_eq!(neg_decode(neg_encode(v)), v);
    }
}

#[test]
fn test_encodings_cover_all_codes() {
    // Decoding is total over codes; each code hits a distinct value.
    let mut seen = Vec::new();
    for z in -32..=32i128 {
        let v = pos_decode(z);
        assert!(v >= 1);
        assert!(!seen.contains(&v));
        seen.push(v);
    }
}

#[test]
fn test_expr_level_decode_folds_on_literals() {
    for z in -16..=16i128 {
        assert_eq!(pos_decode_expr(BExpr::int(z)), BExpr::int(pos_decode(z)));
        assert_eq!(nat_decode_expr(BExpr::int(z)), BExpr::int(nat_decode(z)));
    }
}

#[test]
fn test_expr_level_encode_folds_on_literals() {
    for v in 1..=16i128 {
        assert_eq!(pos_encode_expr(BExpr::int(v)), BExpr::int(pos_encode(v)));
    }
    for v in 0..=16i128 {
        assert_eq!(nat_encode_expr(BExpr::int(v)), BExpr::int(nat_encode(v)));
    }
}
