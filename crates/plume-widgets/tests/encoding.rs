use plume_widgets::{decode_expression, encode_expression};
use proptest::prelude::*;

proptest! {
    #[test]
    fn encode_decode_round_trips(expr in "\\PC*") {
        prop_assert_eq!(decode_expression(&encode_expression(&expr)), expr);
    }

    #[test]
    fn encoded_form_is_attribute_safe(expr in "\\PC*") {
        let encoded = encode_expression(&expr);
        prop_assert!(!encoded.contains('"'));
        prop_assert!(!encoded.contains('<'));
        prop_assert!(!encoded.contains('&'));
    }
}

#[test]
fn non_ascii_expressions_survive() {
    for expr in ["∑ᵢ xᵢ", "ক + খ", "π ≈ 3.14159", "\\text{ñandú}"] {
        assert_eq!(decode_expression(&encode_expression(expr)), expr);
    }
}
