use proptest::prelude::*;
use proximity::{BeaconCodec, BeaconPayload};

proptest! {
    /// Pairs that fit the budget survive an encode/decode round trip
    /// exactly.
    #[test]
    fn fitting_pairs_round_trip(code in "088[A-Z0-9]{8,17}", name in "[^|]{0,8}") {
        let codec = BeaconCodec::default();
        prop_assume!(code.len() + 1 + name.len() <= codec.payload_budget());

        let payload = BeaconPayload::new(code, name);
        let bytes = codec.encode(&payload);

        prop_assert!(bytes.len() <= codec.payload_budget());
        prop_assert_eq!(codec.decode(&bytes), Some(payload));
    }

    /// Whatever the name length, decoding yields the full code plus a
    /// char-boundary prefix of the name within the remaining budget.
    #[test]
    fn names_truncate_to_a_prefix(code in "088[A-Z0-9]{8,17}", name in "[^|]{0,16}") {
        let codec = BeaconCodec::default();
        let payload = BeaconPayload::new(code.clone(), name.clone());

        let decoded = codec.decode(&codec.encode(&payload)).unwrap();

        prop_assert_eq!(decoded.transfer_code, code.clone());
        prop_assert!(name.starts_with(&decoded.display_name));
        let remaining = codec.payload_budget().saturating_sub(code.len() + 1);
        prop_assert!(decoded.display_name.len() <= remaining);
    }

    /// Decode never panics on arbitrary bytes from the open air.
    #[test]
    fn decode_is_total_on_arbitrary_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let _ = BeaconCodec::default().decode(&bytes);
    }
}
