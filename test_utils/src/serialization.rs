/// Checks that an object survives a JSON and a MessagePack round trip. Pass `ark` as the first
/// argument to also check the compressed and uncompressed canonical encodings.
#[macro_export]
macro_rules! test_serialization {
    (ark, $obj_type:ty, $obj: expr) => {
        let mut serz = vec![];
        $crate::ark_serialize::CanonicalSerialize::serialize_compressed(&$obj, &mut serz).unwrap();
        let deserz: $obj_type =
            $crate::ark_serialize::CanonicalDeserialize::deserialize_compressed(&serz[..]).unwrap();
        assert_eq!(deserz, $obj);

        let mut serz = vec![];
        $crate::ark_serialize::CanonicalSerialize::serialize_uncompressed(&$obj, &mut serz).unwrap();
        let deserz: $obj_type =
            $crate::ark_serialize::CanonicalDeserialize::deserialize_uncompressed(&serz[..]).unwrap();
        assert_eq!(deserz, $obj);

        $crate::test_serialization!($obj_type, $obj);
    };
    ($obj_type:ty, $obj: expr) => {
        // Test JSON serialization
        let ser = $crate::serde_json::to_string(&$obj).unwrap();
        let deser = $crate::serde_json::from_str::<$obj_type>(&ser).unwrap();
        assert_eq!($obj, deser);

        // Test Message Pack serialization
        let ser = $crate::rmp_serde::to_vec_named(&$obj).unwrap();
        let deser = $crate::rmp_serde::from_slice::<$obj_type>(&ser).unwrap();
        assert_eq!($obj, deser);
    };
}
