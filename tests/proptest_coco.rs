use cocomerge::ir::io_coco_json::{from_coco_str, to_coco_string};
use proptest::prelude::*;

mod proptest_helpers;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn coco_roundtrip_preserves_records(dataset in proptest_helpers::arb_dataset(6, 12)) {
        let json = to_coco_string(&dataset).expect("serialize coco");
        let restored = from_coco_str(&json).expect("parse coco");

        // The writer sorts every list by id.
        let mut expected = dataset.clone();
        expected.licenses.sort_by_key(|l| l.id);
        expected.images.sort_by_key(|i| i.id);
        expected.categories.sort_by_key(|c| c.id);
        expected.annotations.sort_by_key(|a| a.id);

        prop_assert_eq!(restored, expected);
    }

    #[test]
    fn coco_output_is_deterministic(dataset in proptest_helpers::arb_dataset(6, 12)) {
        let first = to_coco_string(&dataset).expect("serialize first");
        let second = to_coco_string(&from_coco_str(&first).expect("parse")).expect("serialize second");
        prop_assert_eq!(first, second);
    }
}
