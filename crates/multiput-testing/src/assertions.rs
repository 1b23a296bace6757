//! Common assertions for multiput testing

use crate::MemoryStore;

/// Asserts that `bucket/key` exists in the store with exactly `expected` as content
pub fn assert_object_eq(store: &MemoryStore, bucket: &str, key: &str, expected: &[u8]) {
    let object = store
        .object(bucket, key)
        .unwrap_or_else(|| panic!("object {}/{} does not exist", bucket, key));

    assert_eq!(
        object.len(),
        expected.len(),
        "Size mismatch for {}/{}",
        bucket,
        key
    );
    if let Some(offset) = object.iter().zip(expected).position(|(a, b)| a != b) {
        panic!("Content of {}/{} differs at byte {}", bucket, key, offset);
    }
}

/// Asserts that part numbers are strictly ascending and contiguous from 1
pub fn assert_contiguous_from_one(part_numbers: &[u32]) {
    for (i, number) in part_numbers.iter().enumerate() {
        assert_eq!(
            *number,
            i as u32 + 1,
            "Part list {:?} is not contiguous from 1",
            part_numbers
        );
    }
}
