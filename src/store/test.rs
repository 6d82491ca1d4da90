use super::*;

#[test]
fn find_or_create_is_idempotent() {
    let mut store = PerThreadStore::new(16);
    let a1 = store.find_or_create_by_name("alpha");
    let a2 = store.find_or_create_by_name("alpha");
    assert_eq!(a1, a2);
    assert_eq!(store.find_by_name("alpha"), Some(a1));
}

#[test]
fn lookup_independent_of_insertion_order() {
    // P6: find(insert(name)) == insertedTimer regardless of what else was inserted first.
    let mut store = PerThreadStore::new(4);
    let beta = store.find_or_create_by_name("beta");
    let _gamma = store.find_or_create_by_name("gamma");
    let _delta = store.find_or_create_by_name("delta");
    assert_eq!(store.find_by_name("beta"), Some(beta));
}

#[test]
fn root_is_preseeded_at_index_zero() {
    let store = PerThreadStore::new(16);
    assert_eq!(store.root().name.as_str(), crate::config::ROOT_NAME);
    assert_eq!(ROOT_ID, 0);
}

#[test]
fn address_keyed_timer_name_is_lowercase_hex() {
    let mut store = PerThreadStore::new(16);
    let id = store.find_or_create_by_address(0xDEAD_BEEF);
    assert_eq!(store.timer(id).name.as_str(), "deadbeef");
    assert_eq!(store.find_by_address(0xDEAD_BEEF), Some(id));
}

#[test]
fn name_truncated_to_max_chars() {
    let mut store = PerThreadStore::new(16);
    let long = "x".repeat(200);
    let id = store.find_or_create_by_name(&long);
    assert_eq!(store.timer(id).name.len(), crate::config::MAX_CHARS);
}

#[test]
fn max_name_len_tracks_longest_inserted_name() {
    // P7
    let mut store = PerThreadStore::new(16);
    store.find_or_create_by_name("a");
    store.find_or_create_by_name("longer_name");
    store.find_or_create_by_name("x");
    assert_eq!(store.max_name_len, "longer_name".len());
}

#[test]
fn hash_name_is_deterministic_and_bounded() {
    let h1 = hash_name("region", 1023);
    let h2 = hash_name("region", 1023);
    assert_eq!(h1, h2);
    assert!(h1 < 1023);
}

#[test]
fn hash_address_shifts_off_alignment_bits() {
    assert_eq!(hash_address(0x10, 1023), hash_address(0x10, 1023));
    assert_eq!(hash_address(0x0, 1023), 0);
}
