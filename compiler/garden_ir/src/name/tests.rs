use super::*;

#[test]
fn test_name_empty_is_default() {
    assert_eq!(Name::default(), Name::EMPTY);
    assert!(Name::EMPTY.is_empty());
    assert!(!Name::from_raw(3).is_empty());
}

#[test]
fn test_name_hash_dedup() {
    use std::collections::HashSet;
    let mut set = HashSet::new();
    set.insert(Name::from_raw(1));
    set.insert(Name::from_raw(1));
    set.insert(Name::from_raw(2));
    assert_eq!(set.len(), 2);
}

#[test]
fn test_name_debug() {
    assert_eq!(format!("{:?}", Name::from_raw(7)), "Name(7)");
}
