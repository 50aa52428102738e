//! Integration tests for the committed repository
//!
//! Tests checkout isolation and optimistic commits.

use ferrule_foundation::{ErrorKind, QName};
use ferrule_repository::Repository;
use ferrule_repository::model::{ASSOC_CONTAINS, TYPE_FOLDER};

#[test]
fn new_repository_is_version_zero() {
    let (repository, store) = Repository::with_store("workspace", "SpacesStore").unwrap();
    assert_eq!(repository.version(), 0);
    assert_eq!(repository.snapshot().stores(), [store]);
}

#[test]
fn commits_advance_the_version() {
    let (repository, store) = Repository::with_store("workspace", "SpacesStore").unwrap();
    for expected in 1..=3 {
        let mut checkout = repository.checkout();
        let root = checkout.store.root_node(&store).unwrap();
        checkout
            .store
            .create_node(&root, ASSOC_CONTAINS, QName::new("", "n"), TYPE_FOLDER, [])
            .unwrap();
        assert_eq!(repository.commit(checkout.version, checkout.store).unwrap(), expected);
    }
    assert_eq!(repository.version(), 3);
}

#[test]
fn concurrent_checkouts_do_not_see_each_other() {
    let (repository, store) = Repository::with_store("workspace", "SpacesStore").unwrap();
    let mut first = repository.checkout();
    let second = repository.checkout();

    let root = first.store.root_node(&store).unwrap();
    let node = first
        .store
        .create_node(&root, ASSOC_CONTAINS, QName::new("", "n"), TYPE_FOLDER, [])
        .unwrap()
        .child;

    assert!(!second.store.exists(&node));
    repository.commit(first.version, first.store).unwrap();
    assert!(!second.store.exists(&node));

    let err = repository.commit(second.version, second.store).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ConcurrentModification { .. }));
    assert!(repository.snapshot().exists(&node));
}
