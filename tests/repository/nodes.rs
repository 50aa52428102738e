//! Integration tests for node storage
//!
//! Tests the node tree, aspects, properties and peer associations.

use ferrule_foundation::{ErrorKind, NodeRef, QName, Value};
use ferrule_repository::NodeStore;
use ferrule_repository::model::{
    ASPECT_COPIED_FROM, ASPECT_TITLED, ASSOC_CONTAINS, PROP_COPY_REFERENCE, PROP_NAME, PROP_TITLE,
    TYPE_CONTENT, TYPE_FOLDER, TYPE_STORE_ROOT,
};

fn name(local: &str) -> QName {
    QName::new("", local)
}

fn setup() -> (NodeStore, NodeRef) {
    let mut nodes = NodeStore::new();
    let store = nodes.create_store("workspace", "SpacesStore").unwrap();
    let root = nodes.root_node(&store).unwrap();
    (nodes, root)
}

fn create(nodes: &mut NodeStore, parent: &NodeRef, local: &str, node_type: QName) -> NodeRef {
    nodes
        .create_node(
            parent,
            ASSOC_CONTAINS,
            name(local),
            node_type,
            [(PROP_NAME, Value::text(local))],
        )
        .unwrap()
        .child
}

// =============================================================================
// Tree
// =============================================================================

#[test]
fn store_root_has_root_type() {
    let (nodes, root) = setup();
    assert!(nodes.is_root(&root));
    assert_eq!(nodes.node_type(&root).unwrap(), TYPE_STORE_ROOT);
    assert!(nodes.primary_parent(&root).unwrap().is_none());
}

#[test]
fn ancestors_are_nearest_first() {
    let (mut nodes, root) = setup();
    let a = create(&mut nodes, &root, "a", TYPE_FOLDER);
    let b = create(&mut nodes, &a, "b", TYPE_FOLDER);
    let c = create(&mut nodes, &b, "c", TYPE_CONTENT);
    assert_eq!(nodes.ancestors(&c).unwrap(), [b, a, root]);
}

#[test]
fn children_keep_creation_order() {
    let (mut nodes, root) = setup();
    let first = create(&mut nodes, &root, "first", TYPE_CONTENT);
    let second = create(&mut nodes, &root, "second", TYPE_CONTENT);
    let children: Vec<_> = nodes
        .child_assocs(&root, None)
        .unwrap()
        .into_iter()
        .map(|a| a.child)
        .collect();
    assert_eq!(children, [first, second]);
}

#[test]
fn delete_removes_subtree() {
    let (mut nodes, root) = setup();
    let folder = create(&mut nodes, &root, "folder", TYPE_FOLDER);
    let doc = create(&mut nodes, &folder, "doc", TYPE_CONTENT);
    let before = nodes.node_count();

    nodes.delete_node(&folder).unwrap();

    assert!(!nodes.exists(&folder));
    assert!(!nodes.exists(&doc));
    assert_eq!(nodes.node_count(), before - 2);
    assert!(nodes.child_assocs(&root, None).unwrap().is_empty());
}

#[test]
fn operations_on_missing_nodes_fail() {
    let (mut nodes, root) = setup();
    let doc = create(&mut nodes, &root, "doc", TYPE_CONTENT);
    nodes.delete_node(&doc).unwrap();

    let err = nodes.set_property(&doc, PROP_TITLE, "x").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NodeNotFound(_)));
    assert!(nodes.has_aspect(&doc, &ASPECT_TITLED).is_err());
}

// =============================================================================
// Copy and Move
// =============================================================================

#[test]
fn shallow_copy_skips_children() {
    let (mut nodes, root) = setup();
    let folder = create(&mut nodes, &root, "folder", TYPE_FOLDER);
    create(&mut nodes, &folder, "doc", TYPE_CONTENT);
    let target = create(&mut nodes, &root, "target", TYPE_FOLDER);

    let copy = nodes
        .copy_node(&folder, &target, ASSOC_CONTAINS, name("folder"), false)
        .unwrap();

    assert!(nodes.child_assocs(&copy, None).unwrap().is_empty());
    assert!(nodes.has_aspect(&copy, &ASPECT_COPIED_FROM).unwrap());
    assert_eq!(
        nodes.property(&copy, &PROP_COPY_REFERENCE).unwrap(),
        Some(Value::Node(folder))
    );
}

#[test]
fn deep_copy_copies_children() {
    let (mut nodes, root) = setup();
    let folder = create(&mut nodes, &root, "folder", TYPE_FOLDER);
    create(&mut nodes, &folder, "doc", TYPE_CONTENT);
    let target = create(&mut nodes, &root, "target", TYPE_FOLDER);

    let copy = nodes
        .copy_node(&folder, &target, ASSOC_CONTAINS, name("folder"), true)
        .unwrap();

    let children = nodes.child_assocs(&copy, None).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(
        nodes.property(&children[0].child, &PROP_NAME).unwrap(),
        Some(Value::text("doc"))
    );
}

#[test]
fn move_relinks_parent() {
    let (mut nodes, root) = setup();
    let from = create(&mut nodes, &root, "from", TYPE_FOLDER);
    let to = create(&mut nodes, &root, "to", TYPE_FOLDER);
    let doc = create(&mut nodes, &from, "doc", TYPE_CONTENT);

    nodes.move_node(&doc, &to, ASSOC_CONTAINS, name("doc")).unwrap();

    assert_eq!(nodes.primary_parent(&doc).unwrap().unwrap().parent, to);
    assert!(nodes.child_assocs(&from, None).unwrap().is_empty());
}

// =============================================================================
// Aspects, Properties and Associations
// =============================================================================

#[test]
fn aspect_with_properties() {
    let (mut nodes, root) = setup();
    let doc = create(&mut nodes, &root, "doc", TYPE_CONTENT);
    nodes
        .add_aspect(&doc, ASPECT_TITLED, [(PROP_TITLE, Value::text("Report"))])
        .unwrap();

    assert_eq!(nodes.aspects(&doc).unwrap(), [ASPECT_TITLED]);
    assert_eq!(
        nodes.property(&doc, &PROP_TITLE).unwrap(),
        Some(Value::text("Report"))
    );
    assert!(nodes.remove_aspect(&doc, &ASPECT_TITLED).unwrap());
    assert!(!nodes.remove_aspect(&doc, &ASPECT_TITLED).unwrap());
}

#[test]
fn peer_associations() {
    let (mut nodes, root) = setup();
    let a = create(&mut nodes, &root, "a", TYPE_CONTENT);
    let b = create(&mut nodes, &root, "b", TYPE_CONTENT);
    let refs = QName::new("urn:test", "references");

    nodes.create_association(&a, &b, refs.clone()).unwrap();
    assert_eq!(nodes.target_assocs(&a, Some(&refs)).unwrap().len(), 1);
    assert_eq!(nodes.source_assocs(&b, None).unwrap()[0].source, a);

    nodes.remove_association(&a, &b, &refs).unwrap();
    assert!(nodes.target_assocs(&a, None).unwrap().is_empty());
    let err = nodes.remove_association(&a, &b, &refs).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::AssociationNotFound { .. }));
}
