use jdoc_core::{DocError, Document, Kind, ReadOpts, Scalar};

fn array_names(doc: &Document, arr: jdoc_core::NodeId) -> Vec<String> {
    doc.entries(arr).map(|(n, _)| n.to_string()).collect()
}

#[test]
fn dotted_path_consistency() {
    let mut doc = Document::new_object();
    let root = doc.root();
    doc.set(root, "a.b.c", 7);
    assert_eq!(doc.get_int(root, "a.b.c", 0), 7);
    let b = doc.get_object(root, "a.b").unwrap();
    assert_eq!(doc.get_int(b, "c", 0), 7);
    assert!(doc.has(root, "a.b"));
    assert!(!doc.has(root, "a.b.missing"));
}

#[test]
fn intermediate_kind_follows_next_segment() {
    let mut doc = Document::new_object();
    let root = doc.root();
    doc.set(root, "obj.list.0.leaf", 1);
    assert_eq!(doc.kind(doc.get(root, "obj").unwrap()), Kind::Object);
    assert_eq!(doc.kind(doc.get(root, "obj.list").unwrap()), Kind::Array);
    assert_eq!(doc.kind(doc.get(root, "obj.list.0").unwrap()), Kind::Object);
}

#[test]
fn array_removal_reindexes() {
    let mut doc = Document::new_array();
    let root = doc.root();
    for v in [10, 20, 30] {
        doc.push(root, v).unwrap();
    }
    assert_eq!(array_names(&doc, root), ["0", "1", "2"]);

    let removed = doc.remove(root, "1").unwrap();
    assert_eq!(doc.as_int(removed), Some(20));
    assert_eq!(doc.parent(removed), None);
    assert_eq!(doc.name(removed), "");

    assert_eq!(array_names(&doc, root), ["0", "1"]);
    assert_eq!(doc.get_int(root, "0", 0), 10);
    assert_eq!(doc.get_int(root, "1", 0), 30);
}

#[test]
fn contiguity_over_mixed_operations() {
    let mut doc = Document::new_array();
    let root = doc.root();
    for v in 0..5 {
        doc.push(root, v).unwrap();
    }
    doc.remove(root, "0");
    doc.remove(root, "2");
    doc.push(root, 99).unwrap();
    let n = doc.len(root);
    assert_eq!(n, 4);
    let names = array_names(&doc, root);
    let want: Vec<String> = (0..n).map(|i| i.to_string()).collect();
    assert_eq!(names, want);
    assert_eq!(doc.get_int(root, "3", -1), 99);

    // Removing the tail needs no relabeling, but stays contiguous too.
    doc.remove(root, "3");
    assert_eq!(array_names(&doc, root), ["0", "1", "2"]);
}

#[test]
fn replace_preserves_array_position() {
    let mut doc = Document::new_array();
    let root = doc.root();
    for v in [10, 20, 30] {
        doc.push(root, v).unwrap();
    }
    doc.set(root, "1", 99);
    assert_eq!(doc.len(root), 3);
    assert_eq!(array_names(&doc, root), ["0", "1", "2"]);
    assert_eq!(doc.get_int(root, "1", 0), 99);
}

#[test]
fn numeric_set_past_the_end_appends() {
    let mut doc = Document::new_array();
    let root = doc.root();
    doc.push(root, 1).unwrap();
    doc.set(root, "7", 2);
    assert_eq!(array_names(&doc, root), ["0", "1"]);
    assert_eq!(doc.get_int(root, "1", 0), 2);
}

#[test]
fn typed_reads_fall_back_to_defaults() {
    let doc = jdoc_core::parse_str(
        r#"{"s": "text", "n": 3, "arr": [1]}"#,
        &ReadOpts::default(),
    )
    .unwrap();
    let root = doc.root();
    assert_eq!(doc.get_int(root, "s", -7), -7);
    assert_eq!(doc.get_str(root, "n", "fallback"), "fallback");
    assert!(doc.get_bool(root, "missing.deep", true));
    assert!(doc.get_object(root, "arr").is_none());
    assert!(doc.get_array(root, "arr").is_some());
    // Walking through a scalar fails, it does not error.
    assert!(!doc.has(root, "s.inner"));
    assert_eq!(doc.get(root, "s.inner.deeper"), None);
}

#[test]
fn insert_replaces_in_place_keeping_order() {
    let mut doc = Document::new_object();
    let root = doc.root();
    doc.insert(root, "x", 1).unwrap();
    doc.insert(root, "y", 2).unwrap();
    doc.insert(root, "x", 9).unwrap();
    let names: Vec<String> = doc.entries(root).map(|(n, _)| n.to_string()).collect();
    assert_eq!(names, ["x", "y"]);
    assert_eq!(doc.get_int(root, "x", 0), 9);
}

#[test]
fn scalar_is_replaced_by_a_chain() {
    let mut doc = Document::new_object();
    let root = doc.root();
    doc.set(root, "k", 1);
    doc.set(root, "k.x", 2);
    assert_eq!(doc.kind(doc.get(root, "k").unwrap()), Kind::Object);
    assert_eq!(doc.get_int(root, "k.x", 0), 2);
}

#[test]
fn misuse_errors() {
    let mut doc = Document::new_object();
    let root = doc.root();
    assert!(matches!(doc.push(root, 1), Err(DocError::NotAContainer)));

    let arr = doc.alloc_array();
    doc.insert_node(root, "xs", arr).unwrap();
    let attached = doc.get(root, "xs").unwrap();
    assert!(matches!(
        doc.set_node(root, "elsewhere", attached),
        Err(DocError::NodeAssigned)
    ));

    let scalar = doc.alloc(Scalar::Int(5));
    assert!(matches!(
        doc.insert_node(attached, "name", scalar),
        Err(DocError::NotAContainer)
    ));
}

#[test]
fn duplicate_detaches_a_deep_copy() {
    let mut doc = Document::new_object();
    let root = doc.root();
    doc.set(root, "a.b", 1);
    doc.set(root, "a.xs.0", "first");

    let a = doc.get(root, "a").unwrap();
    let copy = doc.duplicate(a);
    assert_eq!(doc.parent(copy), None);
    assert_eq!(doc.name(copy), "");
    doc.insert_node(root, "a2", copy).unwrap();

    let left = doc.get(root, "a.b").unwrap();
    let right = doc.get(root, "a2.b").unwrap();
    assert!(doc.node_eq(left, &doc, right));
    assert_eq!(doc.get_str(root, "a2.xs.0", ""), "first");

    // Editing the copy leaves the source untouched.
    doc.set(root, "a2.b", 99);
    assert_eq!(doc.get_int(root, "a.b", 0), 1);
}

#[test]
fn adopt_copies_across_documents() {
    let src = jdoc_core::parse_str(r#"{"inner": {"v": [1, 2]}}"#, &ReadOpts::default()).unwrap();
    let inner = src.get(src.root(), "inner").unwrap();

    let mut dst = Document::new_object();
    let root = dst.root();
    let grafted = dst.adopt(&src, inner);
    dst.insert_node(root, "grafted", grafted).unwrap();
    assert_eq!(dst.get_int(root, "grafted.v.1", 0), 2);
    // Names differ ("inner" vs "grafted"); the subtrees below them agree.
    assert!(!src.node_eq(inner, &dst, dst.get(root, "grafted").unwrap()));
    let sv = src.get(src.root(), "inner.v").unwrap();
    let dv = dst.get(root, "grafted.v").unwrap();
    assert!(src.node_eq(sv, &dst, dv));
}

#[test]
fn filtered_iteration_skips() {
    let doc = jdoc_core::parse_str(
        r#"{"a": 1, "kids": {}, "b": "x", "more": [1], "c": null}"#,
        &ReadOpts::default(),
    )
    .unwrap();
    let root = doc.root();
    assert_eq!(doc.scalars(root).count(), 3);
    assert_eq!(doc.containers(root).count(), 2);
    let scalar_names: Vec<&str> =
        doc.scalars(root).map(|id| doc.name(id)).collect();
    assert_eq!(scalar_names, ["a", "b", "c"]);
}

#[test]
fn assignment_lifecycle() {
    let mut doc = Document::new_object();
    let root = doc.root();
    let node = doc.alloc(Scalar::Str("v".into()));
    assert_eq!(doc.parent(node), None);
    assert_eq!(doc.name(node), "");

    doc.insert_node(root, "key", node).unwrap();
    assert_eq!(doc.parent(node), Some(root));
    assert_eq!(doc.name(node), "key");

    doc.detach(node);
    assert_eq!(doc.parent(node), None);
    assert_eq!(doc.name(node), "");
    assert!(!doc.has(root, "key"));
}

#[test]
fn structural_equality_is_strict() {
    let a = jdoc_core::parse_str(r#"{"x": [1, 2]}"#, &ReadOpts::default()).unwrap();
    let b = jdoc_core::parse_str(r#"{"x": [1, 2]}"#, &ReadOpts::default()).unwrap();
    let c = jdoc_core::parse_str(r#"{"x": [1, 3]}"#, &ReadOpts::default()).unwrap();
    let d = jdoc_core::parse_str(r#"{"x": {"0": 1, "1": 2}}"#, &ReadOpts::default()).unwrap();
    assert!(a.node_eq(a.root(), &b, b.root()));
    assert!(!a.node_eq(a.root(), &c, c.root()));
    // Same names and values, but Array and Object are different variants.
    assert!(!a.node_eq(a.root(), &d, d.root()));
}
