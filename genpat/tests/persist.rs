//! Storing patterns and reading them back.

mod common;

use common::{body, init_tracing, method};
use genpat::attr::build_kind;
use genpat::persist::{NodeRecord, PatternRecord};
use genpat::{
    AttributeKind, AttributeRegistry, Matcher, MatcherConfig, NodeKind, Pattern, PatternConfig,
    PersistError, ScriptMode, TreeError,
};

fn rotated(registry: &AttributeRegistry, mode: ScriptMode) -> Pattern {
    let config = PatternConfig {
        mode,
        ..PatternConfig::default()
    };
    Pattern::new(
        method("run", &["a", "b", "c"]),
        method("run", &["c", "a", "b"]),
        registry,
        &config,
    )
    .unwrap()
}

#[test]
fn round_trip_keeps_everything() {
    init_tracing();
    let registry = AttributeRegistry::default();
    for mode in [ScriptMode::WithMoves, ScriptMode::InsertDelete] {
        let mut pattern = rotated(&registry, mode);
        let root = pattern.before().root();
        pattern.set_considered(&registry, root, "tokens", false).unwrap();
        let last = pattern.before().preorder().last().unwrap();
        pattern.set_node_considered(last, false).unwrap();

        let bytes = pattern.to_bytes(&registry).unwrap();
        let loaded = Pattern::from_json(&bytes, &registry).unwrap();

        assert_eq!(loaded.mode(), mode);
        assert_eq!(loaded.operations().len(), pattern.operations().len());
        assert_eq!(loaded.correspondence().len(), pattern.correspondence().len());
        assert_eq!(
            loaded.to_record(&registry).unwrap(),
            pattern.to_record(&registry).unwrap()
        );

        let loaded_root = loaded.before().root();
        assert!(!loaded.node_attributes(loaded_root).unwrap()[4].considered);
        let loaded_last = loaded.before().preorder().last().unwrap();
        assert!(!loaded.is_node_considered(loaded_last));
        assert_eq!(loaded.considered_nodes().len(), loaded.before().len() - 1);
        for node in loaded.before().preorder() {
            let row = loaded.node_attributes(node).unwrap();
            assert!(row.iter().all(|a| a.node == node));
        }
    }
}

#[test]
fn loaded_trees_are_linked() {
    init_tracing();
    let registry = AttributeRegistry::default();
    let pattern = rotated(&registry, ScriptMode::WithMoves);
    let json = pattern.to_json(&registry).unwrap();
    let loaded = Pattern::from_json(json.as_bytes(), &registry).unwrap();

    let before = loaded.before();
    let block = body(before);
    assert_eq!(before.parent(block), Some(before.root()));
    assert_eq!(before.children_in(block, "statements").count(), 3);
    assert_eq!(before.tokens(block), vec!["a", "b", "c"]);
    assert_eq!(loaded.before_to_after(block), Some(body(loaded.after())));
    assert_eq!(loaded.after().tokens(body(loaded.after())), vec!["c", "a", "b"]);

    // A loaded pattern still finds its own before tree
    let matcher = Matcher::new(&registry, MatcherConfig::default());
    assert!(matcher.first_match(&loaded, pattern.before()).is_some());
}

#[test]
fn missing_attribute_kinds_are_recomputed() {
    init_tracing();
    let registry = AttributeRegistry::default();
    let bytes = rotated(&registry, ScriptMode::WithMoves)
        .to_bytes(&registry)
        .unwrap();

    let extended = AttributeRegistry::builder_with_defaults()
        .register(AttributeKind::hard("kind_again", build_kind))
        .build()
        .unwrap();
    let loaded = Pattern::from_json(&bytes, &extended).unwrap();
    let root = loaded.before().root();
    let row = loaded.node_attributes(root).unwrap();
    assert_eq!(row.len(), 6);
    assert_eq!(row[5].value, row[0].value);
    assert!(row[5].considered);

    let reduced = AttributeRegistry::builder_with_defaults()
        .remove("tokens")
        .build()
        .unwrap();
    assert!(matches!(
        Pattern::from_json(&bytes, &reduced),
        Err(PersistError::UnknownAttribute(name)) if name == "tokens"
    ));
}

#[test]
fn malformed_records_are_rejected() {
    init_tracing();
    let registry = AttributeRegistry::default();
    let record = rotated(&registry, ScriptMode::WithMoves)
        .to_record(&registry)
        .unwrap();

    assert!(matches!(
        Pattern::from_json(b"{ not json", &registry),
        Err(PersistError::Json(_))
    ));

    let mut empty = record.clone();
    empty.before.nodes.clear();
    assert!(matches!(
        Pattern::from_record(&empty, &registry),
        Err(PersistError::EmptyTree)
    ));

    let mut forward: PatternRecord = record.clone();
    forward.before.nodes[1].parent = Some(5);
    assert!(matches!(
        Pattern::from_record(&forward, &registry),
        Err(PersistError::DanglingIndex(1))
    ));

    let mut bad_role = record.clone();
    bad_role.before.nodes.push(NodeRecord {
        kind: NodeKind::SimpleName,
        parent: Some(0),
        role: Some("nope".into()),
        scalars: Vec::new(),
        expr_type: None,
    });
    assert!(matches!(
        Pattern::from_record(&bad_role, &registry),
        Err(PersistError::Tree(TreeError::UnknownRole { .. }))
    ));

    let mut bad_ignored = record.clone();
    bad_ignored.ignored.push(999);
    assert!(matches!(
        Pattern::from_record(&bad_ignored, &registry),
        Err(PersistError::DanglingIndex(999))
    ));

    let mut bad_op = record;
    if let Some(op) = bad_op.operations.first_mut() {
        op.node = 999;
    }
    assert!(matches!(
        Pattern::from_record(&bad_op, &registry),
        Err(PersistError::DanglingIndex(999))
    ));
}
