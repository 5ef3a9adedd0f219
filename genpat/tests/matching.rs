//! Matcher behaviour on small hand-built trees.

mod common;

use common::{calls, init_tracing, push_call};
use genpat::attr::token_similarity;
use genpat::{
    AttributeRegistry, MatchInstance, Matcher, MatcherConfig, NodeKind, Pattern, PatternConfig,
    SyntaxTree,
};

fn extract(tree: SyntaxTree, registry: &AttributeRegistry) -> Pattern {
    Pattern::extract(tree, registry, &PatternConfig::default()).unwrap()
}

/// A lone `foo()` call as the whole pattern.
fn lone_call(name: &str) -> SyntaxTree {
    let mut tree = SyntaxTree::new(NodeKind::MethodCall);
    let root = tree.root();
    tree.set_scalar(root, "name", name).unwrap();
    tree
}

/// Every bound non-root pair sits under the candidate bound to its pattern parent.
fn is_topologically_consistent(
    instance: &MatchInstance,
    pattern: &SyntaxTree,
    candidate: &SyntaxTree,
) -> bool {
    instance.pairs().iter().all(|&(p, c)| match pattern.parent(p) {
        Some(pp) => instance.candidate_for(pp) == candidate.parent(c),
        None => true,
    })
}

#[test]
fn identifier_must_agree() {
    init_tracing();
    let registry = AttributeRegistry::default();
    let pattern = extract(lone_call("foo"), &registry);
    let matcher = Matcher::new(&registry, MatcherConfig::default());

    let hit = calls(&["foo"]);
    let instances = matcher.match_pattern(&pattern, &hit);
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].score(), 1.0);
    assert!(instances[0].is_legal());
    let bound = instances[0].candidate_for(pattern.before().root()).unwrap();
    assert_eq!(hit.kind(bound), NodeKind::MethodCall);

    let miss = calls(&["bar"]);
    assert!(matcher.match_pattern(&pattern, &miss).is_empty());
}

#[test]
fn wildcard_node_matches_everything() {
    init_tracing();
    let registry = AttributeRegistry::default();
    let mut pattern = extract(SyntaxTree::new(NodeKind::Block), &registry);
    pattern.abstract_with(&registry, |_, _, _, _| false);
    let matcher = Matcher::new(&registry, MatcherConfig::default());

    let small = calls(&["a", "b", "c"]);
    let rough = matcher.rough_match(&pattern, &small);
    let candidates = rough.candidates(pattern.before().root());
    assert_eq!(candidates.len(), small.len());
    assert!(candidates.iter().all(|&(_, score)| score == 1.0));
    // Equal scores keep candidate pre-order
    let order: Vec<_> = candidates.iter().map(|&(c, _)| c).collect();
    assert_eq!(order, small.preorder().collect::<Vec<_>>());
    assert_eq!(matcher.exact_match(&pattern, &small, &rough).len(), small.len());

    let names: Vec<String> = (0..60).map(|i| format!("m{i}")).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let large = calls(&names);
    assert!(large.len() > 100);
    assert_eq!(matcher.match_pattern(&pattern, &large).len(), 100);
}

#[test]
fn token_overlap_score() {
    let a: Vec<String> = ["a", "b", "c"].map(String::from).to_vec();
    let b: Vec<String> = ["a", "b", "d"].map(String::from).to_vec();
    let sim = token_similarity(&a, &b);
    assert!((sim - 0.667).abs() < 1e-3, "got {sim}");
}

#[test]
fn threshold_drops_weak_candidates() {
    init_tracing();
    let registry = AttributeRegistry::default();
    let pattern = extract(calls(&["foo"]), &registry);

    // The candidate's block tokens `foo bar baz` share one of three with `foo`
    let candidate = calls(&["foo", "bar", "baz"]);
    let strict = Matcher::new(
        &registry,
        MatcherConfig {
            threshold: 0.9,
            ..MatcherConfig::default()
        },
    );
    let rough = strict.rough_match(&pattern, &candidate);
    assert!(rough.candidates(pattern.before().root()).is_empty());
    assert!(strict.exact_match(&pattern, &candidate, &rough).is_empty());

    // At 0.4 the block stays while the `bar` and `baz` statements (score 0) go
    let loose = Matcher::new(
        &registry,
        MatcherConfig {
            threshold: 0.4,
            ..MatcherConfig::default()
        },
    );
    let rough = loose.rough_match(&pattern, &candidate);
    assert_eq!(rough.candidates(pattern.before().root()).len(), 1);
    for entry in rough.entries() {
        assert!(entry.candidates.iter().all(|&(_, s)| s >= 0.4));
        assert!(entry.candidates.windows(2).all(|w| w[0].1 >= w[1].1));
    }
    assert_eq!(loose.match_pattern(&pattern, &candidate).len(), 1);
}

#[test]
fn crossed_parents_are_rejected() {
    init_tracing();
    let registry = AttributeRegistry::default();
    let pattern = extract(calls(&["foo", "foo"]), &registry);
    let candidate = calls(&["foo", "foo"]);
    let matcher = Matcher::new(&registry, MatcherConfig::default());

    let instances = matcher.match_pattern(&pattern, &candidate);
    // Identity and the full swap; every crossed branch is cut by the parent rule
    assert_eq!(instances.len(), 2);
    for instance in &instances {
        assert!(is_topologically_consistent(instance, pattern.before(), &candidate));
    }

    let stmts: Vec<_> = pattern.before().children(pattern.before().root()).collect();
    let cand_stmts: Vec<_> = candidate.children(candidate.root()).collect();
    assert_eq!(instances[0].candidate_for(stmts[0]), Some(cand_stmts[0]));
    assert_eq!(instances[1].candidate_for(stmts[0]), Some(cand_stmts[1]));
}

#[test]
fn unbound_parents_are_let_through() {
    init_tracing();
    let registry = AttributeRegistry::default();
    let pattern = extract(calls(&["foo"]), &registry);
    let candidate = calls(&["foo", "foo"]);
    let matcher = Matcher::new(&registry, MatcherConfig::default());

    // Block tokens `foo` against `foo foo` score 2/3, above the threshold
    let instances = matcher.match_pattern(&pattern, &candidate);
    assert_eq!(instances.len(), 4);
    let discontinuous = instances
        .iter()
        .filter(|i| !is_topologically_consistent(i, pattern.before(), &candidate))
        .count();
    assert_eq!(discontinuous, 2);
}

#[test]
fn first_match_only_inspects_a_prefix() {
    init_tracing();
    let registry = AttributeRegistry::default();
    let pattern = extract(lone_call("foo"), &registry);
    let candidate = calls(&["foo", "foo", "foo"]);

    let matcher = Matcher::new(&registry, MatcherConfig::default());
    let all = matcher.match_pattern(&pattern, &candidate);
    assert_eq!(all.len(), 3);
    assert_eq!(matcher.first_match(&pattern, &candidate).as_ref(), all.first());

    let blind = Matcher::new(
        &registry,
        MatcherConfig {
            inspect_limit: 0,
            ..MatcherConfig::default()
        },
    );
    assert!(blind.first_match(&pattern, &candidate).is_none());
}

#[test]
fn candidate_tree_smaller_than_pattern() {
    init_tracing();
    let registry = AttributeRegistry::default();
    let mut tree = SyntaxTree::new(NodeKind::Block);
    let root = tree.root();
    push_call(&mut tree, root, Some("list"), "add", &["x", "y"]);
    let pattern = extract(tree, &registry);

    let matcher = Matcher::new(&registry, MatcherConfig::default());
    assert!(matcher.match_pattern(&pattern, &lone_call("add")).is_empty());
}

#[test]
fn ignored_nodes_need_no_counterpart() {
    init_tracing();
    let registry = AttributeRegistry::default();
    let mut pattern = extract(calls(&["foo", "bar"]), &registry);
    let candidate = calls(&["foo"]);
    let matcher = Matcher::new(&registry, MatcherConfig::default());

    // Five pattern nodes cannot fit into three candidate nodes
    assert!(matcher.match_pattern(&pattern, &candidate).is_empty());

    let root = pattern.before().root();
    let bar = pattern.before().children(root).nth(1).unwrap();
    let dropped: Vec<_> = pattern.before().subtree(bar).collect();
    for node in dropped {
        pattern.set_node_considered(node, false).unwrap();
    }

    let rough = matcher.rough_match(&pattern, &candidate);
    assert_eq!(rough.len(), 3);
    assert!(rough.candidates(bar).is_empty());

    let instances = matcher.match_pattern(&pattern, &candidate);
    assert_eq!(instances.len(), 1);
    let instance = &instances[0];
    assert_eq!(instance.len(), 3);
    assert_eq!(instance.candidate_for(root), Some(candidate.root()));
    assert_eq!(instance.candidate_for(bar), None);
    assert!(is_topologically_consistent(instance, pattern.before(), &candidate));
}

#[test]
fn fully_ignored_pattern_matches_nothing() {
    init_tracing();
    let registry = AttributeRegistry::default();
    let mut pattern = extract(calls(&["foo"]), &registry);
    assert_eq!(pattern.abstract_nodes_with(|_, _| false), pattern.before().len());

    let matcher = Matcher::new(&registry, MatcherConfig::default());
    assert!(matcher.rough_match(&pattern, &calls(&["foo"])).is_empty());
    assert!(matcher.match_pattern(&pattern, &calls(&["foo"])).is_empty());
}
