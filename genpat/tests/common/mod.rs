#![allow(dead_code)]

use genpat::{NodeId, NodeKind, SyntaxTree};

/// Install a test-writer subscriber once; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Append `target.name(args...);` to a block and return the call node.
pub fn push_call(
    tree: &mut SyntaxTree,
    block: NodeId,
    target: Option<&str>,
    name: &str,
    args: &[&str],
) -> NodeId {
    let stmt = tree
        .attach(block, "statements", NodeKind::ExpressionStatement)
        .unwrap();
    let call = tree.attach(stmt, "expression", NodeKind::MethodCall).unwrap();
    tree.set_scalar(call, "name", name).unwrap();
    if let Some(target) = target {
        tree.attach_name(call, "target", target).unwrap();
    }
    for arg in args {
        tree.attach_name(call, "arguments", arg).unwrap();
    }
    call
}

/// A block of argument-less calls `a(); b(); ...`.
pub fn calls(names: &[&str]) -> SyntaxTree {
    let mut tree = SyntaxTree::new(NodeKind::Block);
    let root = tree.root();
    for name in names {
        push_call(&mut tree, root, None, name, &[]);
    }
    tree
}

/// `void <name>() { <body> }` where each body entry is a call name.
pub fn method(name: &str, body: &[&str]) -> SyntaxTree {
    let mut tree = SyntaxTree::new(NodeKind::MethodDeclaration);
    let root = tree.root();
    tree.attach_leaf(root, "return_type", NodeKind::PrimitiveType, "void")
        .unwrap();
    tree.attach_name(root, "name", name).unwrap();
    let block = tree.attach(root, "body", NodeKind::Block).unwrap();
    for call in body {
        push_call(&mut tree, block, None, call, &[]);
    }
    tree
}

/// The method body of a tree built by [`method`].
pub fn body(tree: &SyntaxTree) -> NodeId {
    tree.children_in(tree.root(), "body").next().unwrap()
}

/// The nth statement of a block.
pub fn statement(tree: &SyntaxTree, block: NodeId, n: usize) -> NodeId {
    tree.children_in(block, "statements").nth(n).unwrap()
}
