//! Shared fixture builder for integration tests: a compact shape language
//! for assembling process trees without going through a reader.
#![allow(dead_code)]

use procmatch_core::{
    ActivityId, BasicRole, ChoiceKind, CommunicationLabel, Multiplicity, Node, NodeId, NodeKind,
    ProcessTree, SourceConstruct, SourceRef, RANK_DEFAULT, RANK_FIRST_CHILD,
};

/// Tree shape description.
#[derive(Debug, Clone)]
pub enum Shape {
    Invoke(&'static str),
    Receive(&'static str),
    Reply(&'static str),
    Seq(Vec<Shape>),
    Flow(Vec<Shape>),
    Xor(Vec<Shape>),
    Loop(Box<Shape>),
}

/// Build a tree from a shape. The root is an `Other` wrapper, as a reader
/// would produce it.
pub fn build(shape: &Shape) -> ProcessTree {
    let mut tree = ProcessTree::new(Node::structural(
        NodeKind::Other,
        Multiplicity::One,
        RANK_DEFAULT,
        0,
    ));
    let root = tree.root();
    let mut next_id = 0u32;
    add(
        &mut tree,
        root,
        shape,
        Multiplicity::One,
        RANK_DEFAULT,
        1,
        &mut next_id,
    );
    tree
}

/// Build and analyze in one step.
pub fn analyzed(shape: &Shape) -> ProcessTree {
    let mut tree = build(shape);
    tree.determine_process_type();
    tree
}

fn communication(role: BasicRole, op: &str, mult: Multiplicity, rank: u32, level: u32) -> Node {
    Node::communication(
        role,
        CommunicationLabel::new("partner", "link", op, None),
        mult,
        rank,
        level,
    )
}

fn add(
    tree: &mut ProcessTree,
    parent: NodeId,
    shape: &Shape,
    mult: Multiplicity,
    rank: u32,
    level: u32,
    next_id: &mut u32,
) -> NodeId {
    let fresh = |next_id: &mut u32, construct| {
        let id = ActivityId(*next_id);
        *next_id += 1;
        SourceRef { id, construct }
    };
    match shape {
        Shape::Invoke(op) => {
            let origin = fresh(next_id, SourceConstruct::Communication);
            tree.add_child(
                parent,
                communication(BasicRole::Invoke, op, mult, rank, level).with_origin(origin),
            )
        }
        Shape::Receive(op) => {
            let origin = fresh(next_id, SourceConstruct::Communication);
            tree.add_child(
                parent,
                communication(BasicRole::Receive, op, mult, rank, level).with_origin(origin),
            )
        }
        Shape::Reply(op) => {
            let origin = fresh(next_id, SourceConstruct::Communication);
            tree.add_child(
                parent,
                communication(BasicRole::Reply, op, mult, rank, level).with_origin(origin),
            )
        }
        Shape::Seq(children) => {
            let origin = fresh(next_id, SourceConstruct::Structured);
            let node = tree.add_child(
                parent,
                Node::structural(NodeKind::Sequence, mult, rank, level).with_origin(origin),
            );
            for (k, child) in children.iter().enumerate() {
                add(
                    tree,
                    node,
                    child,
                    mult,
                    RANK_FIRST_CHILD + k as u32,
                    level + 1,
                    next_id,
                );
            }
            node
        }
        Shape::Flow(children) => {
            let origin = fresh(next_id, SourceConstruct::Structured);
            let node = tree.add_child(
                parent,
                Node::structural(NodeKind::And, mult, rank, level).with_origin(origin),
            );
            for (k, child) in children.iter().enumerate() {
                add(
                    tree,
                    node,
                    child,
                    mult,
                    RANK_FIRST_CHILD + k as u32,
                    level + 1,
                    next_id,
                );
            }
            node
        }
        Shape::Xor(children) => {
            let origin = fresh(next_id, SourceConstruct::Choice);
            let node = tree.add_child(
                parent,
                Node::structural(NodeKind::Xor(ChoiceKind::Internal), mult, rank, level)
                    .with_origin(origin),
            );
            for (k, child) in children.iter().enumerate() {
                add(
                    tree,
                    node,
                    child,
                    mult,
                    RANK_FIRST_CHILD + k as u32,
                    level + 1,
                    next_id,
                );
            }
            node
        }
        Shape::Loop(body) => {
            let origin = fresh(next_id, SourceConstruct::Loop);
            let node = tree.add_child(
                parent,
                Node::structural(NodeKind::Other, mult, rank, level).with_origin(origin),
            );
            add(
                tree,
                node,
                body,
                Multiplicity::Arbitrary,
                RANK_DEFAULT,
                level + 1,
                next_id,
            );
            node
        }
    }
}
