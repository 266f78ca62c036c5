//! Tree projection: externally driven simplification of a process tree
//! before relation inference.
//!
//! A projection is described by an [`ActionTable`] mapping source-activity
//! identity to an [`Action`]. The walk is a single depth-first post-order
//! pass; the table is consulted exactly once per node that is still present
//! when the walk reaches it, and removed subtrees are never revisited.
//! Nodes with no action that end up with a single child are spliced out,
//! except loop nodes, whose multiplicity the relation inference reads from
//! the node itself.
//!
//! Projection must run to completion before relation inference starts; the
//! LCA preprocessing pass requires the final node set.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::tree::{ActivityId, BasicRole, CommunicationLabel, Node, NodeId, ProcessTree};

/// Replacement descriptor for an aggregation: the single basic activity
/// standing in for the removed subtree.
#[derive(Debug, Clone)]
pub struct Replacement {
    /// Kind of the replacement activity.
    pub role: BasicRole,
    /// Matching identity of the replacement activity.
    pub label: CommunicationLabel,
}

/// Projection action for one source activity.
#[derive(Debug, Clone)]
pub enum Action {
    /// Remove the subtree; the activity does not exist in the projected view.
    Hide,
    /// Remove the subtree; the activity was taken out of scope. Structurally
    /// identical to [`Action::Hide`], distinct in the source vocabulary.
    Omit,
    /// Replace the subtree by a single basic activity.
    Aggregate(Replacement),
}

/// Resolved node-identity → action table, keyed by the source-activity ids
/// carried in node origins.
#[derive(Debug, Clone, Default)]
pub struct ActionTable {
    actions: HashMap<ActivityId, Action>,
}

impl ActionTable {
    /// An empty table (projection becomes pure tree simplification).
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the action for a source activity.
    pub fn insert(&mut self, id: ActivityId, action: Action) {
        self.actions.insert(id, action);
    }

    /// Number of registered actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the table holds no actions.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The action for a node, looked up through its origin. Nodes without an
    /// origin (analysis-created) never match.
    pub fn for_node(&self, node: &Node) -> Option<&Action> {
        self.actions.get(&node.origin()?.id)
    }
}

struct Frame {
    node: NodeId,
    children: Vec<NodeId>,
    next: usize,
}

impl Frame {
    fn new(tree: &ProcessTree, node: NodeId) -> Self {
        // snapshot before descending: the walk must not iterate an edge set
        // it is mutating
        Self {
            node,
            children: tree.children(node),
            next: 0,
        }
    }
}

/// Apply the action table to the tree.
///
/// Depth-first post-order with an explicit work stack. Children are fully
/// processed (including their own possible removal) before their parent's
/// singleton simplification is evaluated. Running the same table again on
/// the projected tree is a no-op.
pub fn apply(tree: &mut ProcessTree, actions: &ActionTable) {
    let root = tree.root();
    if actions.for_node(tree.node(root)).is_some() {
        warn!("projection action on the root is not supported; ignoring");
    }

    let mut stack = vec![Frame::new(tree, root)];
    while let Some(top) = stack.last_mut() {
        if top.next < top.children.len() {
            let child = top.children[top.next];
            top.next += 1;
            match actions.for_node(tree.node(child)) {
                Some(Action::Hide) => {
                    debug!(node = %tree.node(child), "hiding");
                    tree.remove_subtree(child);
                }
                Some(Action::Omit) => {
                    debug!(node = %tree.node(child), "omitting");
                    tree.remove_subtree(child);
                }
                Some(Action::Aggregate(replacement)) => {
                    debug!(node = %tree.node(child), "aggregating");
                    aggregate(tree, child, replacement);
                }
                None => stack.push(Frame::new(tree, child)),
            }
            continue;
        }

        let node = top.node;
        let is_root = stack.len() == 1;
        stack.pop();
        if !is_root && tree.out_degree(node) == 1 && !tree.node(node).is_loop_origin() {
            debug!(node = %tree.node(node), "removing singleton node");
            tree.splice_out(node);
        }
    }

    tree.recompute_levels();
}

/// Replace `node`'s subtree by one basic activity built from the
/// replacement descriptor, inheriting the removed node's multiplicity,
/// rank, and level.
fn aggregate(tree: &mut ProcessTree, node: NodeId, replacement: &Replacement) {
    let Some(parent) = tree.parent(node) else {
        warn!(node = %tree.node(node), "aggregate target has no parent; removing only");
        tree.remove_subtree(node);
        return;
    };
    let (mult, rank, level) = {
        let n = tree.node(node);
        (n.multiplicity(), n.rank(), n.level())
    };
    tree.remove_subtree(node);

    let new_node = Node::communication(
        replacement.role,
        replacement.label.clone(),
        mult,
        rank,
        level,
    );
    let id = tree.add_node(new_node);
    tree.attach(parent, id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{
        ChoiceKind, Multiplicity, NodeKind, SourceConstruct, SourceRef, RANK_DEFAULT,
        RANK_FIRST_CHILD,
    };

    fn origin(id: u32, construct: SourceConstruct) -> SourceRef {
        SourceRef {
            id: ActivityId(id),
            construct,
        }
    }

    fn structural(kind: NodeKind, rank: u32, level: u32) -> Node {
        Node::structural(kind, Multiplicity::One, rank, level)
    }

    fn comm(role: BasicRole, op: &str, rank: u32, level: u32) -> Node {
        Node::communication(
            role,
            CommunicationLabel::new("r", "plt", op, None),
            Multiplicity::One,
            rank,
            level,
        )
    }

    fn root_tree() -> ProcessTree {
        ProcessTree::new(Node::structural(
            NodeKind::Other,
            Multiplicity::One,
            RANK_DEFAULT,
            0,
        ))
    }

    #[test]
    fn hide_removes_the_whole_subtree() {
        let mut tree = root_tree();
        let root = tree.root();
        let seq = tree.add_child(root, structural(NodeKind::Sequence, RANK_DEFAULT, 1));
        let flow = tree.add_child(
            seq,
            structural(NodeKind::And, RANK_FIRST_CHILD, 2).with_origin(origin(
                7,
                SourceConstruct::Structured,
            )),
        );
        tree.add_child(flow, comm(BasicRole::Invoke, "a", RANK_FIRST_CHILD, 3));
        tree.add_child(flow, comm(BasicRole::Invoke, "b", RANK_FIRST_CHILD + 1, 3));
        let keep = tree.add_child(seq, comm(BasicRole::Invoke, "c", RANK_FIRST_CHILD + 1, 2));

        let mut actions = ActionTable::new();
        actions.insert(ActivityId(7), Action::Hide);
        apply(&mut tree, &actions);

        assert!(tree.contains(keep));
        assert_eq!(tree.invokes().len(), 1);
        // seq became a singleton and was spliced out as well
        assert!(!tree.contains(flow));
        assert!(!tree.contains(seq));
        assert_eq!(tree.parent(keep), Some(root));
    }

    #[test]
    fn aggregate_replaces_receive_subtree_with_invoke() {
        let mut tree = root_tree();
        let root = tree.root();
        let seq = tree.add_child(root, structural(NodeKind::Sequence, RANK_DEFAULT, 1));
        let inner = tree.add_child(
            seq,
            structural(NodeKind::Sequence, RANK_FIRST_CHILD, 2).with_origin(origin(
                3,
                SourceConstruct::Structured,
            )),
        );
        tree.add_child(inner, comm(BasicRole::Receive, "start", RANK_FIRST_CHILD, 3));
        tree.add_child(
            inner,
            comm(BasicRole::Receive, "data", RANK_FIRST_CHILD + 1, 3),
        );
        tree.add_child(seq, comm(BasicRole::Invoke, "done", RANK_FIRST_CHILD + 1, 2));

        let edges_before = tree.containment_edge_count();
        let mut actions = ActionTable::new();
        actions.insert(
            ActivityId(3),
            Action::Aggregate(Replacement {
                role: BasicRole::Invoke,
                label: CommunicationLabel::new("r", "plt", "combined", None),
            }),
        );
        apply(&mut tree, &actions);

        assert_eq!(tree.receives().len(), 0);
        assert_eq!(tree.invokes().len(), 2);
        // subtree of 3 nodes replaced by 1: edge count shrinks by 2
        assert_eq!(tree.containment_edge_count(), edges_before - 2);

        let added = tree
            .invokes()
            .iter()
            .find(|&&n| {
                tree.node(n)
                    .label()
                    .as_communication()
                    .is_some_and(|l| l.operation == "combined")
            })
            .copied()
            .expect("replacement node present");
        let n = tree.node(added);
        assert_eq!(n.rank(), RANK_FIRST_CHILD);
        assert_eq!(n.level(), 2);
        assert_eq!(tree.parent(added), Some(seq));
        assert!(n.origin().is_none());
    }

    #[test]
    fn singleton_loop_nodes_are_preserved() {
        let mut tree = root_tree();
        let root = tree.root();
        let seq = tree.add_child(root, structural(NodeKind::Sequence, RANK_DEFAULT, 1));
        let lp = tree.add_child(
            seq,
            Node::structural(NodeKind::Other, Multiplicity::One, RANK_FIRST_CHILD, 2)
                .with_origin(origin(5, SourceConstruct::Loop)),
        );
        let body = tree.add_child(
            lp,
            Node::communication(
                BasicRole::Invoke,
                CommunicationLabel::new("r", "plt", "poll", None),
                Multiplicity::Arbitrary,
                RANK_DEFAULT,
                3,
            ),
        );
        tree.add_child(seq, comm(BasicRole::Invoke, "done", RANK_FIRST_CHILD + 1, 2));

        apply(&mut tree, &ActionTable::new());

        // the loop wrapper is a singleton but must survive
        assert!(tree.contains(lp));
        assert_eq!(tree.parent(body), Some(lp));
    }

    #[test]
    fn projection_is_idempotent() {
        let mut tree = root_tree();
        let root = tree.root();
        let seq = tree.add_child(root, structural(NodeKind::Sequence, RANK_DEFAULT, 1));
        let hidden = tree.add_child(
            seq,
            structural(NodeKind::And, RANK_FIRST_CHILD, 2).with_origin(origin(
                1,
                SourceConstruct::Structured,
            )),
        );
        tree.add_child(hidden, comm(BasicRole::Invoke, "a", RANK_FIRST_CHILD, 3));
        let agg = tree.add_child(
            seq,
            structural(NodeKind::Sequence, RANK_FIRST_CHILD + 1, 2).with_origin(origin(
                2,
                SourceConstruct::Structured,
            )),
        );
        tree.add_child(agg, comm(BasicRole::Receive, "r1", RANK_FIRST_CHILD, 3));
        tree.add_child(agg, comm(BasicRole::Receive, "r2", RANK_FIRST_CHILD + 1, 3));
        tree.add_child(seq, comm(BasicRole::Invoke, "z", RANK_FIRST_CHILD + 2, 2));

        let mut actions = ActionTable::new();
        actions.insert(ActivityId(1), Action::Omit);
        actions.insert(
            ActivityId(2),
            Action::Aggregate(Replacement {
                role: BasicRole::Reply,
                label: CommunicationLabel::new("r", "plt", "merged", None),
            }),
        );

        apply(&mut tree, &actions);
        let nodes_after_first = tree.node_count();
        let edges_after_first = tree.containment_edge_count();

        apply(&mut tree, &actions);
        assert_eq!(tree.node_count(), nodes_after_first);
        assert_eq!(tree.containment_edge_count(), edges_after_first);
    }

    #[test]
    fn action_on_choice_branch_wrapper_is_unreachable_after_removal() {
        // removing a parent subtree must not revisit its children even when
        // they carry their own actions
        let mut tree = root_tree();
        let root = tree.root();
        let xor = tree.add_child(
            root,
            Node::structural(
                NodeKind::Xor(ChoiceKind::Internal),
                Multiplicity::One,
                RANK_DEFAULT,
                1,
            )
            .with_origin(origin(1, SourceConstruct::Choice)),
        );
        tree.add_child(
            xor,
            comm(BasicRole::Invoke, "inner", RANK_FIRST_CHILD, 2)
                .with_origin(origin(2, SourceConstruct::Communication)),
        );
        tree.add_child(root, comm(BasicRole::Invoke, "other", RANK_DEFAULT, 1));

        let mut actions = ActionTable::new();
        actions.insert(ActivityId(1), Action::Hide);
        // would aggregate if it were ever visited
        actions.insert(
            ActivityId(2),
            Action::Aggregate(Replacement {
                role: BasicRole::Invoke,
                label: CommunicationLabel::new("r", "plt", "ghost", None),
            }),
        );

        apply(&mut tree, &actions);
        assert_eq!(tree.invokes().len(), 1);
    }
}
