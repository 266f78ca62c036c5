//! The process tree: node storage, containment edges, control links, and
//! derived-set bookkeeping.
//!
//! A tree owns all its nodes in a stable directed graph (node ids survive
//! removals, which projection relies on) plus a second, independent edge
//! relation over the same vertex set for explicit control links. The three
//! derived sets of observable activities (`invokes`, `receives`, `replies`)
//! and their union are kept consistent on every structural mutation.

pub mod label;
pub mod node;

use std::fmt;

use indexmap::IndexSet;
use petgraph::stable_graph::StableDiGraph;
use petgraph::Direction;
use tracing::error;
use uuid::Uuid;

use crate::relation::RelationMatrix;
pub use label::{CommunicationLabel, Label};
pub use node::{
    ActivityId, BasicRole, ChoiceKind, Multiplicity, Node, NodeKind, SourceConstruct, SourceRef,
    RANK_DEFAULT, RANK_FIRST_CHILD,
};

/// Identifier of a node within its owning tree.
pub type NodeId = petgraph::stable_graph::NodeIndex;

/// Stable identity of a built tree, used as comparator-cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TreeId(Uuid);

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A rooted process tree with containment edges, control links, and the
/// derived basic-activity sets.
#[derive(Debug)]
pub struct ProcessTree {
    id: TreeId,
    graph: StableDiGraph<Node, ()>,
    root: NodeId,
    control_links: Vec<(NodeId, NodeId)>,
    invokes: IndexSet<NodeId>,
    receives: IndexSet<NodeId>,
    replies: IndexSet<NodeId>,
    basic: IndexSet<NodeId>,
    basic_order: Vec<NodeId>,
    process_type: Option<RelationMatrix>,
    next_number: u32,
}

impl ProcessTree {
    /// Create a tree holding only the given root node.
    pub fn new(root: Node) -> Self {
        let mut tree = Self {
            id: TreeId(Uuid::new_v4()),
            graph: StableDiGraph::new(),
            root: NodeId::new(0),
            control_links: Vec::new(),
            invokes: IndexSet::new(),
            receives: IndexSet::new(),
            replies: IndexSet::new(),
            basic: IndexSet::new(),
            basic_order: Vec::new(),
            process_type: None,
            next_number: 0,
        };
        tree.root = tree.add_node(root);
        tree
    }

    /// Stable identity of this tree.
    pub fn id(&self) -> TreeId {
        self.id
    }

    /// The root node. Exactly one, never removable.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow a node.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        self.graph
            .node_weight(id)
            .unwrap_or_else(|| panic!("node {id:?} is not part of this tree"))
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.graph
            .node_weight_mut(id)
            .unwrap_or_else(|| panic!("node {id:?} is not part of this tree"))
    }

    /// Whether `id` still belongs to this tree.
    pub fn contains(&self, id: NodeId) -> bool {
        self.graph.contains_node(id)
    }

    /// Number of nodes currently in the tree.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of containment edges currently in the tree.
    pub fn containment_edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Insert a freestanding node (no containment edge yet) into the vertex
    /// set and, if it is basic, into the derived sets. Callers attach the
    /// containment edge separately with [`attach`](Self::attach).
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        node.set_number(self.next_number);
        self.next_number += 1;
        let role = node.basic_role();
        let id = self.graph.add_node(node);
        if let Some(role) = role {
            match role {
                BasicRole::Invoke => self.invokes.insert(id),
                BasicRole::Receive => self.receives.insert(id),
                BasicRole::Reply => self.replies.insert(id),
            };
            self.basic.insert(id);
        }
        id
    }

    /// Add a containment edge from `parent` to `child`.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.graph.add_edge(parent, child, ());
    }

    /// Insert `node` as a child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.add_node(node);
        self.attach(parent, id);
        id
    }

    /// Record an explicit control link from `source` to `target`. Control
    /// links are independent of the containment structure.
    pub fn add_control_link(&mut self, source: NodeId, target: NodeId) {
        self.control_links.push((source, target));
    }

    /// The control links currently recorded.
    pub fn control_links(&self) -> &[(NodeId, NodeId)] {
        &self.control_links
    }

    /// Remove a node, its containment edges, its control links, and its
    /// derived-set entries. Children are NOT reattached; callers that splice
    /// a node out of a chain must rewire explicitly.
    ///
    /// # Panics
    /// Removing the root is a programming error.
    pub fn remove_node(&mut self, id: NodeId) {
        assert_ne!(id, self.root, "the root node cannot be removed");
        self.graph.remove_node(id);
        self.control_links.retain(|&(s, t)| s != id && t != id);
        self.invokes.shift_remove(&id);
        self.receives.shift_remove(&id);
        self.replies.shift_remove(&id);
        self.basic.shift_remove(&id);
    }

    /// Remove `id` and its entire subtree.
    pub fn remove_subtree(&mut self, id: NodeId) {
        for n in self.descendants(id) {
            self.remove_node(n);
        }
        self.remove_node(id);
    }

    /// Parent of a node. A node with more than one incoming containment edge
    /// violates the tree invariant; that is logged and treated as having no
    /// parent.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let mut incoming = self.graph.neighbors_directed(id, Direction::Incoming);
        let first = incoming.next();
        if incoming.next().is_some() {
            error!(node = %self.node(id), "node has more than one incoming containment edge");
            return None;
        }
        first
    }

    /// Snapshot of the children of a node, in diagnostic-number order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children: Vec<NodeId> = self
            .graph
            .neighbors_directed(id, Direction::Outgoing)
            .collect();
        children.sort_by_key(|&c| self.node(c).number());
        children
    }

    /// Number of outgoing containment edges.
    pub fn out_degree(&self, id: NodeId) -> usize {
        self.graph
            .neighbors_directed(id, Direction::Outgoing)
            .count()
    }

    /// All strict descendants of a node.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = self.children(id);
        while let Some(n) = stack.pop() {
            result.push(n);
            stack.extend(self.children(n));
        }
        result
    }

    /// Remove a singleton node and connect its parent directly to its single
    /// child. The caller guarantees `id` is neither the root nor a node with
    /// a loop origin and has exactly one child.
    pub fn splice_out(&mut self, id: NodeId) {
        debug_assert_eq!(self.out_degree(id), 1);
        let parent = self.parent(id);
        let child = self.children(id)[0];
        self.remove_node(id);
        if let Some(parent) = parent {
            self.attach(parent, child);
        }
    }

    /// Invoke activities ("In" in the matching literature).
    pub fn invokes(&self) -> &IndexSet<NodeId> {
        &self.invokes
    }

    /// Receive activities.
    pub fn receives(&self) -> &IndexSet<NodeId> {
        &self.receives
    }

    /// Reply activities.
    pub fn replies(&self) -> &IndexSet<NodeId> {
        &self.replies
    }

    /// All basic non-silent activities (union of the three role sets).
    pub fn basic_nodes(&self) -> &IndexSet<NodeId> {
        &self.basic
    }

    /// Basic nodes addressed by their matrix index. Valid after
    /// [`determine_process_type`](Self::determine_process_type).
    pub fn basic_order(&self) -> &[NodeId] {
        &self.basic_order
    }

    /// Reassign the dense matrix index over the current basic-node set.
    /// Required whenever basic nodes were added or removed; the previous
    /// indices are invalid after any such change.
    pub(crate) fn rebuild_basic_index(&mut self) {
        self.basic_order = self.basic.iter().copied().collect();
        for (i, id) in self.basic_order.clone().into_iter().enumerate() {
            self.node_mut(id).set_index(Some(i));
        }
    }

    /// The computed relation matrix, if inference has run.
    pub fn process_type(&self) -> Option<&RelationMatrix> {
        self.process_type
            .as_ref()
    }

    pub(crate) fn set_process_type(&mut self, matrix: RelationMatrix) {
        self.process_type = Some(matrix);
    }

    /// Relation between two basic nodes of this tree, if defined.
    pub fn relation_between(&self, a: NodeId, b: NodeId) -> Option<crate::relation::Relation> {
        let matrix = self.process_type.as_ref()?;
        let i = self.node(a).index()?;
        let j = self.node(b).index()?;
        matrix.get(i, j)
    }

    /// Recompute every node's level from the containment structure. Run
    /// after any mutation that changes ancestry (projection does this once
    /// at the end of its walk).
    pub fn recompute_levels(&mut self) {
        let root_level = self.node(self.root).level();
        let mut stack = vec![(self.root, root_level)];
        while let Some((n, level)) = stack.pop() {
            self.node_mut(n).set_level(level);
            for child in self.children(n) {
                stack.push((child, level + 1));
            }
        }
    }
}

impl fmt::Display for ProcessTree {
    /// Human-readable dump of the tree structure and the full relation
    /// matrix (with `null` where a relation is not applicable or was left
    /// undefined).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![self.root];
        while let Some(n) = stack.pop() {
            let node = self.node(n);
            writeln!(f, "== node {node} ==")?;
            writeln!(f, "{}", node.debug_string())?;
            let children = self.children(n);
            let rendered: Vec<String> = children
                .iter()
                .map(|&c| self.node(c).to_string())
                .collect();
            writeln!(f, "children: [{}]", rendered.join(", "))?;
            for child in children.into_iter().rev() {
                stack.push(child);
            }
        }

        match &self.process_type {
            None => writeln!(f, "process type not determined")?,
            Some(_) => {
                writeln!(f, "process type:")?;
                let mut sorted: Vec<NodeId> = self.basic.iter().copied().collect();
                sorted.sort_by_key(|&n| self.node(n).number());
                for &n1 in &sorted {
                    for &n2 in &sorted {
                        if n1 == n2 {
                            continue;
                        }
                        let rendered = match self.relation_between(n1, n2) {
                            Some(rel) => rel.to_string(),
                            None => "null".to_string(),
                        };
                        writeln!(f, "{} | {} | {rendered}", self.node(n1), self.node(n2))?;
                    }
                }
            }
        }
        Ok(())
    }
}
