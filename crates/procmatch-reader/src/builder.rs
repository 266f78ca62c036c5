//! Translation of a process description into the analysis tree.
//!
//! Construct rules:
//! - invoke/receive/reply become basic nodes with the communication label;
//! - sequence/flow become `Sequence`/`And` nodes, children ranked in order;
//! - a pick becomes a choice node; with an internal decision each message
//!   branch is wrapped in a sequence of the receiving activity and the
//!   branch body, with an external decision the receive is dropped because
//!   the choice is dedicated to the partner;
//! - alarm branches are internal and contribute only their body, wrapped in
//!   a sequence;
//! - the three loop forms become `Other` nodes with a loop origin and give
//!   their body arbitrary multiplicity;
//! - scopes add no meaning and connect their body straight through;
//! - links are resolved by activity name into control-flow edges after the
//!   walk; unresolved endpoints are logged and skipped.

use std::collections::HashMap;

use tracing::warn;

use procmatch_core::{
    ActivityId, BasicRole, ChoiceKind, CommunicationLabel, Multiplicity, Node, NodeId, NodeKind,
    ProcessTree, SourceConstruct, SourceRef, RANK_DEFAULT, RANK_FIRST_CHILD,
};

use crate::description::{resolve_status, ActivityDef, ProcessDescription, Status};

/// A tree built from a description, plus the name table needed to resolve
/// action-list and link references against it.
#[derive(Debug)]
pub struct BuiltProcess {
    /// The analysis tree.
    pub tree: ProcessTree,
    named: HashMap<String, ActivityId>,
}

impl BuiltProcess {
    /// Resolve a reference expression (an activity name) to the identifier
    /// carried in node origins.
    pub fn resolve(&self, reference: &str) -> Option<ActivityId> {
        self.named.get(reference).copied()
    }
}

struct Builder {
    tree: ProcessTree,
    named: HashMap<String, ActivityId>,
    by_name: HashMap<String, NodeId>,
    next_id: u32,
}

struct WorkItem<'a> {
    def: &'a ActivityDef,
    parent: NodeId,
    mult: Multiplicity,
    rank: u32,
}

impl Builder {
    fn fresh(&mut self, construct: SourceConstruct) -> SourceRef {
        let id = ActivityId(self.next_id);
        self.next_id += 1;
        SourceRef { id, construct }
    }

    fn register(&mut self, name: Option<&str>, origin: SourceRef, node: NodeId) {
        if let Some(name) = name {
            self.named.insert(name.to_string(), origin.id);
            self.by_name.insert(name.to_string(), node);
        }
    }

    fn child_level(&self, parent: NodeId) -> u32 {
        self.tree.node(parent).level() + 1
    }

    fn add_communication(
        &mut self,
        role: BasicRole,
        label: CommunicationLabel,
        name: Option<&str>,
        parent: NodeId,
        mult: Multiplicity,
        rank: u32,
    ) -> NodeId {
        let origin = self.fresh(SourceConstruct::Communication);
        let level = self.child_level(parent);
        let node = self.tree.add_child(
            parent,
            Node::communication(role, label, mult, rank, level).with_origin(origin),
        );
        self.register(name, origin, node);
        node
    }

    fn add_structural(
        &mut self,
        kind: NodeKind,
        construct: SourceConstruct,
        name: Option<&str>,
        parent: NodeId,
        mult: Multiplicity,
        rank: u32,
    ) -> NodeId {
        let origin = self.fresh(construct);
        let level = self.child_level(parent);
        let node = self.tree.add_child(
            parent,
            Node::structural(kind, mult, rank, level).with_origin(origin),
        );
        self.register(name, origin, node);
        node
    }

    /// Handle one activity; pushes nested activities onto the work stack.
    fn handle<'a>(&mut self, item: WorkItem<'a>, stack: &mut Vec<WorkItem<'a>>) {
        let WorkItem {
            def,
            parent,
            mult,
            rank,
        } = item;
        match def {
            ActivityDef::Invoke(c) => {
                let label = CommunicationLabel::new(
                    c.role.clone(),
                    c.partner_link_type.clone(),
                    c.operation.clone(),
                    c.name.clone(),
                );
                self.add_communication(BasicRole::Invoke, label, c.name.as_deref(), parent, mult, rank);
            }
            ActivityDef::Receive(c) => {
                let label = CommunicationLabel::new(
                    c.role.clone(),
                    c.partner_link_type.clone(),
                    c.operation.clone(),
                    c.name.clone(),
                );
                self.add_communication(BasicRole::Receive, label, c.name.as_deref(), parent, mult, rank);
            }
            ActivityDef::Reply(c) => {
                let label = CommunicationLabel::new(
                    c.role.clone(),
                    c.partner_link_type.clone(),
                    c.operation.clone(),
                    c.name.clone(),
                );
                self.add_communication(BasicRole::Reply, label, c.name.as_deref(), parent, mult, rank);
            }
            ActivityDef::Sequence { name, activities } => {
                let node = self.add_structural(
                    NodeKind::Sequence,
                    SourceConstruct::Structured,
                    name.as_deref(),
                    parent,
                    mult,
                    rank,
                );
                for (k, child) in activities.iter().enumerate().rev() {
                    stack.push(WorkItem {
                        def: child,
                        parent: node,
                        mult,
                        rank: RANK_FIRST_CHILD + k as u32,
                    });
                }
            }
            ActivityDef::Flow { name, activities } => {
                let node = self.add_structural(
                    NodeKind::And,
                    SourceConstruct::Structured,
                    name.as_deref(),
                    parent,
                    mult,
                    rank,
                );
                for (k, child) in activities.iter().enumerate().rev() {
                    stack.push(WorkItem {
                        def: child,
                        parent: node,
                        mult,
                        rank: RANK_FIRST_CHILD + k as u32,
                    });
                }
            }
            ActivityDef::Pick {
                name,
                status,
                on_message,
                on_alarm,
            } => {
                let external = resolve_status(status.as_deref()) == Status::ExternalChoice;
                let kind = if external {
                    ChoiceKind::External
                } else {
                    ChoiceKind::Internal
                };
                let node = self.add_structural(
                    NodeKind::Xor(kind),
                    SourceConstruct::Choice,
                    name.as_deref(),
                    parent,
                    mult,
                    rank,
                );
                let mut pending: Vec<WorkItem<'a>> = Vec::new();
                for branch in on_message {
                    if external {
                        // the receiving message is dropped, the decision is
                        // dedicated to the partner
                        pending.push(WorkItem {
                            def: &branch.activity,
                            parent: node,
                            mult,
                            rank,
                        });
                    } else {
                        // internal decision: the branch is a sequence of the
                        // receive and the branch body
                        let level = self.child_level(node);
                        let seq = self.tree.add_child(
                            node,
                            Node::structural(NodeKind::Sequence, mult, RANK_DEFAULT, level),
                        );
                        let label = CommunicationLabel::new(
                            branch.role.clone(),
                            branch.partner_link_type.clone(),
                            branch.operation.clone(),
                            branch.name.clone(),
                        );
                        self.add_communication(
                            BasicRole::Receive,
                            label,
                            branch.name.as_deref(),
                            seq,
                            mult,
                            RANK_FIRST_CHILD,
                        );
                        pending.push(WorkItem {
                            def: &branch.activity,
                            parent: seq,
                            mult,
                            rank: RANK_FIRST_CHILD + 1,
                        });
                    }
                }
                for branch in on_alarm {
                    // the alarm itself is internal and produces no node
                    let level = self.child_level(node);
                    let seq = self.tree.add_child(
                        node,
                        Node::structural(NodeKind::Sequence, mult, RANK_DEFAULT, level),
                    );
                    pending.push(WorkItem {
                        def: &branch.activity,
                        parent: seq,
                        mult,
                        rank: RANK_FIRST_CHILD,
                    });
                }
                for item in pending.into_iter().rev() {
                    stack.push(item);
                }
            }
            ActivityDef::If {
                name,
                status,
                then,
                else_if,
                otherwise,
            } => {
                let external = resolve_status(status.as_deref()) == Status::ExternalChoice;
                let kind = if external {
                    ChoiceKind::External
                } else {
                    ChoiceKind::Internal
                };
                let node = self.add_structural(
                    NodeKind::Xor(kind),
                    SourceConstruct::Choice,
                    name.as_deref(),
                    parent,
                    mult,
                    rank,
                );
                let mut branch_rank = RANK_FIRST_CHILD;
                let mut branches: Vec<&ActivityDef> = vec![then.as_ref()];
                branches.extend(else_if.iter());
                if let Some(otherwise) = otherwise {
                    branches.push(otherwise.as_ref());
                }
                let ranked: Vec<(u32, &ActivityDef)> = branches
                    .into_iter()
                    .map(|b| {
                        let r = branch_rank;
                        branch_rank += 1;
                        (r, b)
                    })
                    .collect();
                for (r, branch) in ranked.into_iter().rev() {
                    stack.push(WorkItem {
                        def: branch,
                        parent: node,
                        mult,
                        rank: r,
                    });
                }
            }
            ActivityDef::While { name, activity }
            | ActivityDef::RepeatUntil { name, activity }
            | ActivityDef::ForEach { name, activity } => {
                let node = self.add_structural(
                    NodeKind::Other,
                    SourceConstruct::Loop,
                    name.as_deref(),
                    parent,
                    mult,
                    rank,
                );
                stack.push(WorkItem {
                    def: activity,
                    parent: node,
                    mult: Multiplicity::Arbitrary,
                    rank: RANK_DEFAULT,
                });
            }
            ActivityDef::Scope { activity, .. } => {
                // transparent: connect the body straight to the parent
                stack.push(WorkItem {
                    def: activity,
                    parent,
                    mult,
                    rank,
                });
            }
        }
    }
}

/// Build the analysis tree for a description.
pub fn build_tree(description: &ProcessDescription) -> BuiltProcess {
    let mut builder = Builder {
        tree: ProcessTree::new(Node::structural(
            NodeKind::Other,
            Multiplicity::One,
            RANK_DEFAULT,
            0,
        )),
        named: HashMap::new(),
        by_name: HashMap::new(),
        next_id: 0,
    };
    let root = builder.tree.root();

    let mut stack = vec![WorkItem {
        def: &description.activity,
        parent: root,
        mult: Multiplicity::One,
        rank: RANK_DEFAULT,
    }];
    while let Some(item) = stack.pop() {
        builder.handle(item, &mut stack);
    }

    for link in &description.links {
        match (
            builder.by_name.get(&link.source),
            builder.by_name.get(&link.target),
        ) {
            (Some(&source), Some(&target)) => builder.tree.add_control_link(source, target),
            _ => warn!(
                process = %description.name,
                source = %link.source,
                target = %link.target,
                "could not resolve link endpoints, skipping link"
            ),
        }
    }

    BuiltProcess {
        tree: builder.tree,
        named: builder.named,
    }
}
