//! Process-tree nodes.

use std::fmt;

use super::label::Label;

/// Rank of children whose parent is not a sequence.
pub const RANK_DEFAULT: u32 = 0;
/// Reserved rank for the first child of a sequence (and for synthesized
/// first children such as the receive of an internal choice branch).
pub const RANK_FIRST_CHILD: u32 = 1;

/// Identifier a source reader assigns to each construct of the original
/// process description. Opaque to the analysis; it is the key space of the
/// projection action table and the hook for re-exporting a rewritten tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ActivityId(pub u32);

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Act#{}", self.0)
    }
}

/// What kind of source construct a node was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceConstruct {
    /// An observable communication activity.
    Communication,
    /// A structured activity (sequence, parallel flow).
    Structured,
    /// A choice construct.
    Choice,
    /// A loop construct. Loop nodes are exempt from singleton
    /// simplification: their `Arbitrary` multiplicity is read from the node
    /// during relation inference and must survive projection.
    Loop,
}

/// Non-owning back-reference from an analysis node to the source construct
/// it was built from. The analysis never mutates the source through this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceRef {
    /// Reader-assigned identifier of the source construct.
    pub id: ActivityId,
    /// Construct class, used only for the loop-preservation rule.
    pub construct: SourceConstruct,
}

/// The three observable, non-silent basic activity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicRole {
    /// Calls an operation on a partner.
    Invoke,
    /// Waits for a partner to call an operation.
    Receive,
    /// Answers a previously received call.
    Reply,
}

impl fmt::Display for BasicRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasicRole::Invoke => write!(f, "invoke"),
            BasicRole::Receive => write!(f, "receive"),
            BasicRole::Reply => write!(f, "reply"),
        }
    }
}

/// Whether a choice is decided by the process itself or by its partner.
/// Both behave identically for relation inference; the flag records the
/// source classification for collaborators that re-export the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChoiceKind {
    /// Internal decision (data-driven if, message-dispatching pick).
    Internal,
    /// External decision dedicated to the partner.
    External,
}

/// Structural kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Observable leaf activity.
    Basic(BasicRole),
    /// Ordered execution of children by rank.
    Sequence,
    /// Parallel split; no ordering across children.
    And,
    /// Exclusive choice; exactly one child executes.
    Xor(ChoiceKind),
    /// Root, loop wrapper, or uninterpreted construct.
    Other,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Basic(role) => write!(f, "basic/{role}"),
            NodeKind::Sequence => write!(f, "sequence"),
            NodeKind::And => write!(f, "and"),
            NodeKind::Xor(ChoiceKind::Internal) => write!(f, "xor/internal"),
            NodeKind::Xor(ChoiceKind::External) => write!(f, "xor/external"),
            NodeKind::Other => write!(f, "other"),
        }
    }
}

/// How often a node may execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Multiplicity {
    /// Exactly once.
    One,
    /// Zero to many times, e.g. under a loop.
    Arbitrary,
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Multiplicity::One => write!(f, "one"),
            Multiplicity::Arbitrary => write!(f, "arbitrary"),
        }
    }
}

/// A vertex of the process tree.
///
/// Nodes are owned by a [`ProcessTree`](super::ProcessTree); the tree assigns
/// the diagnostic number on insertion and manages the basic-node `index`.
#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    mult: Multiplicity,
    rank: u32,
    level: u32,
    label: Label,
    origin: Option<SourceRef>,
    index: Option<usize>,
    number: u32,
}

impl Node {
    /// A structural node carrying the empty label.
    pub fn structural(kind: NodeKind, mult: Multiplicity, rank: u32, level: u32) -> Self {
        debug_assert!(!matches!(kind, NodeKind::Basic(_)));
        Self {
            kind,
            mult,
            rank,
            level,
            label: Label::Empty,
            origin: None,
            index: None,
            number: 0,
        }
    }

    /// A basic communication node.
    pub fn communication(
        role: BasicRole,
        label: super::label::CommunicationLabel,
        mult: Multiplicity,
        rank: u32,
        level: u32,
    ) -> Self {
        Self {
            kind: NodeKind::Basic(role),
            mult,
            rank,
            level,
            label: Label::Communication(label),
            origin: None,
            index: None,
            number: 0,
        }
    }

    /// Attach the back-reference to the source construct.
    #[must_use]
    pub fn with_origin(mut self, origin: SourceRef) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Structural kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The basic role, for basic nodes.
    pub fn basic_role(&self) -> Option<BasicRole> {
        match self.kind {
            NodeKind::Basic(role) => Some(role),
            _ => None,
        }
    }

    /// Execution multiplicity.
    pub fn multiplicity(&self) -> Multiplicity {
        self.mult
    }

    /// Position among sequence siblings; meaningful only when the parent is
    /// a sequence.
    pub fn rank(&self) -> u32 {
        self.rank
    }

    /// Depth from the root (root = 0).
    pub fn level(&self) -> u32 {
        self.level
    }

    pub(crate) fn set_level(&mut self, level: u32) {
        self.level = level;
    }

    /// Node label.
    pub fn label(&self) -> &Label {
        &self.label
    }

    /// Back-reference to the source construct, if any. Nodes created by the
    /// analysis itself (choice-branch sequence wrappers, aggregation
    /// replacements) have none.
    pub fn origin(&self) -> Option<SourceRef> {
        self.origin
    }

    /// Whether this node stems from a loop construct.
    pub fn is_loop_origin(&self) -> bool {
        self.origin
            .is_some_and(|o| o.construct == SourceConstruct::Loop)
    }

    /// Dense index into the relation matrix; assigned to basic nodes only,
    /// invalidated whenever the basic-node set changes.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: Option<usize>) {
        self.index = index;
    }

    /// Diagnostic number assigned by the owning tree.
    pub fn number(&self) -> u32 {
        self.number
    }

    pub(crate) fn set_number(&mut self, number: u32) {
        self.number = number;
    }

    /// One-line debug rendering used by the tree dump.
    pub fn debug_string(&self) -> String {
        format!(
            "N{} -- label: {} | kind: {} | mult: {} | rank: {}",
            self.number, self.label, self.kind, self.mult, self.rank
        )
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.number)
    }
}
