//! Node labels.
//!
//! Structural nodes carry the empty label; basic communication activities
//! carry a [`CommunicationLabel`]. Two communication labels are equal when
//! their role, partner-link type, and operation agree; the optional `name`
//! is descriptive only and excluded from equality and hashing, which is what
//! makes cross-tree activity matching name-independent.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Label of a process-tree node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    /// Structural node with no observable behavior.
    Empty,
    /// Observable communication activity.
    Communication(CommunicationLabel),
}

impl Label {
    /// The communication label, if this is a communication node.
    pub fn as_communication(&self) -> Option<&CommunicationLabel> {
        match self {
            Label::Empty => None,
            Label::Communication(label) => Some(label),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Empty => write!(f, "-"),
            Label::Communication(label) => label.fmt(f),
        }
    }
}

/// Matching identity of a communication activity.
#[derive(Debug, Clone)]
pub struct CommunicationLabel {
    /// Partner role the activity communicates under.
    pub role: String,
    /// Partner-link type joining the two roles.
    pub partner_link_type: String,
    /// Operation invoked or served.
    pub operation: String,
    /// Descriptive activity name; not part of the matching identity.
    pub name: Option<String>,
}

impl CommunicationLabel {
    /// Create a label from its matching identity and an optional name.
    pub fn new(
        role: impl Into<String>,
        partner_link_type: impl Into<String>,
        operation: impl Into<String>,
        name: Option<String>,
    ) -> Self {
        Self {
            role: role.into(),
            partner_link_type: partner_link_type.into(),
            operation: operation.into(),
            name,
        }
    }
}

// name is excluded: labels match on role/partner-link-type/operation only
impl PartialEq for CommunicationLabel {
    fn eq(&self, other: &Self) -> bool {
        self.role == other.role
            && self.partner_link_type == other.partner_link_type
            && self.operation == other.operation
    }
}

impl Eq for CommunicationLabel {}

impl Hash for CommunicationLabel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.role.hash(state);
        self.partner_link_type.hash(state);
        self.operation.hash(state);
    }
}

impl fmt::Display for CommunicationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.partner_link_type, self.role, self.operation
        )
    }
}
