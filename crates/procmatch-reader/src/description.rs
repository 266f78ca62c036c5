//! Serde model of a process description.
//!
//! This is the concrete source syntax the analysis core is agnostic to: a
//! JSON document with one root activity, optional point-to-point links
//! between named activities, and optional per-activity status metadata.

use serde::Deserialize;
use tracing::warn;

/// A complete process description.
#[derive(Debug, Deserialize)]
pub struct ProcessDescription {
    /// Process name, for diagnostics only.
    pub name: String,
    /// Explicit control links between named activities.
    #[serde(default)]
    pub links: Vec<LinkDef>,
    /// The root activity.
    pub activity: ActivityDef,
}

/// A control link from one named activity to another.
#[derive(Debug, Deserialize)]
pub struct LinkDef {
    /// Name of the source activity.
    pub source: String,
    /// Name of the target activity.
    pub target: String,
}

/// Matching identity of a communication activity.
#[derive(Debug, Deserialize)]
pub struct CommunicationDef {
    /// Partner role.
    pub role: String,
    /// Partner-link type.
    pub partner_link_type: String,
    /// Operation name.
    pub operation: String,
    /// Optional activity name (reference target for links and actions).
    #[serde(default)]
    pub name: Option<String>,
}

/// One message branch of a pick: the receiving identity plus the nested
/// activity executed when that message arrives.
#[derive(Debug, Deserialize)]
pub struct MessageBranch {
    /// Partner role of the received message.
    pub role: String,
    /// Partner-link type of the received message.
    pub partner_link_type: String,
    /// Operation of the received message.
    pub operation: String,
    /// Optional branch name.
    #[serde(default)]
    pub name: Option<String>,
    /// Activity executed after the message arrived.
    pub activity: Box<ActivityDef>,
}

/// One alarm branch of a pick: a timeout alternative. The alarm itself is
/// internal and produces no node; only the nested activity matters.
#[derive(Debug, Deserialize)]
pub struct AlarmBranch {
    /// Activity executed when the alarm fires.
    pub activity: Box<ActivityDef>,
}

/// An activity of the process description.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityDef {
    /// Call an operation on a partner.
    Invoke(CommunicationDef),
    /// Wait for a partner to call an operation.
    Receive(CommunicationDef),
    /// Answer a previously received call.
    Reply(CommunicationDef),
    /// Ordered execution.
    Sequence {
        /// Optional activity name.
        #[serde(default)]
        name: Option<String>,
        /// Children in execution order.
        activities: Vec<ActivityDef>,
    },
    /// Parallel execution.
    Flow {
        /// Optional activity name.
        #[serde(default)]
        name: Option<String>,
        /// Concurrent children.
        activities: Vec<ActivityDef>,
    },
    /// Message-driven choice.
    Pick {
        /// Optional activity name.
        #[serde(default)]
        name: Option<String>,
        /// Choice classification metadata; see [`Status`].
        #[serde(default)]
        status: Option<String>,
        /// Message alternatives.
        #[serde(default)]
        on_message: Vec<MessageBranch>,
        /// Timeout alternatives.
        #[serde(default)]
        on_alarm: Vec<AlarmBranch>,
    },
    /// Data-driven choice.
    If {
        /// Optional activity name.
        #[serde(default)]
        name: Option<String>,
        /// Choice classification metadata; see [`Status`].
        #[serde(default)]
        status: Option<String>,
        /// Branch taken when the condition holds.
        then: Box<ActivityDef>,
        /// Further conditional branches.
        #[serde(default)]
        else_if: Vec<ActivityDef>,
        /// Fallback branch.
        #[serde(default, rename = "else")]
        otherwise: Option<Box<ActivityDef>>,
    },
    /// Condition-checked-first loop.
    While {
        /// Optional activity name.
        #[serde(default)]
        name: Option<String>,
        /// Loop body.
        activity: Box<ActivityDef>,
    },
    /// Condition-checked-last loop.
    RepeatUntil {
        /// Optional activity name.
        #[serde(default)]
        name: Option<String>,
        /// Loop body.
        activity: Box<ActivityDef>,
    },
    /// Iteration over a range or collection.
    ForEach {
        /// Optional activity name.
        #[serde(default)]
        name: Option<String>,
        /// Loop body.
        activity: Box<ActivityDef>,
    },
    /// Transparent grouping; adds no meaning to the tree.
    Scope {
        /// Optional activity name.
        #[serde(default)]
        name: Option<String>,
        /// The grouped activity.
        activity: Box<ActivityDef>,
    },
}

impl ActivityDef {
    /// The activity's name, if it has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            ActivityDef::Invoke(c) | ActivityDef::Receive(c) | ActivityDef::Reply(c) => {
                c.name.as_deref()
            }
            ActivityDef::Sequence { name, .. }
            | ActivityDef::Flow { name, .. }
            | ActivityDef::Pick { name, .. }
            | ActivityDef::If { name, .. }
            | ActivityDef::While { name, .. }
            | ActivityDef::RepeatUntil { name, .. }
            | ActivityDef::ForEach { name, .. }
            | ActivityDef::Scope { name, .. } => name.as_deref(),
        }
    }
}

/// Per-activity classification resolved from status metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// Activity may be invoked by partners.
    Invokable,
    /// Activity is observable but not invokable.
    #[default]
    Observable,
    /// Choice decided by the partner.
    ExternalChoice,
    /// Choice decided by the process itself.
    InternalChoice,
}

/// Resolve the status of an activity from its raw metadata. Absent or
/// unparseable values fall back to the default ([`Status::Observable`],
/// which classifies choices as internal).
pub fn resolve_status(raw: Option<&str>) -> Status {
    let Some(raw) = raw else {
        return Status::default();
    };
    match raw.to_ascii_lowercase().as_str() {
        "invokable" => Status::Invokable,
        "observable" => Status::Observable,
        "exor" | "external" => Status::ExternalChoice,
        "ixor" | "internal" => Status::InternalChoice,
        other => {
            warn!(status = other, "could not decode status, using default");
            Status::default()
        }
    }
}
