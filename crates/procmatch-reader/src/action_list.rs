//! Action-list files: the projection directives a process owner supplies.
//!
//! Line-oriented format, one directive per logical entry:
//!
//! ```text
//! omit shipping
//! hide audit
//! aggregate collect-parts
//! {"kind": "invoke", "role": "seller", "partner_link_type": "ordering",
//!  "operation": "collect"}
//!
//! ```
//!
//! A directive starts with a verb (`omit`, `hide`, `aggregate`) followed by
//! a reference expression naming an activity of the process description.
//! `aggregate` consumes the following non-empty lines as a JSON
//! replacement-activity descriptor, terminated by a blank line (or the end
//! of the file). Unknown lines are skipped with a warning.

use serde::Deserialize;
use tracing::warn;

use procmatch_core::{Action, ActionTable, BasicRole, CommunicationLabel, Replacement};

use crate::builder::BuiltProcess;
use crate::error::ReadError;

const VERB_OMIT: &str = "omit";
const VERB_HIDE: &str = "hide";
const VERB_AGGREGATE: &str = "aggregate";

/// Kind of a replacement activity.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementKind {
    /// Replacement calls an operation.
    Invoke,
    /// Replacement waits for a call.
    Receive,
    /// Replacement answers a call.
    Reply,
}

impl From<ReplacementKind> for BasicRole {
    fn from(kind: ReplacementKind) -> Self {
        match kind {
            ReplacementKind::Invoke => BasicRole::Invoke,
            ReplacementKind::Receive => BasicRole::Receive,
            ReplacementKind::Reply => BasicRole::Reply,
        }
    }
}

/// Serialized replacement-activity descriptor of an `aggregate` directive.
#[derive(Debug, Deserialize)]
pub struct ReplacementDef {
    /// Activity kind of the replacement.
    pub kind: ReplacementKind,
    /// Partner role.
    pub role: String,
    /// Partner-link type.
    pub partner_link_type: String,
    /// Operation name.
    pub operation: String,
    /// Optional descriptive name.
    #[serde(default)]
    pub name: Option<String>,
}

impl From<ReplacementDef> for Replacement {
    fn from(def: ReplacementDef) -> Self {
        Replacement {
            role: def.kind.into(),
            label: CommunicationLabel::new(def.role, def.partner_link_type, def.operation, def.name),
        }
    }
}

/// One parsed directive, not yet resolved against a process.
#[derive(Debug)]
pub struct Directive {
    /// Reference expression naming the targeted activity.
    pub reference: String,
    /// What to do with the targeted activity.
    pub action: DirectiveAction,
}

/// Action part of a directive.
#[derive(Debug)]
pub enum DirectiveAction {
    /// Remove the activity; it does not exist in the projected view.
    Hide,
    /// Remove the activity; it was taken out of scope.
    Omit,
    /// Replace the activity by the described one.
    Aggregate(ReplacementDef),
}

/// Parse the text of an action-list file.
pub fn parse_action_list(text: &str) -> Result<Vec<Directive>, ReadError> {
    let mut directives = Vec::new();
    let mut lines = text.lines().peekable();
    while let Some(line) = lines.next() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (verb, reference) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let reference = reference.trim().to_string();
        match verb {
            VERB_OMIT => directives.push(Directive {
                reference,
                action: DirectiveAction::Omit,
            }),
            VERB_HIDE => directives.push(Directive {
                reference,
                action: DirectiveAction::Hide,
            }),
            VERB_AGGREGATE => {
                // the descriptor spans the following non-empty lines
                let mut descriptor = String::new();
                while let Some(next) = lines.peek() {
                    if next.trim().is_empty() {
                        break;
                    }
                    descriptor.push_str(next);
                    descriptor.push('\n');
                    lines.next();
                }
                let replacement: ReplacementDef = serde_json::from_str(&descriptor).map_err(
                    |source| ReadError::Replacement {
                        reference: reference.clone(),
                        source,
                    },
                )?;
                directives.push(Directive {
                    reference,
                    action: DirectiveAction::Aggregate(replacement),
                });
            }
            _ => warn!(line, "skipping unrecognized action-list line"),
        }
    }
    Ok(directives)
}

/// Resolve parsed directives against a built process. Unresolvable
/// references are logged and skipped rather than failing the run.
pub fn resolve_actions(directives: Vec<Directive>, process: &BuiltProcess) -> ActionTable {
    let mut table = ActionTable::new();
    for directive in directives {
        let Some(id) = process.resolve(&directive.reference) else {
            warn!(
                reference = %directive.reference,
                "action-list reference does not name an activity, skipping"
            );
            continue;
        };
        let action = match directive.action {
            DirectiveAction::Hide => Action::Hide,
            DirectiveAction::Omit => Action::Omit,
            DirectiveAction::Aggregate(def) => Action::Aggregate(def.into()),
        };
        table.insert(id, action);
    }
    table
}
