//! Readers for the procmatch analysis: the concrete process-description
//! syntax and the projection action-list format.
//!
//! The analysis core consumes already-extracted trees and resolved action
//! tables; everything format-specific lives here. A description is a JSON
//! document (see [`description`]); an action list is a line-oriented
//! directive file (see [`action_list`]). Both resolve activity references by
//! name against the built process.

use std::path::Path;

pub mod action_list;
pub mod builder;
pub mod description;
pub mod error;

pub use action_list::{parse_action_list, resolve_actions, Directive, DirectiveAction};
pub use builder::{build_tree, BuiltProcess};
pub use description::{resolve_status, ActivityDef, ProcessDescription, Status};
pub use error::ReadError;

use procmatch_core::ActionTable;

/// Read and deserialize a process description file.
pub fn read_description(path: &Path) -> Result<ProcessDescription, ReadError> {
    let text = std::fs::read_to_string(path).map_err(|source| ReadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Read an action-list file and resolve it against a built process.
pub fn read_action_table(path: &Path, process: &BuiltProcess) -> Result<ActionTable, ReadError> {
    let text = std::fs::read_to_string(path).map_err(|source| ReadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let directives = parse_action_list(&text)?;
    Ok(resolve_actions(directives, process))
}
