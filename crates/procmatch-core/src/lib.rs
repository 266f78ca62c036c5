//! Process-tree model and structural-relation analysis.
//!
//! This crate is the analysis core of procmatch: it compares two structured
//! process descriptions by converting each into a normalized process tree,
//! computing the pairwise ordering relation between every two observable
//! activities (the tree's *process type*), and deriving matching predicates
//! and similarity metrics from the two relation matrices.
//!
//! ## Pipeline
//!
//! ```text
//! source tree (from a reader) -> ProcessTree
//!     -> projection::apply (optional, externally supplied ActionTable)
//!     -> ProcessTree::determine_process_type (offline LCA + inference)
//!     -> Comparator (predicates + metrics over two analyzed trees)
//! ```
//!
//! The crate is agnostic to the concrete source syntax: it consumes an
//! already-extracted activity tree plus a side table of control links, both
//! produced by a separate reader crate. All phases are synchronous and
//! single-threaded; projection must complete before inference, inference
//! before comparison.

pub mod comparator;
pub mod error;
mod inference;
pub mod lca;
pub mod projection;
pub mod relation;
pub mod tree;

pub use comparator::{Comparator, ComparatorCache, MetricResult};
pub use error::AnalysisError;
pub use lca::Lca;
pub use projection::{Action, ActionTable, Replacement};
pub use relation::{Relation, RelationMatrix};
pub use tree::{
    ActivityId, BasicRole, ChoiceKind, CommunicationLabel, Label, Multiplicity, Node, NodeId,
    NodeKind, ProcessTree, SourceConstruct, SourceRef, TreeId, RANK_DEFAULT, RANK_FIRST_CHILD,
};
