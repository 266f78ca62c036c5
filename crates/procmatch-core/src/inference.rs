//! Relation inference: derives the complete pairwise relation matrix over
//! the basic nodes of a tree.
//!
//! Two phases, control links first. An explicit control link forces
//! everything that must finish before its source and everything that must
//! start after its target into a transitive sequential relation. The
//! structural phase then classifies every remaining pair by the kind and
//! multiplicity of the pair's least common ancestor. An exclusive-choice
//! ancestor always wins, even over a control link crossing the choice
//! boundary (ill-formed input, tolerated).
//!
//! Any projection must be complete before this runs: the matrix is built
//! exactly once per analysis run on the final node set.

use indexmap::IndexSet;
use tracing::{debug, error};

use crate::lca::Lca;
use crate::relation::{Relation, RelationMatrix};
use crate::tree::{Multiplicity, NodeId, NodeKind, ProcessTree};

impl ProcessTree {
    /// Compute the process type (the relation matrix) of this tree.
    ///
    /// Reassigns the basic-node indices, runs the LCA preprocessing pass,
    /// and fills the matrix. Malformed input degrades locally: pairs whose
    /// ancestor has an unexpected kind are logged and left undefined.
    pub fn determine_process_type(&mut self) {
        let lca = Lca::new(self);
        self.rebuild_basic_index();
        let mut matrix = RelationMatrix::new(self.basic_order().len());

        self.apply_control_links(&lca, &mut matrix);
        self.apply_structure(&lca, &mut matrix);

        self.set_process_type(matrix);
    }

    /// Phase 1: transitive sequential relations induced by control links.
    fn apply_control_links(&self, lca: &Lca, matrix: &mut RelationMatrix) {
        for &(source, target) in self.control_links() {
            // skip links whose endpoints already got a relation from an
            // earlier link of this loop
            if let (Some(i), Some(j)) = (self.node(source).index(), self.node(target).index()) {
                if matrix.get(i, j).is_some() {
                    debug!(
                        source = %self.node(source),
                        target = %self.node(target),
                        "control-link relation already set"
                    );
                    continue;
                }
            }
            let Some(bound) = lca.get(source, target) else {
                error!(
                    source = %self.node(source),
                    target = %self.node(target),
                    "no common ancestor for control link"
                );
                continue;
            };

            let mut predecessors = self.sequential_predecessors(source, bound);
            let mut successors = self.sequential_successors(target, bound);
            // the endpoints themselves take part in the relation
            predecessors.insert(source);
            successors.insert(target);

            for &p in &predecessors {
                for &s in &successors {
                    if p == s {
                        continue;
                    }
                    // only pairs of basic nodes are addressable in the matrix
                    let (Some(i), Some(j)) = (self.node(p).index(), self.node(s).index()) else {
                        continue;
                    };
                    let Some(m) = lca.get(p, s) else {
                        continue;
                    };
                    let rel = match self.node(m).multiplicity() {
                        Multiplicity::One => Relation::Seq1,
                        Multiplicity::Arbitrary => Relation::SeqArb,
                    };
                    matrix.set(i, j, rel);
                }
            }
        }
    }

    /// Phase 2: classify every unordered pair of basic nodes by its LCA.
    fn apply_structure(&self, lca: &Lca, matrix: &mut RelationMatrix) {
        let order = self.basic_order();
        for i in 0..order.len() {
            let n1 = order[i];
            for j in (i + 1)..order.len() {
                let n2 = order[j];
                debug!(n1 = %self.node(n1), n2 = %self.node(n2), "handling pair");

                let Some(l) = lca.get(n1, n2) else {
                    error!(n1 = %self.node(n1), n2 = %self.node(n2), "no common ancestor");
                    continue;
                };
                let ancestor = self.node(l);

                if let NodeKind::Xor(_) = ancestor.kind() {
                    // an exclusive choice dominates a control link crossing
                    // it; happens only at ill-formed processes
                    if matrix.get(i, j).is_some() {
                        debug!(
                            n1 = %self.node(n1),
                            n2 = %self.node(n2),
                            "overwriting control-link relation with exclusive relation"
                        );
                    }
                    let rel = match ancestor.multiplicity() {
                        Multiplicity::One => Relation::Xor1,
                        Multiplicity::Arbitrary => Relation::XorArb,
                    };
                    matrix.set(i, j, rel);
                    continue;
                }

                if matrix.get(i, j).is_some() {
                    debug!(n1 = %self.node(n1), n2 = %self.node(n2), "relation already set");
                    continue;
                }

                match ancestor.kind() {
                    NodeKind::And => {
                        // no path between the two across a parallel split
                        let rel = match ancestor.multiplicity() {
                            Multiplicity::One => Relation::Par1,
                            Multiplicity::Arbitrary => Relation::ParArb,
                        };
                        matrix.set(i, j, rel);
                    }
                    NodeKind::Sequence => {
                        let target_level = ancestor.level() + 1;
                        let (Some(a1), Some(a2)) = (
                            self.climb_to_level(n1, target_level),
                            self.climb_to_level(n2, target_level),
                        ) else {
                            error!(
                                n1 = %self.node(n1),
                                n2 = %self.node(n2),
                                "broken ancestry while walking to sequence children"
                            );
                            continue;
                        };
                        let n1_first = self.node(a1).rank() < self.node(a2).rank();
                        let rel = match (ancestor.multiplicity(), n1_first) {
                            (Multiplicity::One, true) => Relation::Seq1,
                            (Multiplicity::One, false) => Relation::Seq1Rev,
                            (Multiplicity::Arbitrary, true) => Relation::SeqArb,
                            (Multiplicity::Arbitrary, false) => Relation::SeqArbRev,
                        };
                        matrix.set(i, j, rel);
                    }
                    NodeKind::Basic(_) | NodeKind::Other => {
                        error!(
                            ancestor = %ancestor,
                            kind = %ancestor.kind(),
                            "unexpected ancestor kind for basic pair"
                        );
                    }
                    NodeKind::Xor(_) => unreachable!("handled above"),
                }
            }
        }
    }

    /// Walk up from `n` until the node sits at `level`.
    fn climb_to_level(&self, n: NodeId, level: u32) -> Option<NodeId> {
        let mut cur = n;
        while self.node(cur).level() > level {
            cur = self.parent(cur)?;
        }
        Some(cur)
    }

    /// Activities sequentially before `n`, bounded by `bound`: walking up
    /// from `n`, for every sequence ancestor, the subtrees of siblings with
    /// a smaller rank than the child on the walked path.
    fn sequential_predecessors(&self, n: NodeId, bound: NodeId) -> IndexSet<NodeId> {
        self.sequence_siblings(n, bound, |sibling_rank, path_rank| {
            sibling_rank < path_rank
        })
    }

    /// Activities sequentially after `n`, bounded by `bound`: the subtree of
    /// `n` itself, plus, for every sequence ancestor on the way up, the
    /// subtrees of siblings with a greater rank.
    fn sequential_successors(&self, n: NodeId, bound: NodeId) -> IndexSet<NodeId> {
        let mut result = self.sequence_siblings(n, bound, |sibling_rank, path_rank| {
            sibling_rank > path_rank
        });
        result.extend(self.descendants(n));
        result
    }

    fn sequence_siblings(
        &self,
        n: NodeId,
        bound: NodeId,
        take: impl Fn(u32, u32) -> bool,
    ) -> IndexSet<NodeId> {
        let mut result = IndexSet::new();
        let mut cur = n;
        while let Some(parent) = self.parent(cur) {
            if parent == bound {
                break;
            }
            if self.node(parent).kind() == NodeKind::Sequence {
                let path_rank = self.node(cur).rank();
                for sibling in self.children(parent) {
                    if take(self.node(sibling).rank(), path_rank) {
                        result.insert(sibling);
                        result.extend(self.descendants(sibling));
                    }
                }
            }
            // climbing past a choice is fine, the other branches are
            // irrelevant here
            cur = parent;
        }
        result
    }
}
