//! Comparison of two analyzed process trees: activity matching, the
//! boolean matching predicates, and the degree-of-inexact-matching metrics.
//!
//! Matching is by communication-label equality (role, partner-link type,
//! operation). The partial bijection between the two basic-node sets is
//! built once per tree pair and fixed for the comparator's lifetime; a
//! [`ComparatorCache`] lets callers reuse it across predicate calls, keyed
//! by the stable pair of tree ids.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::AnalysisError;
use crate::relation::{Relation, RelationMatrix};
use crate::tree::{CommunicationLabel, NodeId, ProcessTree, TreeId};

/// The four similarity ratios.
///
/// `m2`/`mi2` are the externally reported metrics (extra activities weigh
/// into the denominator); `m1`/`mi1` are retained for comparison with an
/// earlier metric definition. All are 0.0 when the trees have no matched
/// activities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricResult {
    /// Exact relation matches over the matched pairs.
    pub m1: f64,
    /// Exact relation matches over matched pairs plus extra relations.
    pub m2: f64,
    /// Loop-insensitive matches over the matched pairs.
    pub mi1: f64,
    /// Loop-insensitive matches over matched pairs plus extra relations.
    pub mi2: f64,
}

/// The fixed partial bijection between the basic nodes of two trees,
/// expressed in matrix indices.
#[derive(Debug, Clone)]
struct MatchMap {
    to_2: Vec<Option<usize>>,
    to_1: Vec<Option<usize>>,
}

impl MatchMap {
    fn build(t1: &ProcessTree, t2: &ProcessTree) -> Self {
        let mut by_label: HashMap<&CommunicationLabel, usize> = HashMap::new();
        for (j, &n2) in t2.basic_order().iter().enumerate() {
            if let Some(label) = t2.node(n2).label().as_communication() {
                by_label.insert(label, j);
            }
        }

        let mut to_2 = vec![None; t1.basic_order().len()];
        let mut to_1 = vec![None; t2.basic_order().len()];
        for (i, &n1) in t1.basic_order().iter().enumerate() {
            let Some(label) = t1.node(n1).label().as_communication() else {
                continue;
            };
            match by_label.get(label) {
                None => debug!(node = %t1.node(n1), "no matching activity found"),
                Some(&j) => {
                    debug!(n1 = %t1.node(n1), n2 = %t2.node(t2.basic_order()[j]), "matched");
                    to_2[i] = Some(j);
                    // matching is symmetric, record the inverse direction too
                    to_1[j] = Some(i);
                }
            }
        }
        Self { to_2, to_1 }
    }

    fn matched_count(&self) -> usize {
        self.to_2.iter().flatten().count()
    }
}

/// Comparator over one pair of analyzed trees.
pub struct Comparator<'a> {
    t1: &'a ProcessTree,
    t2: &'a ProcessTree,
    matrix1: &'a RelationMatrix,
    matrix2: &'a RelationMatrix,
    map: MatchMap,
}

impl<'a> Comparator<'a> {
    /// Build the activity matching for the pair. Both trees must have their
    /// process type determined.
    pub fn new(t1: &'a ProcessTree, t2: &'a ProcessTree) -> Result<Self, AnalysisError> {
        let matrix1 = t1
            .process_type()
            .ok_or(AnalysisError::ProcessTypeMissing(t1.id()))?;
        let matrix2 = t2
            .process_type()
            .ok_or(AnalysisError::ProcessTypeMissing(t2.id()))?;
        let map = MatchMap::build(t1, t2);
        Ok(Self {
            t1,
            t2,
            matrix1,
            matrix2,
            map,
        })
    }

    /// Every basic activity of either tree has a matching partner.
    pub fn have_equal_basic_activities(&self) -> bool {
        self.t1.basic_order().len() == self.map.matched_count()
            && self.t2.basic_order().len() == self.map.to_1.iter().flatten().count()
    }

    /// The two trees agree on the relation of every matched pair. Requires
    /// [`have_equal_basic_activities`](Self::have_equal_basic_activities).
    pub fn have_equal_process_type(&self) -> bool {
        if !self.have_equal_basic_activities() {
            return false;
        }
        let n = self.t1.basic_order().len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (Some(mi), Some(mj)) = (self.map.to_2[i], self.map.to_2[j]) else {
                    return false;
                };
                let op1 = self.matrix1.get(i, j);
                let op2 = self.matrix2.get(mi, mj);
                if op1 != op2 {
                    info!(
                        n1 = %self.t1.node(self.t1.basic_order()[i]),
                        n2 = %self.t1.node(self.t1.basic_order()[j]),
                        "relations do not match"
                    );
                    return false;
                }
            }
        }
        true
    }

    /// Every matched pair executes with the same multiplicity.
    pub fn have_same_multiplicities(&self) -> bool {
        for (i, &n1) in self.t1.basic_order().iter().enumerate() {
            let Some(j) = self.map.to_2[i] else { continue };
            let n2 = self.t2.basic_order()[j];
            if self.t1.node(n1).multiplicity() != self.t2.node(n2).multiplicity() {
                return false;
            }
        }
        true
    }

    /// Every receive and reply of the second tree has a matched counterpart
    /// in the first: the first process offers at least the operations the
    /// second one offers.
    pub fn p2_operations_subset_of_p1(&self) -> bool {
        self.t2
            .receives()
            .iter()
            .chain(self.t2.replies().iter())
            .all(|&n| self.is_matched_in_t1(n))
    }

    /// Every invoke of the first tree has a matched counterpart in the
    /// second: the first process invokes at most what the second expects.
    pub fn p1_invokes_subset_of_p2(&self) -> bool {
        self.t1.invokes().iter().all(|&n| self.is_matched_in_t2(n))
    }

    /// Restricted to the matched activities, relations and multiplicities
    /// agree. Weaker than [`have_equal_process_type`]: extras are ignored.
    ///
    /// [`have_equal_process_type`]: Self::have_equal_process_type
    pub fn common_activities_agree(&self) -> bool {
        let n = self.t1.basic_order().len();
        for i in 0..n {
            let Some(mi) = self.map.to_2[i] else { continue };
            let n1 = self.t1.basic_order()[i];
            let m1 = self.t2.basic_order()[mi];
            if self.t1.node(n1).multiplicity() != self.t2.node(m1).multiplicity() {
                return false;
            }
            for j in (i + 1)..n {
                let Some(mj) = self.map.to_2[j] else { continue };
                if self.matrix1.get(i, j) != self.matrix2.get(mi, mj) {
                    return false;
                }
            }
        }
        true
    }

    /// Exact match: equal activities, equal process type, equal
    /// multiplicities.
    pub fn matches_exactly(&self) -> bool {
        if !self.have_equal_basic_activities() {
            debug!("different basic non-silent activities");
            return false;
        }
        if !self.have_equal_process_type() {
            debug!("different process type");
            return false;
        }
        if !self.have_same_multiplicities() {
            debug!("different multiplicities");
            return false;
        }
        true
    }

    /// Plugin match: the first process can substitute for the second one in
    /// its consumer role (asymmetric subsumption).
    pub fn is_plugin_for_other(&self) -> bool {
        if !self.p2_operations_subset_of_p1() {
            debug!("offered operations of P2 are not a subset of those of P1");
            return false;
        }
        if !self.p1_invokes_subset_of_p2() {
            debug!("invoked operations of P1 are not a subset of those of P2");
            return false;
        }
        if !self.common_activities_agree() {
            debug!("common activities disagree on relations or multiplicities");
            return false;
        }
        true
    }

    fn is_matched_in_t2(&self, n1: NodeId) -> bool {
        self.t1
            .node(n1)
            .index()
            .and_then(|i| self.map.to_2[i])
            .is_some()
    }

    fn is_matched_in_t1(&self, n2: NodeId) -> bool {
        self.t2
            .node(n2)
            .index()
            .and_then(|j| self.map.to_1[j])
            .is_some()
    }

    /// The degree-of-inexact-matching metrics, both loop-sensitive and
    /// loop-insensitive.
    pub fn degree_of_inexact_matching(&self) -> MetricResult {
        if self.map.matched_count() == 0 {
            // no activities in common: all metrics are 0 by convention
            return MetricResult::default();
        }

        let mut exact: u64 = 0;
        let mut loop_insensitive: u64 = 0;
        let mut total: u64 = 0;
        let mut extra: u64 = 0;

        let n1_len = self.t1.basic_order().len();
        for i in 0..n1_len {
            let Some(mi) = self.map.to_2[i] else {
                // every relation incident to an unmatched node is extra;
                // parallel relations are symmetric and counted from both
                // sides, so they add one more each
                extra += (n1_len as u64).saturating_sub(1);
                extra += parallel_relations_from(self.matrix1, i);
                continue;
            };
            for j in (i + 1)..n1_len {
                let Some(mj) = self.map.to_2[j] else {
                    // handled when the outer loop reaches the unmatched node
                    continue;
                };
                let op1 = self.matrix1.get(i, j);
                let op2 = self.matrix2.get(mi, mj);

                total += 1;
                if is_parallel(op1) {
                    total += 1;
                }

                if op1 == op2 {
                    // sequence pairs are visited once (i < j); the reverse
                    // direction is implied, so one count suffices
                    exact += 1;
                    if is_parallel(op1) {
                        exact += 1;
                    }
                } else if loop_insensitive_match(op1, op2) {
                    loop_insensitive += 1;
                    if is_parallel(op1) {
                        loop_insensitive += 1;
                    }
                } else {
                    // a full mismatch also counts the second tree's relation
                    // into the total
                    total += 1;
                    if is_parallel(op2) {
                        total += 1;
                    }
                }
            }
        }

        // activities of the second tree with no counterpart in the first
        let n2_len = self.t2.basic_order().len();
        for j in 0..n2_len {
            if self.map.to_1[j].is_none() {
                extra += (n2_len as u64).saturating_sub(1);
                extra += parallel_relations_from(self.matrix2, j);
            }
        }

        MetricResult {
            m1: ratio(exact, total),
            m2: ratio(exact, total + extra),
            mi1: ratio(exact + loop_insensitive, total),
            mi2: ratio(exact + loop_insensitive, total + extra),
        }
    }
}

/// `0/0` is 0.0 by convention (single matched activity, no pairs).
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn is_parallel(op: Option<Relation>) -> bool {
    op.is_some_and(Relation::is_parallel)
}

fn loop_insensitive_match(op1: Option<Relation>, op2: Option<Relation>) -> bool {
    match (op1, op2) {
        (Some(a), Some(b)) => a.loop_insensitive_match(b),
        _ => false,
    }
}

/// Number of parallel relations starting from node `i`.
fn parallel_relations_from(matrix: &RelationMatrix, i: usize) -> u64 {
    (0..matrix.len())
        .filter(|&j| j != i && is_parallel(matrix.get(i, j)))
        .count() as u64
}

/// Caller-owned cache of activity matchings, keyed by tree-pair identity.
/// Reuses the (label-equality) match map so repeated predicate evaluation
/// over the same pair does not rebuild it.
#[derive(Debug, Default)]
pub struct ComparatorCache {
    maps: HashMap<(TreeId, TreeId), MatchMap>,
}

impl ComparatorCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// A comparator for the pair, reusing the cached matching when present.
    pub fn comparator<'a>(
        &mut self,
        t1: &'a ProcessTree,
        t2: &'a ProcessTree,
    ) -> Result<Comparator<'a>, AnalysisError> {
        let key = (t1.id(), t2.id());
        if let Some(map) = self.maps.get(&key) {
            let matrix1 = t1
                .process_type()
                .ok_or(AnalysisError::ProcessTypeMissing(t1.id()))?;
            let matrix2 = t2
                .process_type()
                .ok_or(AnalysisError::ProcessTypeMissing(t2.id()))?;
            return Ok(Comparator {
                t1,
                t2,
                matrix1,
                matrix2,
                map: map.clone(),
            });
        }
        let comparator = Comparator::new(t1, t2)?;
        self.maps.insert(key, comparator.map.clone());
        Ok(comparator)
    }
}
