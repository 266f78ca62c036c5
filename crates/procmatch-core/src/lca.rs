//! Offline least-common-ancestor computation.
//!
//! Tarjan's offline algorithm: one post-order pass over the containment
//! tree, maintaining a union-find structure over the visited vertices. When
//! a vertex finishes, every already-finished vertex `v` has
//! `lca(u, v) = ancestor(find(v))`. All pairs are recorded in a dense table,
//! so queries are O(1) after the O(n alpha(n)) preprocessing pass.
//!
//! The pass must run on the same tree the relations are computed on: any
//! projection has to be finished before an `Lca` is built.

use std::collections::HashMap;

use crate::tree::{NodeId, ProcessTree};

/// Union-find over dense vertex numbers with path compression.
struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<u32>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        let (small, large) = if self.size[ra] < self.size[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small] = large;
        self.size[large] += self.size[small];
    }
}

/// All-pairs least-common-ancestor table for one tree.
pub struct Lca {
    numbers: HashMap<NodeId, usize>,
    table: Vec<Option<NodeId>>,
    n: usize,
}

struct Frame {
    node: NodeId,
    children: Vec<NodeId>,
    next: usize,
}

impl Frame {
    fn new(tree: &ProcessTree, node: NodeId) -> Self {
        Self {
            node,
            children: tree.children(node),
            next: 0,
        }
    }
}

impl Lca {
    /// Run the offline pass over the tree rooted at `tree.root()`.
    pub fn new(tree: &ProcessTree) -> Self {
        let mut numbers = HashMap::new();
        let mut ids = Vec::new();
        for id in std::iter::once(tree.root()).chain(tree.descendants(tree.root())) {
            numbers.insert(id, ids.len());
            ids.push(id);
        }
        let n = ids.len();
        let mut table = vec![None; n * n];

        let mut dsu = DisjointSet::new(n);
        // representative ancestor of each set, as a dense number
        let mut ancestor: Vec<usize> = (0..n).collect();
        let mut finished_order: Vec<usize> = Vec::with_capacity(n);

        // post-order walk with an explicit stack; union with each child
        // happens as soon as that child's subtree completes
        let mut stack = vec![Frame::new(tree, tree.root())];
        while let Some(top) = stack.last_mut() {
            if top.next < top.children.len() {
                let child = top.children[top.next];
                top.next += 1;
                stack.push(Frame::new(tree, child));
                continue;
            }
            let u = numbers[&top.node];
            stack.pop();

            for &v in &finished_order {
                let a = ancestor[dsu.find(v)];
                table[u * n + v] = Some(ids[a]);
                table[v * n + u] = Some(ids[a]);
            }
            finished_order.push(u);
            table[u * n + u] = Some(ids[u]);

            if let Some(parent) = stack.last() {
                let p = numbers[&parent.node];
                dsu.union(p, u);
                let root = dsu.find(p);
                ancestor[root] = p;
            }
        }

        Self { numbers, table, n }
    }

    /// Least common ancestor of `u` and `v`, or `None` when either vertex
    /// was not part of the tree at preprocessing time.
    pub fn get(&self, u: NodeId, v: NodeId) -> Option<NodeId> {
        let un = *self.numbers.get(&u)?;
        let vn = *self.numbers.get(&v)?;
        self.table[un * self.n + vn]
    }
}
