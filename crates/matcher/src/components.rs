//! Connected components of the verified-edge graph.

use fxhash::FxHashMap;
use ingest::NameId;
use perceptual::CandidatePair;

/// Union-find over dense indices with union by size and path compression.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    /// Adds a new singleton set and returns its index.
    pub fn push(&mut self) -> usize {
        let idx = self.parent.len();
        self.parent.push(idx);
        self.size.push(1);
        idx
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn find(&mut self, x: usize) -> usize {
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

    /// Merges the sets of `a` and `b`; `false` if they were already joined.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        true
    }

    pub fn set_size(&mut self, x: usize) -> usize {
        let root = self.find(x);
        self.size[root]
    }
}

/// Components of the graph spanned by `edges`, largest first.
///
/// Equal sizes are ordered by discovery: the position in `edges` where the
/// component's earliest member first appears. Members are sorted by id.
/// Names without edges are not returned; they become singleton firms.
pub fn connected_components<I>(edges: I) -> Vec<Vec<NameId>>
where
    I: IntoIterator<Item = CandidatePair>,
{
    // Dense index = discovery rank of the name.
    let mut index: FxHashMap<NameId, usize> = FxHashMap::default();
    let mut ids: Vec<NameId> = Vec::new();
    let mut sets = DisjointSet::new(0);

    let mut dense = |id: NameId, sets: &mut DisjointSet| -> usize {
        *index.entry(id).or_insert_with(|| {
            ids.push(id);
            sets.push()
        })
    };

    for pair in edges {
        let a = dense(pair.a, &mut sets);
        let b = dense(pair.b, &mut sets);
        sets.union(a, b);
    }

    // Per root: members and the smallest discovery rank.
    let mut by_root: FxHashMap<usize, (usize, Vec<NameId>)> = FxHashMap::default();
    for (rank, &id) in ids.iter().enumerate() {
        let root = sets.find(rank);
        by_root
            .entry(root)
            .or_insert_with(|| (rank, Vec::new()))
            .1
            .push(id);
    }

    let mut components: Vec<(usize, Vec<NameId>)> = by_root.into_values().collect();
    components.sort_by(|(ra, a), (rb, b)| b.len().cmp(&a.len()).then(ra.cmp(rb)));
    components
        .into_iter()
        .map(|(_, mut members)| {
            members.sort_unstable();
            members
        })
        .collect()
}
