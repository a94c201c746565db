use std::collections::HashMap;
use std::f64::consts::TAU;

/// Union-Find over dense node positions.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]); // path compression
        }
        self.parent[x]
    }

    fn union(&mut self, x: usize, y: usize) {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx == ry {
            return;
        }
        // Union by rank
        if self.rank[rx] < self.rank[ry] {
            self.parent[rx] = ry;
        } else if self.rank[rx] > self.rank[ry] {
            self.parent[ry] = rx;
        } else {
            self.parent[ry] = rx;
            self.rank[rx] += 1;
        }
    }
}

/// Place `node_count` nodes on a circle of `radius`, keeping each connected
/// component on a contiguous arc. Components are ordered by their first
/// node, nodes within a component by position, so the same input always
/// yields the same coordinates.
///
/// `edges` are pairs of dense node positions; out-of-range pairs are ignored.
pub fn circular_layout(
    node_count: usize,
    edges: &[(usize, usize)],
    radius: f64,
) -> Vec<(f64, f64)> {
    if node_count == 0 {
        return Vec::new();
    }
    if node_count == 1 {
        return vec![(0.0, 0.0)];
    }

    let mut uf = UnionFind::new(node_count);
    for &(a, b) in edges {
        if a < node_count && b < node_count {
            uf.union(a, b);
        }
    }

    // component rank = order in which its first member appears
    let mut component_rank: HashMap<usize, usize> = HashMap::new();
    let mut keyed: Vec<(usize, usize)> = Vec::with_capacity(node_count);
    for idx in 0..node_count {
        let root = uf.find(idx);
        let next = component_rank.len();
        let rank = *component_rank.entry(root).or_insert(next);
        keyed.push((rank, idx));
    }
    keyed.sort();

    let mut positions = vec![(0.0, 0.0); node_count];
    for (slot, &(_, idx)) in keyed.iter().enumerate() {
        let angle = TAU * slot as f64 / node_count as f64;
        positions[idx] = (radius * angle.cos(), radius * angle.sin());
    }
    positions
}
