use std::collections::HashMap;

use tracing::debug;
use tracing::trace;

use crate::node::Node;
use crate::node::NodeId;
use crate::node::NodeKey;
use crate::node::UNSET;
use crate::WideCoord;

/// Canonical store of quadtree nodes.
///
/// Nodes live in an arena and are referred to by [`NodeId`]. [`intern`] is
/// the only way to create one, which guarantees at most one live node per
/// structural identity: children of equal subtrees are identity-equal, so
/// equality checks anywhere above the leaves are integer compares.
///
/// Slots freed by [`sweep`] are recycled through a free list.
///
/// [`intern`]: NodeStore::intern
/// [`sweep`]: NodeStore::sweep
pub struct NodeStore {
    nodes: Vec<Node>,
    table: HashMap<NodeKey, NodeId>,
    free: Vec<NodeId>,

    /// Canonical all-dead subtree per level. Entries may be invalidated by
    /// a sweep and are re-interned on the next request.
    empty: Vec<Option<NodeId>>,

    /// Lifetime count of interned nodes, for stats.
    created: u64,
}

impl NodeStore {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            table: HashMap::new(),
            free: Vec::new(),
            empty: Vec::new(),
            created: 0,
        }
    }

    /// Copy of the node behind `id`.
    ///
    /// Panics if `id` does not refer to a live node.
    pub fn node(&self, id: NodeId) -> Node {
        self.nodes[id as usize]
    }

    /// Number of live canonical nodes.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Lifetime count of nodes ever interned, including reclaimed ones.
    pub fn created(&self) -> u64 {
        self.created
    }

    /// All live canonical nodes, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.table.values().map(|&id| (id, &self.nodes[id as usize]))
    }

    /// Look up the canonical node for `key`, interning a new one if none
    /// exists yet. The returned identity is stable until a sweep reclaims
    /// the node.
    pub fn intern(&mut self, key: NodeKey) -> NodeId {
        if let Some(&id) = self.table.get(&key) {
            return id;
        }

        let node = self.materialize(key);
        let id = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot as usize] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                (self.nodes.len() - 1) as NodeId
            }
        };

        self.table.insert(key, id);
        self.created += 1;

        id
    }

    fn materialize(&self, key: NodeKey) -> Node {
        match key {
            NodeKey::Leaf { alive } => Node {
                nw: UNSET,
                ne: UNSET,
                sw: UNSET,
                se: UNSET,
                evolved: UNSET,
                level: 0,
                population: alive as u64,
                alive,
            },
            NodeKey::Branch {
                level,
                nw,
                ne,
                sw,
                se,
            } => {
                debug_assert!(level >= 1);
                debug_assert!([ne, sw, se]
                    .iter()
                    .all(|&c| self.nodes[c as usize].level == level - 1));
                debug_assert_eq!(self.nodes[nw as usize].level, level - 1);

                let population = self.nodes[nw as usize].population
                    + self.nodes[ne as usize].population
                    + self.nodes[sw as usize].population
                    + self.nodes[se as usize].population;

                Node {
                    nw,
                    ne,
                    sw,
                    se,
                    evolved: UNSET,
                    level,
                    population,
                    alive: population > 0,
                }
            }
        }
    }

    fn leaf(&mut self, alive: bool) -> NodeId {
        self.intern(NodeKey::Leaf { alive })
    }

    fn branch(&mut self, nw: NodeId, ne: NodeId, sw: NodeId, se: NodeId, level: u32) -> NodeId {
        self.intern(NodeKey::Branch {
            level,
            nw,
            ne,
            sw,
            se,
        })
    }

    /// Canonical all-dead subtree at `level`.
    pub fn empty(&mut self, level: u32) -> NodeId {
        if let Some(&Some(id)) = self.empty.get(level as usize) {
            return id;
        }

        let id = if level == 0 {
            self.leaf(false)
        } else {
            let child = self.empty(level - 1);
            self.branch(child, child, child, child, level)
        };

        if self.empty.len() <= level as usize {
            self.empty.resize(level as usize + 1, None);
        }
        self.empty[level as usize] = Some(id);

        id
    }

    /// Canonical tree identical to `node` except the cell at (`x`, `y`) is
    /// alive. Coordinates are relative to the node's center and must fall
    /// inside its square.
    pub fn set_cell(&mut self, node: NodeId, x: WideCoord, y: WideCoord) -> NodeId {
        let Node {
            nw,
            ne,
            sw,
            se,
            level,
            ..
        } = self.nodes[node as usize];

        if level == 0 {
            return self.leaf(true);
        }

        let offset: WideCoord = if level == 1 { 0 } else { 1 << (level - 2) };

        if x < 0 {
            if y < 0 {
                let nw = self.set_cell(nw, x + offset, y + offset);
                self.branch(nw, ne, sw, se, level)
            } else {
                let sw = self.set_cell(sw, x + offset, y - offset);
                self.branch(nw, ne, sw, se, level)
            }
        } else if y < 0 {
            let ne = self.set_cell(ne, x - offset, y + offset);
            self.branch(nw, ne, sw, se, level)
        } else {
            let se = self.set_cell(se, x - offset, y - offset);
            self.branch(nw, ne, sw, se, level)
        }
    }

    /// Grow `node` by one level, keeping its contents in the center of the
    /// larger square. The old quadrants land at the inner corners of the
    /// new ones, so the result has a ring of dead cells around the old
    /// square.
    pub fn expand(&mut self, node: NodeId) -> NodeId {
        let Node {
            nw,
            ne,
            sw,
            se,
            level,
            ..
        } = self.nodes[node as usize];

        assert!(level >= 1, "cannot expand a leaf");

        let empty = self.empty(level - 1);
        let nw = self.branch(empty, empty, empty, nw, level);
        let ne = self.branch(empty, empty, ne, empty, level);
        let sw = self.branch(empty, sw, empty, empty, level);
        let se = self.branch(se, empty, empty, empty, level);

        self.branch(nw, ne, sw, se, level + 1)
    }

    /// Shrink `node` while every grand-quadrant outside the center square
    /// is empty, rebuilding from the four inner-corner grand-quadrants one
    /// level down. Stops at the first level with live cells on the outer
    /// ring, or at level 2.
    pub fn compact(&mut self, node: NodeId) -> NodeId {
        let mut root = node;

        loop {
            let Node {
                nw,
                ne,
                sw,
                se,
                level,
                ..
            } = self.nodes[root as usize];

            if level < 3 {
                return root;
            }

            let empty = self.empty(level - 2);

            let nw = self.node(nw);
            let ne = self.node(ne);
            let sw = self.node(sw);
            let se = self.node(se);

            let ring_empty = nw.nw == empty && nw.ne == empty && nw.sw == empty
                && ne.nw == empty && ne.ne == empty && ne.se == empty
                && sw.nw == empty && sw.sw == empty && sw.se == empty
                && se.ne == empty && se.sw == empty && se.se == empty;

            if !ring_empty {
                return root;
            }

            root = self.branch(nw.se, ne.sw, sw.ne, se.nw, level - 1);
        }
    }

    /// True when every top-level quadrant's population sits entirely in its
    /// inner-corner grandchild, i.e. the outer ring of the node is dead and
    /// evolving it loses no live cells.
    pub fn has_empty_border(&self, node: NodeId) -> bool {
        let n = self.node(node);
        if n.level < 3 {
            return false;
        }

        let nw = self.node(n.nw);
        let ne = self.node(n.ne);
        let sw = self.node(n.sw);
        let se = self.node(n.se);

        nw.population == self.node(self.node(nw.se).se).population
            && ne.population == self.node(self.node(ne.sw).sw).population
            && sw.population == self.node(self.node(sw.ne).ne).population
            && se.population == self.node(self.node(se.nw).nw).population
    }

    /// Evolve the center square of `node` one generation forward, returning
    /// a node one level down. Memoized: evolving the same canonical node
    /// twice returns the same identity without recomputing.
    ///
    /// `node` must be at level 2 or above.
    pub fn evolve(&mut self, node: NodeId) -> NodeId {
        let n = self.nodes[node as usize];

        assert!(n.level >= 2, "evolve needs a node of level >= 2");

        if n.evolved != UNSET {
            return n.evolved;
        }

        trace!(level = n.level, population = n.population, "evolving node");

        let result = if n.population == 0 {
            // An all-dead branch's NW child is the canonical empty one
            // level down, which is exactly the evolution result.
            n.nw
        } else if n.level == 2 {
            self.evolve_level2(node)
        } else {
            self.evolve_level_n(node)
        };

        self.nodes[node as usize].evolved = result;

        result
    }

    /// Level-2 base case: apply B3/S23 to the four center cells of the
    /// 4x4 square. The border cells are handled a level up, where this
    /// square appears inside overlapping neighborhoods.
    fn evolve_level2(&mut self, node: NodeId) -> NodeId {
        let n = self.nodes[node as usize];

        let qnw = self.node(n.nw);
        let qne = self.node(n.ne);
        let qsw = self.node(n.sw);
        let qse = self.node(n.se);

        // The sixteen leaves as a 4x4 bit grid, rows top to bottom.
        let grid = [
            [qnw.nw, qnw.ne, qne.nw, qne.ne],
            [qnw.sw, qnw.se, qne.sw, qne.se],
            [qsw.nw, qsw.ne, qse.nw, qse.ne],
            [qsw.sw, qsw.se, qse.sw, qse.se],
        ]
        .map(|row| row.map(|leaf| self.nodes[leaf as usize].alive));

        let mut cells = [[false; 2]; 2];
        for cy in 0..2 {
            for cx in 0..2 {
                let (gx, gy) = (cx + 1, cy + 1);

                let mut neighbors = 0;
                for dy in 0..3 {
                    for dx in 0..3 {
                        if (dx, dy) != (1, 1) && grid[gy + dy - 1][gx + dx - 1] {
                            neighbors += 1;
                        }
                    }
                }

                cells[cy][cx] = life_rule(grid[gy][gx], neighbors);
            }
        }

        let nw = self.leaf(cells[0][0]);
        let ne = self.leaf(cells[0][1]);
        let sw = self.leaf(cells[1][0]);
        let se = self.leaf(cells[1][1]);

        self.branch(nw, ne, sw, se, 1)
    }

    /// Level-N recursion: tile the central 3/4 region with nine overlapping
    /// squares two levels down, assemble the four overlapping half-size
    /// neighborhoods over them, and evolve those. The center of this node
    /// one step forward equals the centers of the four neighborhoods each
    /// stepped forward once.
    fn evolve_level_n(&mut self, node: NodeId) -> NodeId {
        let n = self.nodes[node as usize];
        let level = n.level;

        let qnw = self.node(n.nw);
        let qne = self.node(n.ne);
        let qsw = self.node(n.sw);
        let qse = self.node(n.se);

        // n00 n01 n02
        // n10 n11 n12
        // n20 n21 n22
        let n00 = self.center(qnw.nw, qnw.ne, qnw.sw, qnw.se, level - 2);
        let n01 = self.center(qnw.ne, qne.nw, qnw.se, qne.sw, level - 2);
        let n02 = self.center(qne.nw, qne.ne, qne.sw, qne.se, level - 2);
        let n10 = self.center(qnw.sw, qnw.se, qsw.nw, qsw.ne, level - 2);
        let n11 = self.center(qnw.se, qne.sw, qsw.ne, qse.nw, level - 2);
        let n12 = self.center(qne.sw, qne.se, qse.nw, qse.ne, level - 2);
        let n20 = self.center(qsw.nw, qsw.ne, qsw.sw, qsw.se, level - 2);
        let n21 = self.center(qsw.ne, qse.nw, qsw.se, qse.sw, level - 2);
        let n22 = self.center(qse.nw, qse.ne, qse.sw, qse.se, level - 2);

        let tl = self.branch(n00, n01, n10, n11, level - 1);
        let tr = self.branch(n01, n02, n11, n12, level - 1);
        let bl = self.branch(n10, n11, n20, n21, level - 1);
        let br = self.branch(n11, n12, n21, n22, level - 1);

        let nw = self.evolve(tl);
        let ne = self.evolve(tr);
        let sw = self.evolve(bl);
        let se = self.evolve(br);

        self.branch(nw, ne, sw, se, level - 1)
    }

    /// Canonical square at `level` centered where the four given sibling
    /// squares meet: its quadrants are their facing inner corners.
    fn center(&mut self, nw: NodeId, ne: NodeId, sw: NodeId, se: NodeId, level: u32) -> NodeId {
        let a = self.node(nw).se;
        let b = self.node(ne).sw;
        let c = self.node(sw).ne;
        let d = self.node(se).nw;

        self.branch(a, b, c, d, level)
    }

    /// Mark-and-sweep from `root`: drop every node not reachable through
    /// children or evolution memos, and recycle their slots. Returns the
    /// number of nodes reclaimed.
    pub fn sweep(&mut self, root: NodeId) -> usize {
        let mut marked = vec![false; self.nodes.len()];
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            let slot = id as usize;
            if marked[slot] {
                continue;
            }
            marked[slot] = true;

            let n = self.nodes[slot];
            if n.level > 0 {
                stack.push(n.nw);
                stack.push(n.ne);
                stack.push(n.sw);
                stack.push(n.se);
            }
            if n.evolved != UNSET {
                stack.push(n.evolved);
            }
        }

        let before = self.table.len();
        self.table.retain(|_, id| marked[*id as usize]);
        let reclaimed = before - self.table.len();

        // Unmarked slots, including previously free ones, become the new
        // free list.
        self.free.clear();
        for (slot, live) in marked.iter().enumerate() {
            if !live {
                self.free.push(slot as NodeId);
            }
        }

        // Swept empty trees are re-interned on the next request.
        for entry in &mut self.empty {
            if entry.is_some_and(|id| !marked[id as usize]) {
                *entry = None;
            }
        }

        debug!(reclaimed, live = self.table.len(), "swept node store");

        reclaimed
    }
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Conway's B3/S23: a live cell survives with 2 or 3 neighbors, a dead
/// cell is born with exactly 3.
fn life_rule(alive: bool, neighbors: u32) -> bool {
    if alive {
        neighbors == 2 || neighbors == 3
    } else {
        neighbors == 3
    }
}
