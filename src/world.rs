use num_bigint::BigInt;
use tracing::debug;

use crate::node::NodeId;
use crate::pow2::Pow2Table;
use crate::store::NodeStore;
use crate::Coord;
use crate::WideCoord;

/// When to run a mark/sweep pass over the canonical store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReclaimPolicy {
    /// Never reclaim; the store grows until the world is dropped.
    Off,

    /// Sweep after every `n` generations.
    EveryGenerations(u64),

    /// Sweep whenever the live store grows past `n` nodes.
    StoreThreshold(usize),
}

impl Default for ReclaimPolicy {
    fn default() -> Self {
        ReclaimPolicy::StoreThreshold(100_000)
    }
}

/// Construction-time options for a [`World`].
#[derive(Clone, Debug, Default)]
pub struct WorldOptions {
    pub reclaim: ReclaimPolicy,

    /// Level of the initial empty root. Clamped to at least 3.
    pub start_level: u32,
}

/// Snapshot of the world's counters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stats {
    pub generation: u64,
    pub population: u64,
    pub level: u32,

    /// Live canonical nodes in the store.
    pub store_nodes: usize,

    /// Nodes ever created, including reclaimed ones.
    pub nodes_created: u64,
}

/// An unbounded Game of Life universe.
///
/// Owns the canonical node store and the current root. Stepping swaps the
/// root for its one-generation successor; everything else is bookkeeping.
pub struct World {
    store: NodeStore,
    root: NodeId,
    generation: u64,
    options: WorldOptions,
    pow2: Pow2Table,
}

impl World {
    pub fn new() -> Self {
        Self::with_options(WorldOptions::default())
    }

    pub fn with_options(options: WorldOptions) -> Self {
        let mut store = NodeStore::new();
        let root = store.empty(options.start_level.max(3));

        Self {
            store,
            root,
            generation: 0,
            options,
            pow2: Pow2Table::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn population(&self) -> u64 {
        self.store.node(self.root).population
    }

    /// The canonical node store backing this world.
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// Turn the given cells alive, growing the root as needed to contain
    /// them. Intended for initial input, but valid at any point.
    pub fn set_cells_alive(&mut self, cells: &[(Coord, Coord)]) {
        debug!(cells = cells.len(), "setting cells alive");

        for &(x, y) in cells {
            self.set_cell_alive(x, y);
        }
    }

    fn set_cell_alive(&mut self, x: Coord, y: Coord) {
        while !self.contains(x, y) {
            self.root = self.store.expand(self.root);
        }

        self.root = self.store.set_cell(self.root, x as WideCoord, y as WideCoord);
    }

    /// Whether (`x`, `y`) falls inside the root's square.
    fn contains(&self, x: Coord, y: Coord) -> bool {
        let level = self.store.node(self.root).level;

        // a level-65 square already spans every 64-bit coordinate
        if level >= 65 {
            return true;
        }

        let half = (1 as WideCoord) << (level - 1);
        let (x, y) = (x as WideCoord, y as WideCoord);

        (-half..half).contains(&x) && (-half..half).contains(&y)
    }

    /// Advance the world exactly one generation. A no-op on an empty world.
    pub fn step(&mut self) {
        if self.store.node(self.root).population == 0 {
            return;
        }

        // Expand until a dead ring surrounds the live region, so evolving
        // the root cannot lose cells at the border.
        while self.store.node(self.root).level < 3 || !self.store.has_empty_border(self.root) {
            self.root = self.store.expand(self.root);
        }

        let evolved = self.store.evolve(self.root);
        self.root = self.store.compact(evolved);
        self.generation += 1;

        if self.should_reclaim() {
            let reclaimed = self.store.sweep(self.root);
            debug!(generation = self.generation, reclaimed, "reclaimed nodes");
        }
    }

    fn should_reclaim(&self) -> bool {
        match self.options.reclaim {
            ReclaimPolicy::Off => false,
            ReclaimPolicy::EveryGenerations(n) => n > 0 && self.generation % n == 0,
            ReclaimPolicy::StoreThreshold(n) => self.store.len() > n,
        }
    }

    /// Run a mark/sweep pass immediately, regardless of policy. Returns the
    /// number of nodes reclaimed.
    pub fn reclaim(&mut self) -> usize {
        self.store.sweep(self.root)
    }

    /// Coordinates of every live cell, with the world's center at (0, 0).
    pub fn display_list(&self) -> Vec<(BigInt, BigInt)> {
        self.display_list_at(0, 0)
    }

    /// Coordinates of every live cell, with the world's center at the given
    /// origin. The list is unordered; sorting is the caller's concern.
    pub fn display_list_at(&self, origin_x: Coord, origin_y: Coord) -> Vec<(BigInt, BigInt)> {
        let mut list = Vec::new();
        self.collect_alive(
            self.root,
            BigInt::from(origin_x),
            BigInt::from(origin_y),
            &mut list,
        );
        list
    }

    fn collect_alive(
        &self,
        node: NodeId,
        ox: BigInt,
        oy: BigInt,
        list: &mut Vec<(BigInt, BigInt)>,
    ) {
        let n = self.store.node(node);

        if n.is_leaf() {
            if n.alive {
                list.push((ox, oy));
            }
            return;
        }

        if n.level == 1 {
            // the four leaves sit directly around the origin
            let one = BigInt::from(1);
            let leaves = [
                (n.nw, &ox - &one, &oy - &one),
                (n.ne, ox.clone(), &oy - &one),
                (n.sw, &ox - &one, oy.clone()),
                (n.se, ox, oy),
            ];

            for (leaf, x, y) in leaves {
                if self.store.node(leaf).alive {
                    list.push((x, y));
                }
            }
            return;
        }

        let offset = self.pow2.get(n.level - 2);
        let west = &ox - &offset;
        let east = &ox + &offset;
        let north = &oy - &offset;
        let south = &oy + &offset;

        let quads = [
            (n.nw, &west, &north),
            (n.ne, &east, &north),
            (n.sw, &west, &south),
            (n.se, &east, &south),
        ];

        for (child, x, y) in quads {
            if self.store.node(child).population > 0 {
                self.collect_alive(child, x.clone(), y.clone(), list);
            }
        }
    }

    pub fn stats(&self) -> Stats {
        let root = self.store.node(self.root);

        Stats {
            generation: self.generation,
            population: root.population,
            level: root.level,
            store_nodes: self.store.len(),
            nodes_created: self.store.created(),
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use num_bigint::BigInt;

    use super::ReclaimPolicy;
    use super::World;
    use super::WorldOptions;
    use crate::Coord;

    fn alive_set(world: &World) -> BTreeSet<(BigInt, BigInt)> {
        world.display_list().into_iter().collect()
    }

    fn coord_set(cells: &[(Coord, Coord)]) -> BTreeSet<(BigInt, BigInt)> {
        cells
            .iter()
            .map(|&(x, y)| (BigInt::from(x), BigInt::from(y)))
            .collect()
    }

    #[test]
    fn display_list_round_trips_input() {
        let cells = [(0, 0), (-7, 3), (120, -98), (2, 2)];

        let mut world = World::new();
        world.set_cells_alive(&cells);

        assert_eq!(alive_set(&world), coord_set(&cells));
        assert_eq!(world.population(), 4);
    }

    #[test]
    fn root_grows_to_contain_far_cells() {
        let mut world = World::new();
        world.set_cells_alive(&[(1 << 40, -(1 << 40))]);

        assert_eq!(world.population(), 1);
        assert!(world.stats().level >= 41);
        assert_eq!(alive_set(&world), coord_set(&[(1 << 40, -(1 << 40))]));
    }

    #[test]
    fn blinker_has_period_two() {
        let mut world = World::new();
        world.set_cells_alive(&[(0, 0), (1, 0), (2, 0)]);

        world.step();
        assert_eq!(alive_set(&world), coord_set(&[(1, -1), (1, 0), (1, 1)]));

        world.step();
        assert_eq!(alive_set(&world), coord_set(&[(0, 0), (1, 0), (2, 0)]));
        assert_eq!(world.generation(), 2);
    }

    #[test]
    fn empty_world_step_is_a_no_op() {
        let mut world = World::new();

        world.step();
        world.step();

        assert_eq!(world.generation(), 0);
        assert_eq!(world.population(), 0);
        assert!(world.display_list().is_empty());
    }

    #[test]
    fn display_origin_shifts_every_cell() {
        let mut world = World::new();
        world.set_cells_alive(&[(0, 0), (1, 1)]);

        let shifted: BTreeSet<_> = world.display_list_at(10, -20).into_iter().collect();

        assert_eq!(shifted, coord_set(&[(10, -20), (11, -19)]));
    }

    #[test]
    fn reclaim_preserves_the_live_pattern() {
        let mut world = World::new();
        world.set_cells_alive(&[(0, 0), (1, 0), (2, 0)]);

        let before = alive_set(&world);
        world.reclaim();

        assert_eq!(alive_set(&world), before);

        // stepping still works against the swept store
        world.step();
        assert_eq!(world.population(), 3);
    }

    #[test]
    fn generation_policy_reclaims_every_step() {
        let mut world = World::with_options(WorldOptions {
            reclaim: ReclaimPolicy::EveryGenerations(1),
            ..WorldOptions::default()
        });
        world.set_cells_alive(&[(0, 0), (1, 0), (2, 0)]);

        for _ in 0..4 {
            world.step();
        }

        assert_eq!(alive_set(&world), coord_set(&[(0, 0), (1, 0), (2, 0)]));

        let stats = world.stats();
        assert!(stats.store_nodes <= stats.nodes_created as usize);
    }

    #[test]
    fn stats_track_the_run() {
        let mut world = World::new();
        world.set_cells_alive(&[(0, 0), (1, 0), (0, 1), (1, 1)]);

        world.step();
        let stats = world.stats();

        assert_eq!(stats.generation, 1);
        assert_eq!(stats.population, 4);
        assert!(stats.level >= 2);
        assert!(stats.store_nodes > 0);
        assert!(stats.nodes_created >= stats.store_nodes as u64);
    }
}
