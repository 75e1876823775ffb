use std::hash::Hash;
use std::hash::Hasher;

/// Index of a node in the store's arena.
///
/// 32 bits keep the node payload compact; the arena runs out of memory long
/// before it runs out of indices.
pub type NodeId = u32;

/// Sentinel for "not pointing at anything": a leaf's children, or an
/// evolution result that hasn't been computed yet.
pub(crate) const UNSET: NodeId = NodeId::MAX;

/// A canonical quadtree node.
///
/// A node at level `L` covers a `2^L x 2^L` square spanning
/// `[-2^(L-1), 2^(L-1) - 1]` on both axes. `nw` covers `x < 0, y < 0` and
/// `y` grows downward. Leaves (level 0) are single cells and leave their
/// child slots unset.
///
/// Nodes are immutable once interned, except for the lazily filled
/// `evolved` memo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Node {
    pub nw: NodeId,
    pub ne: NodeId,
    pub sw: NodeId,
    pub se: NodeId,

    /// This node's center square one generation forward, once computed.
    pub(crate) evolved: NodeId,

    pub level: u32,

    /// Count of live cells in the subtree.
    pub population: u64,

    /// For leaves, whether the cell is alive; for branches, whether any
    /// descendant is.
    pub alive: bool,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        self.level == 0
    }

    /// The memoized one-step evolution result, if it has been computed.
    pub fn evolved(&self) -> Option<NodeId> {
        (self.evolved != UNSET).then_some(self.evolved)
    }
}

/// Structural identity of a node: the canonicalization key.
///
/// Two nodes are the same canonical value iff their keys are equal.
/// Children compare by identity because they are themselves canonical.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKey {
    Leaf {
        alive: bool,
    },
    Branch {
        level: u32,
        nw: NodeId,
        ne: NodeId,
        sw: NodeId,
        se: NodeId,
    },
}

impl Hash for NodeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match *self {
            NodeKey::Leaf { alive } => state.write_u64(alive as u64),
            NodeKey::Branch {
                level,
                nw,
                ne,
                sw,
                se,
            } => {
                // Child identities mixed with small odd multipliers.
                let mut h = nw as u64;
                h = h.wrapping_mul(3).wrapping_add(ne as u64);
                h = h.wrapping_mul(3).wrapping_add(sw as u64);
                h = h.wrapping_mul(3).wrapping_add(se as u64);
                h = h.wrapping_mul(11).wrapping_add(level as u64);
                state.write_u64(h);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::Hash;
    use std::hash::Hasher;

    use super::NodeKey;

    fn hash_of(key: &NodeKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn equal_keys_hash_alike() {
        let a = NodeKey::Branch {
            level: 2,
            nw: 0,
            ne: 1,
            sw: 2,
            se: 3,
        };
        let b = NodeKey::Branch {
            level: 2,
            nw: 0,
            ne: 1,
            sw: 2,
            se: 3,
        };

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn child_order_changes_the_hash() {
        let a = NodeKey::Branch {
            level: 1,
            nw: 4,
            ne: 5,
            sw: 6,
            se: 7,
        };
        let b = NodeKey::Branch {
            level: 1,
            nw: 7,
            ne: 6,
            sw: 5,
            se: 4,
        };

        assert_ne!(a, b);
        assert_ne!(hash_of(&a), hash_of(&b));
    }
}
