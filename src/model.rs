//! The adaptive context model.
//!
//! The model is a binary trie in which every node stands for one context: a
//! bit string that starts on a byte boundary on its left and grows bit by
//! bit on its right. A node holds up to two extension edges (the context
//! lengthened by a 0 or a 1), a suffix link to the context with its leftmost
//! byte removed, and a packed counter.
//!
//! One node is *active* at any time: the longest context currently matching
//! the coded history. It alone makes predictions. After each observed bit
//! the model walks suffix links until it finds a context that has an edge
//! for that bit, updating the statistics of every context on the way, and
//! opportunistically grows one new node per bit.
//!
//! Statistics are a probability plus a total count rather than a pair of
//! 0/1 counts: a freshly grown context inherits its parent's probability at
//! full resolution even though its own count restarts near zero. Both live
//! packed in one 32-bit word, and all links are 32-bit indices into one
//! arena, which halves the node size on 64-bit targets.

use crate::coder::PROB_BITS;
use crate::divide::divide;
use crate::error::{Error, Result};
use crate::fixed::fit0;

const P_BITS: u32 = 22;
const C_BITS: u32 = 10;
const P_SCALE: u32 = 1 << P_BITS;
const C_LIMIT: u32 = 1 << C_BITS;
const C_SCALE: u32 = 32;
const P_MASK: u32 = (P_SCALE - 1) << C_BITS;
const C_MASK: u32 = C_LIMIT - 1;

// A fresh context starts unbiased with a prior weight of twelve
// observations; a grown one keeps its parent's probability but restarts
// with a count of one and a half observations.
const P_START: u32 = P_SCALE / 2;
const C_START: u32 = C_SCALE * 12;
const C_INH: u32 = C_SCALE * 3 / 2;
const C_INC: u32 = C_SCALE;

/// Nodes in the initial order-0 trie, root included.
const INITIAL_NODES: usize = 256;

/// Model sizing knobs.
///
/// Both knobs shape the trie and therefore the coded stream itself:
/// compression and decompression must run with identical values, and
/// nothing in the stream records them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Arena budget in MiB; the trie stops growing once it is spent.
    pub memory_mib: u32,
    /// Longest context the trie may represent, in whole bytes.
    pub order_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory_mib: 128,
            order_limit: 4,
        }
    }
}

impl Config {
    fn nodes_limit(&self) -> usize {
        self.memory_mib as usize * (1 << 20) / std::mem::size_of::<Node>()
    }

    fn order_limit_bits(&self) -> i32 {
        self.order_limit
            .saturating_mul(8)
            .saturating_add(7)
            .min(i32::MAX as u32) as i32
    }
}

/// One context: two extension edges, a suffix link, and a packed
/// (probability, count) counter. Exactly 16 bytes; edges and links are
/// arena indices with 0 as the null sentinel.
#[derive(Clone, Copy, Debug)]
struct Node {
    ext0: u32,
    ext1: u32,
    sfx: u32,
    ctr: u32,
}

impl Node {
    fn initial(ext0: u32, ext1: u32, sfx: u32) -> Self {
        Self {
            ext0,
            ext1,
            sfx,
            ctr: (P_START << C_BITS) + C_START,
        }
    }

    /// A grown context inheriting the probability of the shorter context it
    /// shadows, so it starts out making useful predictions immediately.
    fn inherit(sfx: u32, parent: &Node) -> Self {
        Self {
            ext0: 0,
            ext1: 0,
            sfx,
            ctr: (parent.ctr & P_MASK) + C_INH,
        }
    }

    fn predict(&self) -> u32 {
        self.ctr >> C_BITS
    }

    /// Move the probability toward the observed bit.
    ///
    /// The step is `C_SCALE / cnt` of the remaining error, so young contexts
    /// adapt fast and saturated ones settle into a slow moving average.
    fn update(&mut self, bit: u8) {
        let mut cnt = self.ctr & C_MASK;
        let p1 = self.ctr >> C_BITS;

        if cnt < C_LIMIT - C_INC {
            cnt += C_INC;
        } else {
            cnt = C_LIMIT - 1;
        }

        let p1 = if bit == 1 {
            p1 + C_SCALE * divide(P_SCALE - p1, P_BITS, cnt, C_BITS)
        } else {
            p1 - C_SCALE * divide(p1, P_BITS, cnt, C_BITS)
        };
        debug_assert!(0 < p1 && p1 < P_SCALE);

        self.ctr = (p1 << C_BITS) + cnt;
    }

    fn ext(&self, bit: u8) -> u32 {
        if bit == 1 {
            self.ext1
        } else {
            self.ext0
        }
    }

    fn ext_mut(&mut self, bit: u8) -> &mut u32 {
        if bit == 1 {
            &mut self.ext1
        } else {
            &mut self.ext0
        }
    }
}

/// The PPM model: an arena of contexts plus the active one.
#[derive(Debug)]
pub struct Ppm {
    nodes: Vec<Node>,
    nodes_limit: usize,
    act: u32,
    /// Length of the active context in bits; briefly -1 while a byte
    /// boundary is crossed through the root.
    order: i32,
    order_limit_bits: i32,
}

impl Ppm {
    /// Build the initial order-0 model.
    ///
    /// The layout is part of the stream format: index 0 is the root (both
    /// edges lead to index 1, which is also the first active node), indices
    /// 1..=127 are the internal bit-decision nodes of a byte-wise trie, and
    /// 128..=255 are its leaves, one per completed byte. The arena is sized
    /// once from the configuration and never reallocated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MemoryLimit`] if the arena cannot hold the initial
    /// trie.
    pub fn new(config: &Config) -> Result<Self> {
        let nodes_limit = config.nodes_limit();
        if nodes_limit < INITIAL_NODES {
            return Err(Error::MemoryLimit {
                memory_mib: config.memory_mib,
            });
        }

        let mut nodes = Vec::with_capacity(nodes_limit);
        nodes.push(Node::initial(1, 1, 0));
        for dst in (2..256u32).step_by(2) {
            nodes.push(Node::initial(dst, dst + 1, 0));
        }
        for _ in 0..128 {
            nodes.push(Node::initial(0, 0, 0));
        }
        debug_assert_eq!(nodes.len(), INITIAL_NODES);

        Ok(Self {
            nodes,
            nodes_limit,
            act: 1,
            order: 0,
            order_limit_bits: config.order_limit_bits(),
        })
    }

    /// Probability that the next bit is 1, in the coder's 12-bit scale and
    /// strictly between 0 and 4096.
    pub fn predict(&self) -> u32 {
        fit0(self.nodes[self.act as usize].predict(), P_BITS, PROB_BITS)
    }

    /// Record one observed bit and advance to the context for the next one.
    ///
    /// Walks the suffix chain until a context with an edge for the bit is
    /// found, updating every context on the way (each hop shortens the
    /// match by one byte). If the walk descended at least once and both the
    /// order and memory budgets allow, the dangling edge on the longest
    /// context is redirected to a fresh node inheriting from the edge's
    /// target; an edge is only ever redirected by the node that dangled it.
    /// When either budget is exhausted the model degrades silently by
    /// descending without growing.
    pub fn update(&mut self, bit: u8) {
        self.nodes[self.act as usize].update(bit);

        let mut lst = self.act;
        while self.nodes[self.act as usize].ext(bit) == 0 {
            lst = self.act;
            self.act = self.nodes[self.act as usize].sfx;
            self.order -= 8;
            self.nodes[self.act as usize].update(bit);
        }

        let ext = self.nodes[self.act as usize].ext(bit);
        if self.act != lst
            && self.order + 9 <= self.order_limit_bits
            && self.nodes.len() < self.nodes_limit
        {
            let fresh = self.nodes.len() as u32;
            *self.nodes[lst as usize].ext_mut(bit) = fresh;
            let node = Node::inherit(ext, &self.nodes[ext as usize]);
            self.nodes.push(node);
            self.act = fresh;
            // Eight bits for the byte the suffix walk dropped, one for the
            // edge itself.
            self.order += 9;
        } else {
            self.act = ext;
            self.order += 1;
        }
    }

    /// Arena bytes in use, in whole MiB. Informational.
    pub fn used_memory_mib(&self) -> u32 {
        ((self.nodes.len() * std::mem::size_of::<Node>()) >> 20) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn small_config() -> Config {
        Config {
            memory_mib: 1,
            order_limit: 4,
        }
    }

    /// Feed whole bytes MSB-first, the way the frame driver does.
    fn feed(ppm: &mut Ppm, bytes: &[u8]) {
        for &byte in bytes {
            for shift in (0..8).rev() {
                ppm.update((byte >> shift) & 1);
            }
        }
    }

    #[test]
    fn test_node_is_sixteen_bytes() {
        assert_eq!(std::mem::size_of::<Node>(), 16);
    }

    #[test]
    fn test_initial_layout() {
        let ppm = Ppm::new(&small_config()).unwrap();
        assert_eq!(ppm.nodes.len(), 256);
        assert_eq!(ppm.act, 1);
        assert_eq!(ppm.order, 0);

        let root = &ppm.nodes[0];
        assert_eq!((root.ext0, root.ext1, root.sfx), (1, 1, 0));
        for i in 1..128 {
            let node = &ppm.nodes[i];
            assert_eq!(node.ext0, 2 * i as u32);
            assert_eq!(node.ext1, 2 * i as u32 + 1);
            assert_eq!(node.sfx, 0);
        }
        for i in 128..256 {
            let node = &ppm.nodes[i];
            assert_eq!((node.ext0, node.ext1, node.sfx), (0, 0, 0));
        }
        for node in &ppm.nodes {
            assert_eq!(node.ctr, (P_START << C_BITS) + C_START);
        }
    }

    #[test]
    fn test_first_prediction_is_unbiased() {
        let ppm = Ppm::new(&small_config()).unwrap();
        assert_eq!(ppm.predict(), 2048);
    }

    #[test]
    fn test_inherited_node_keeps_parent_probability() {
        let mut parent = Node::initial(7, 8, 3);
        parent.update(1);
        parent.update(1);
        let child = Node::inherit(9, &parent);
        assert_eq!(child.ext0, 0);
        assert_eq!(child.ext1, 0);
        assert_eq!(child.sfx, 9);
        assert_eq!(child.predict(), parent.predict());
        assert_eq!(child.ctr & C_MASK, C_INH);
    }

    #[test]
    fn test_counter_saturates() {
        let mut node = Node::initial(0, 0, 0);
        for _ in 0..2000 {
            node.update(1);
        }
        assert_eq!(node.ctr & C_MASK, C_LIMIT - 1);
        assert!(node.predict() > P_START);
    }

    #[test]
    fn test_counter_tracks_all_zero_stream() {
        let mut node = Node::initial(0, 0, 0);
        for _ in 0..2000 {
            node.update(0);
        }
        let p1 = node.predict();
        assert!(p1 > 0, "probability must never reach zero");
        assert!(p1 < P_SCALE / 64, "probability should approach zero");
    }

    #[test]
    fn test_order_zero_never_grows() {
        let mut ppm = Ppm::new(&Config {
            memory_mib: 1,
            order_limit: 0,
        })
        .unwrap();
        let bytes: Vec<u8> = (0..1024u32).map(|i| (i * 31 % 251) as u8).collect();
        feed(&mut ppm, &bytes);
        assert_eq!(ppm.nodes.len(), 256);
    }

    #[test]
    fn test_growth_saturates_at_memory_limit() {
        // 1 MiB holds 65536 nodes; varied input grows the trie until the
        // arena is full, then degrades silently.
        let mut ppm = Ppm::new(&small_config()).unwrap();
        let mut state = 0x2545_F491_4F6C_DD1Du64;
        let bytes: Vec<u8> = (0..1 << 17)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state >> 56) as u8
            })
            .collect();
        feed(&mut ppm, &bytes);
        assert_eq!(ppm.nodes.len(), ppm.nodes_limit);
        assert_eq!(ppm.used_memory_mib(), 1);
    }

    #[test]
    fn test_rejects_arena_smaller_than_initial_trie() {
        let err = Ppm::new(&Config {
            memory_mib: 0,
            order_limit: 4,
        })
        .unwrap_err();
        assert!(matches!(err, Error::MemoryLimit { memory_mib: 0 }));
    }

    #[test]
    fn test_used_memory_starts_at_zero_mib() {
        let ppm = Ppm::new(&small_config()).unwrap();
        assert_eq!(ppm.used_memory_mib(), 0);
    }

    proptest! {
        #[test]
        fn prop_predictions_stay_inside_coder_range(bytes in prop::collection::vec(any::<u8>(), 1..256)) {
            let mut ppm = Ppm::new(&small_config()).unwrap();
            for &byte in &bytes {
                for shift in (0..8).rev() {
                    let p1 = ppm.predict();
                    prop_assert!(p1 > 0 && p1 < 4096);
                    ppm.update((byte >> shift) & 1);
                }
            }
        }

        #[test]
        fn prop_node_counters_hold_invariants(bytes in prop::collection::vec(any::<u8>(), 1..256)) {
            let mut ppm = Ppm::new(&small_config()).unwrap();
            feed(&mut ppm, &bytes);
            for node in &ppm.nodes {
                let p1 = node.ctr >> C_BITS;
                let cnt = node.ctr & C_MASK;
                prop_assert!(p1 > 0 && p1 < P_SCALE);
                prop_assert!(cnt < C_LIMIT);
            }
        }

        #[test]
        fn prop_edges_point_to_live_nodes(bytes in prop::collection::vec(any::<u8>(), 1..128)) {
            let mut ppm = Ppm::new(&small_config()).unwrap();
            feed(&mut ppm, &bytes);
            let live = ppm.nodes.len() as u32;
            for node in &ppm.nodes {
                prop_assert!(node.ext0 < live);
                prop_assert!(node.ext1 < live);
                prop_assert!(node.sfx < live);
            }
        }
    }
}
