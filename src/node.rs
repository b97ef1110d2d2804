//! Flattened node array and the key metadata both engines share.

// =============================================================================
// Node
// =============================================================================

/// One slot of the flattened trie.
///
/// Children of a branching node live in `mask + 1` contiguous slots starting
/// at `base`. A slot is selected by `(fold(byte) >> shift) & mask`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Node {
    /// Bytes consumed between the parent's decision point and this one.
    pub skip: u32,
    /// First slot of the child block, or [`Node::NONE`] for terminal nodes.
    pub base: u32,
    pub shift: u8,
    pub mask: u8,
    /// Index of the key ending exactly here, or [`Node::NONE`].
    pub result: u32,
}

impl Node {
    pub const NONE: u32 = u32::MAX;

    /// Unused slot in a child block. Never matches.
    pub const BLANK: Node = Node {
        skip: 0,
        base: Self::NONE,
        shift: 0,
        mask: 0,
        result: Self::NONE,
    };

    #[inline]
    pub fn leaf(skip: u32, result: u32) -> Self {
        Self {
            skip,
            base: Self::NONE,
            shift: 0,
            mask: 0,
            result,
        }
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.base != Self::NONE
    }

    #[inline]
    pub fn result(&self) -> Option<u32> {
        (self.result != Self::NONE).then_some(self.result)
    }

    #[inline]
    pub fn is_blank(&self) -> bool {
        !self.has_children() && self.result == Self::NONE
    }

    /// Number of slots in the child block (0 for terminal nodes).
    #[inline]
    pub fn fanout(&self) -> usize {
        if self.has_children() {
            self.mask as usize + 1
        } else {
            0
        }
    }

    #[inline]
    pub fn slot(&self, folded: u8) -> usize {
        ((folded >> self.shift) & self.mask) as usize
    }
}

// =============================================================================
// Node table
// =============================================================================

/// Output of the builder: nodes plus the key set and its length summary.
///
/// Immutable once built; every lookup only reads it.
#[derive(Clone, Debug)]
pub(crate) struct NodeTable {
    pub nodes: Box<[Node]>,
    pub keys: Box<[Box<str>]>,
    pub min_len: usize,
    pub max_len: usize,
    /// Bit `i` is set iff some key has `len % 64 == i`.
    pub length_filter: u64,
}

impl NodeTable {
    pub fn new(nodes: Vec<Node>, keys: Box<[Box<str>]>) -> Self {
        let mut min_len = usize::MAX;
        let mut max_len = 0;
        let mut length_filter = 0u64;
        for key in keys.iter() {
            min_len = min_len.min(key.len());
            max_len = max_len.max(key.len());
            length_filter |= 1u64 << (key.len() & 63);
        }
        Self {
            nodes: nodes.into_boxed_slice(),
            keys,
            min_len,
            max_len,
            length_filter,
        }
    }

    /// O(1) reject for lengths no key can have.
    #[inline]
    pub fn rejects_len(&self, len: usize) -> bool {
        self.length_filter & (1u64 << (len & 63)) == 0 || len < self.min_len || len > self.max_len
    }

    #[inline]
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    #[inline]
    pub fn key(&self, index: u32) -> &[u8] {
        self.keys[index as usize].as_bytes()
    }

    /// Smallest key length reachable below each node, `usize::MAX` for blanks.
    ///
    /// Children always sit at higher indices than their parent, so one reverse
    /// sweep sees every child before its parent.
    pub fn min_descendant_lengths(&self) -> Vec<usize> {
        let mut out = vec![usize::MAX; self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate().rev() {
            let mut min = node.result().map_or(usize::MAX, |r| self.key(r).len());
            if node.has_children() {
                let base = node.base as usize;
                debug_assert!(base > i, "child block must follow its parent");
                for &child in &out[base..base + node.fanout()] {
                    min = min.min(child);
                }
            }
            out[i] = min;
        }
        out
    }

    pub fn memory_usage(&self) -> usize {
        self.nodes.len() * std::mem::size_of::<Node>()
            + self.keys.len() * std::mem::size_of::<Box<str>>()
            + self.keys.iter().map(|k| k.len()).sum::<usize>()
    }
}
