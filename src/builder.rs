//! Compiles a key set into the flattened node array.
//!
//! Each call partitions the active keys at their first divergence point. The
//! skipped bytes are never checked while walking; a candidate is only accepted
//! after a whole-key comparison, so the trie only has to discriminate.

use std::marker::PhantomData;

use crate::case::CaseFold;
use crate::jump_table::{self, JumpTable};
use crate::node::Node;
use crate::tracing_macros::{debug, trace};

pub(crate) struct TrieBuilder<'a, C> {
    keys: &'a [Box<str>],
    nodes: Vec<Node>,
    _case: PhantomData<C>,
}

/// A node whose slot is allocated but not yet filled.
struct Pending {
    slot: usize,
    entries: Vec<u32>,
    /// Offset the parent dispatched on; every entry agrees on the folded
    /// bytes up to and including it.
    comparison: usize,
    is_root: bool,
}

impl<'a, C: CaseFold> TrieBuilder<'a, C> {
    /// `keys` must be pairwise distinct after `C::fold`.
    pub fn new(keys: &'a [Box<str>]) -> Self {
        Self {
            keys,
            nodes: Vec::new(),
            _case: PhantomData,
        }
    }

    pub fn build(mut self) -> Vec<Node> {
        self.nodes.push(Node::BLANK);
        if !self.keys.is_empty() {
            // Depth-first, children pushed in reverse so blocks are laid out
            // in the order a recursive walk would produce. Chains of branch
            // points can be as deep as the longest key.
            let mut work = vec![Pending {
                slot: 0,
                entries: (0..self.keys.len() as u32).collect(),
                comparison: 0,
                is_root: true,
            }];
            while let Some(pending) = work.pop() {
                self.build_node(pending, &mut work);
            }
        }
        debug!(
            keys = self.keys.len(),
            nodes = self.nodes.len(),
            "trie built"
        );
        self.nodes
    }

    #[inline]
    fn key(&self, index: u32) -> &'a [u8] {
        self.keys[index as usize].as_bytes()
    }

    fn build_node(&mut self, pending: Pending, work: &mut Vec<Pending>) {
        let Pending {
            slot,
            mut entries,
            comparison,
            is_root,
        } = pending;

        if entries.len() == 1 {
            // A lone root key has consumed nothing yet, so it must not skip.
            let skip = if is_root { 0 } else { 1 };
            self.nodes[slot] = Node::leaf(skip, entries[0]);
            return;
        }

        // The root has no established prefix: start scanning at byte 0.
        let start = if is_root { 0 } else { comparison + 1 };
        let (split, terminal) = self.find_split(&entries, start);

        let result = match terminal {
            Some(pos) => entries.remove(pos),
            None => Node::NONE,
        };
        let (base, table) = self.build_children(entries, split, work);

        self.nodes[slot] = Node {
            skip: (split - comparison) as u32,
            base,
            shift: table.shift,
            mask: table.mask,
            result,
        };
    }

    /// First offset at `start` or later where some key ends or the folded bytes
    /// stop agreeing. Returns that offset and the position of the key ending
    /// there, if any.
    fn find_split(&self, entries: &[u32], start: usize) -> (usize, Option<usize>) {
        let mut at = start;
        loop {
            let mut terminal = None;
            let mut reference = None;
            let mut diverged = false;

            for (pos, &entry) in entries.iter().enumerate() {
                let key = self.key(entry);
                debug_assert!(key.len() >= at, "key shorter than its shared prefix");
                if key.len() == at {
                    debug_assert!(terminal.is_none(), "two keys fold to the same bytes");
                    terminal = Some(pos);
                    continue;
                }
                let c = C::fold(key[at]);
                match reference {
                    None => reference = Some(c),
                    Some(r) if r != c => diverged = true,
                    Some(_) => {}
                }
            }

            if terminal.is_some() || diverged {
                return (at, terminal);
            }
            at += 1;
        }
    }

    /// Groups `entries` by their folded byte at `at`, sizes a jump table over
    /// the groups, reserves the child block and queues each group for its
    /// slot.
    fn build_children(
        &mut self,
        entries: Vec<u32>,
        at: usize,
        work: &mut Vec<Pending>,
    ) -> (u32, JumpTable) {
        let mut group_of = [usize::MAX; 256];
        let mut groups: Vec<(u8, Vec<u32>)> = Vec::new();
        for entry in entries {
            let c = C::fold(self.key(entry)[at]);
            let g = &mut group_of[c as usize];
            if *g == usize::MAX {
                *g = groups.len();
                groups.push((c, Vec::new()));
            }
            groups[*g].1.push(entry);
        }

        let codes: Vec<u8> = groups.iter().map(|(c, _)| *c).collect();
        let table = jump_table::optimize(&codes);
        trace!(
            at,
            groups = groups.len(),
            slots = table.len(),
            shift = table.shift,
            "jump table"
        );

        let base = self.nodes.len();
        self.nodes
            .extend(std::iter::repeat(Node::BLANK).take(table.len()));

        work.extend(groups.into_iter().rev().map(|(c, members)| Pending {
            slot: base + table.slot(c),
            entries: members,
            comparison: at,
            is_root: false,
        }));

        debug_assert!(base <= Node::NONE as usize);
        (base as u32, table)
    }
}
