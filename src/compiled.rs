//! Lookup through a program specialized to one key set.
//!
//! The node table is lowered once into a flat decision tree: length guards,
//! end-of-query checks and jump-table switches with constant operands. Shared
//! prefixes, blank slots and single-child hops produce no ops at all. The
//! program only narrows a query down to one candidate key; the caller still
//! compares the whole key before reporting a match.

use std::fmt;

use crate::case::{CaseFold, CaseMode};
use crate::tracing_macros::debug;
use crate::node::{Node, NodeTable};

/// Address of the shared `Fail` op.
const FAIL: u32 = 0;

/// One instruction of a compiled [`Program`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// Fail unless the query holds at least `min_len` bytes.
    Guard { min_len: u32 },
    /// Resolve to `candidate` if the query is exactly `at` bytes long.
    EndsAt { at: u32, candidate: Option<u32> },
    /// Jump through `targets[table + ((fold(query[at]) >> shift) & mask)]`.
    Switch {
        at: u32,
        shift: u8,
        mask: u8,
        table: u32,
    },
    /// The only key the query can still equal.
    Candidate(u32),
    Fail,
}

/// Decision tree generated for one key set and case mode.
#[derive(Clone, Debug)]
pub struct Program {
    ops: Box<[Op]>,
    targets: Box<[u32]>,
    entry: u32,
    mode: CaseMode,
}

impl Program {
    pub(crate) fn compile(table: &NodeTable, mode: CaseMode) -> Self {
        let mut compiler = Compiler {
            nodes: &table.nodes,
            min_lens: table.min_descendant_lengths(),
            ops: vec![Op::Fail],
            targets: Vec::new(),
        };

        let entry = if table.keys.is_empty() {
            FAIL
        } else {
            let root = table.root();
            // The length filter has already proven `min_len` by the time the
            // program runs.
            compiler.emit(root.skip as usize, table.min_len);
            1
        };

        debug!(
            ops = compiler.ops.len(),
            jump_slots = compiler.targets.len(),
            nodes = table.nodes.len(),
            "program compiled"
        );

        Self {
            ops: compiler.ops.into_boxed_slice(),
            targets: compiler.targets.into_boxed_slice(),
            entry,
            mode,
        }
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn case_mode(&self) -> CaseMode {
        self.mode
    }

    pub fn memory_usage(&self) -> usize {
        self.ops.len() * std::mem::size_of::<Op>()
            + self.targets.len() * std::mem::size_of::<u32>()
    }

    /// Candidate key index for `query`. Length-filter rejects must be handled
    /// by the caller.
    #[inline]
    pub(crate) fn run<C: CaseFold>(&self, query: &[u8]) -> Option<u32> {
        debug_assert_eq!(C::MODE, self.mode);
        let len = query.len();
        let mut pc = self.entry as usize;
        loop {
            match self.ops[pc] {
                Op::Guard { min_len } => {
                    if len < min_len as usize {
                        return None;
                    }
                    pc += 1;
                }
                Op::EndsAt { at, candidate } => {
                    if len == at as usize {
                        return candidate;
                    }
                    pc += 1;
                }
                Op::Switch {
                    at,
                    shift,
                    mask,
                    table,
                } => {
                    let b = *query.get(at as usize)?;
                    let slot = ((C::fold(b) >> shift) & mask) as usize;
                    pc = self.targets[table as usize + slot] as usize;
                }
                Op::Candidate(index) => return Some(index),
                Op::Fail => return None,
            }
        }
    }
}

/// Index of the key equal to `query` under `C`, if any.
#[inline]
pub(crate) fn find<C: CaseFold>(table: &NodeTable, program: &Program, query: &[u8]) -> Option<u32> {
    if table.rejects_len(query.len()) {
        return None;
    }
    let candidate = program.run::<C>(query)?;
    C::eq(table.key(candidate), query).then_some(candidate)
}

struct Compiler<'a> {
    nodes: &'a [Node],
    min_lens: Vec<usize>,
    ops: Vec<Op>,
    targets: Vec<u32>,
}

/// A node still to be lowered.
struct Frame {
    index: usize,
    /// Query offset the node dispatches on.
    read: usize,
    /// Longest minimum length an enclosing guard already enforced.
    checked: usize,
    /// Jump slot to point at the node's first op.
    target: Option<usize>,
}

impl Compiler<'_> {
    /// Lowers the tree below the root in depth-first order, so every subtree
    /// occupies one contiguous run of ops.
    fn emit(&mut self, read: usize, checked: usize) {
        let mut work = vec![Frame {
            index: 0,
            read,
            checked,
            target: None,
        }];
        while let Some(frame) = work.pop() {
            if let Some(target) = frame.target {
                self.targets[target] = self.ops.len() as u32;
            }
            self.emit_node(frame, &mut work);
        }
    }

    fn emit_node(&mut self, frame: Frame, work: &mut Vec<Frame>) {
        let Frame {
            index,
            read,
            mut checked,
            ..
        } = frame;
        let node = self.nodes[index];
        if !node.has_children() {
            debug_assert!(!node.is_blank(), "blank slots are never emitted");
            self.ops.push(node.result().map_or(Op::Fail, Op::Candidate));
            return;
        }

        let min_len = self.min_lens[index];
        if min_len > checked {
            self.ops.push(Op::Guard {
                min_len: min_len as u32,
            });
            checked = min_len;
        }

        // Past this point the query is known to be at least `read` bytes.
        debug_assert!(checked >= read);
        if checked == read {
            self.ops.push(Op::EndsAt {
                at: read as u32,
                candidate: node.result(),
            });
        }

        let base = node.base as usize;
        if node.mask == 0 {
            let child = self.nodes[base];
            if child.is_blank() {
                self.ops.push(Op::Fail);
            } else {
                work.push(Frame {
                    index: base,
                    read: read + child.skip as usize,
                    checked,
                    target: None,
                });
            }
            return;
        }

        let table = self.targets.len();
        self.targets
            .extend(std::iter::repeat(FAIL).take(node.fanout()));
        self.ops.push(Op::Switch {
            at: read as u32,
            shift: node.shift,
            mask: node.mask,
            table: table as u32,
        });

        for slot in (0..node.fanout()).rev() {
            let child = self.nodes[base + slot];
            if child.is_blank() {
                continue;
            }
            work.push(Frame {
                index: base + slot,
                read: read + child.skip as usize,
                checked,
                target: Some(table + slot),
            });
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Op::Guard { min_len } => write!(f, "guard   len >= {min_len}"),
            Op::EndsAt {
                at,
                candidate: Some(c),
            } => write!(f, "ends_at {at} -> key {c}"),
            Op::EndsAt {
                at,
                candidate: None,
            } => write!(f, "ends_at {at} -> fail"),
            Op::Switch {
                at, shift, mask, ..
            } => write!(f, "switch  (key[{at}] >> {shift}) & {mask:#x}"),
            Op::Candidate(c) => write!(f, "key     {c}"),
            Op::Fail => f.write_str("fail"),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "; {:?} program, {} ops, {} jump slots, entry {:04}",
            self.mode,
            self.ops.len(),
            self.targets.len(),
            self.entry
        )?;
        for (pc, op) in self.ops.iter().enumerate() {
            write!(f, "{pc:04}  {op}")?;
            if let Op::Switch { mask, table, .. } = *op {
                let start = table as usize;
                for (slot, &target) in self.targets[start..=start + mask as usize].iter().enumerate() {
                    if target != FAIL {
                        write!(f, "\n        {slot:>3} => {target:04}")?;
                    }
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
