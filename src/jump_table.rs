//! Per-node dispatch table search.
//!
//! Given the distinct (folded) bytes a node branches on, find the smallest
//! power-of-two table and a right shift such that `(b >> shift) & mask` sends
//! every byte to its own slot.

/// Largest right shift tried at each table size.
pub(crate) const MAX_SHIFT: u8 = 5;

/// Table size at which `shift = 0` is injective over any byte.
pub(crate) const MAX_LEN: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct JumpTable {
    pub shift: u8,
    pub mask: u8,
}

impl JumpTable {
    pub const TRIVIAL: JumpTable = JumpTable { shift: 0, mask: 0 };

    #[inline]
    pub fn len(self) -> usize {
        self.mask as usize + 1
    }

    #[inline]
    pub fn slot(self, b: u8) -> usize {
        ((b >> self.shift) & self.mask) as usize
    }
}

/// `codes` must be non-empty and pairwise distinct.
pub(crate) fn optimize(codes: &[u8]) -> JumpTable {
    debug_assert!(!codes.is_empty());
    if codes.len() == 1 {
        return JumpTable::TRIVIAL;
    }

    let mut len = codes.len().next_power_of_two();
    let mut seen = [false; MAX_LEN];
    while len < MAX_LEN {
        let mask = (len - 1) as u8;
        for shift in 0..=MAX_SHIFT {
            let table = JumpTable { shift, mask };
            if is_injective(table, codes, &mut seen[..len]) {
                return table;
            }
        }
        len *= 2;
    }

    // Full byte range: the identity mapping cannot collide.
    JumpTable {
        shift: 0,
        mask: u8::MAX,
    }
}

fn is_injective(table: JumpTable, codes: &[u8], seen: &mut [bool]) -> bool {
    seen.fill(false);
    for &c in codes {
        let slot = table.slot(c);
        if seen[slot] {
            return false;
        }
        seen[slot] = true;
    }
    true
}
