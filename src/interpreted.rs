//! Lookup by walking the node array directly.

use crate::case::CaseFold;
use crate::node::NodeTable;

/// Index of the key equal to `query` under `C`, if any.
#[inline]
pub(crate) fn find<C: CaseFold>(table: &NodeTable, query: &[u8]) -> Option<u32> {
    let len = query.len();
    if table.rejects_len(len) {
        return None;
    }

    let nodes = &*table.nodes;
    let mut node = table.root();
    let mut cursor = node.skip as usize;

    while cursor <= len {
        if cursor == len || !node.has_children() {
            let candidate = node.result()?;
            return C::eq(table.key(candidate), query).then_some(candidate);
        }

        let slot = node.slot(C::fold(query[cursor]));
        debug_assert!(node.base as usize + slot < nodes.len(), "jump out of bounds");
        node = nodes.get(node.base as usize + slot)?;
        cursor += node.skip as usize;
    }

    // Every key below `node` is longer than the query.
    None
}
