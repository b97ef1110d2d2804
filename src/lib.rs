//! # jump-trie
//!
//! An immutable, read-optimized map from strings to values.
//!
//! The key set is fixed at construction and compiled into a flattened trie.
//! Each branching node dispatches on one byte through a minimal
//! power-of-two jump table addressed by `(byte >> shift) & mask`, so a lookup
//! touches one node per divergence point and finishes with a single
//! whole-key comparison.
//!
//! Two engines walk the same trie and always agree:
//! - [`Engine::Interpreted`] reads the node array at query time.
//! - [`Engine::Compiled`] lowers the trie into a [`Program`] specialized to
//!   the key set, with minimum-length guards and no code for empty slots.
//!
//! ## Example
//!
//! ```rust
//! use jump_trie::{Engine, FrozenTrie, Options};
//!
//! let trie = FrozenTrie::from_pairs(
//!     [("One", 1), ("Two", 2), ("Three", 3)],
//!     Options::new().ignore_case(true).engine(Engine::Compiled),
//! )
//! .unwrap();
//!
//! assert_eq!(trie.get("one"), Some(&1));
//! assert_eq!(trie.get("THREE"), Some(&3));
//! assert_eq!(trie.get("four"), None);
//! ```

#![forbid(unsafe_code)]

mod tracing_macros;

mod builder;
pub mod case;
pub mod compiled;
mod error;
mod interpreted;
mod jump_table;
mod node;

pub use case::CaseMode;
pub use compiled::{Op, Program};
pub use error::{BuildError, Result};

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use builder::TrieBuilder;
use case::{AsciiFold, CaseFold, Sensitive};
use node::NodeTable;

// =============================================================================
// Configuration
// =============================================================================

/// Which lookup engine answers queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum Engine {
    /// Walk the node array.
    #[default]
    Interpreted,
    /// Run a decision-tree program generated at construction.
    Compiled,
}

/// Construction options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Options {
    pub case: CaseMode,
    pub engine: Engine,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.case = CaseMode::from_ignore_case(ignore_case);
        self
    }

    pub fn case_mode(mut self, case: CaseMode) -> Self {
        self.case = case;
        self
    }

    pub fn engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }
}

// =============================================================================
// FrozenTrie
// =============================================================================

#[derive(Clone, Debug)]
enum Resolver {
    Interpreted,
    Compiled(Program),
}

/// Immutable string map built once from a fixed key set.
///
/// Safe to share between threads; lookups only read.
#[derive(Clone)]
pub struct FrozenTrie<V> {
    table: NodeTable,
    values: Box<[V]>,
    case: CaseMode,
    resolver: Resolver,
}

impl<V> FrozenTrie<V> {
    /// Builds a trie from parallel key and value lists.
    ///
    /// Keys must be distinct under `options.case`; use
    /// [`from_pairs`](Self::from_pairs) to deduplicate first. In insensitive
    /// mode they must also stay distinct with bit `0x20` set on every byte.
    pub fn build(keys: Vec<String>, values: Vec<V>, options: Options) -> Result<Self> {
        if keys.len() != values.len() {
            return Err(BuildError::LengthMismatch {
                keys: keys.len(),
                values: values.len(),
            });
        }
        if keys.len() >= node::Node::NONE as usize {
            return Err(BuildError::TooManyKeys(keys.len()));
        }

        let keys: Box<[Box<str>]> = keys.into_iter().map(String::into_boxed_str).collect();
        let nodes = match options.case {
            CaseMode::Sensitive => build_nodes::<Sensitive>(&keys)?,
            CaseMode::Insensitive => build_nodes::<AsciiFold>(&keys)?,
        };
        let table = NodeTable::new(nodes, keys);

        let resolver = match options.engine {
            Engine::Interpreted => Resolver::Interpreted,
            Engine::Compiled => Resolver::Compiled(Program::compile(&table, options.case)),
        };

        Ok(Self {
            table,
            values: values.into_boxed_slice(),
            case: options.case,
            resolver,
        })
    }

    /// Builds a trie from arbitrary key/value pairs.
    ///
    /// Keys equal under `options.case` are merged: the first spelling and
    /// position are kept, the last value wins.
    ///
    /// Fails with [`BuildError::FoldCollision`] if two distinct keys cannot
    /// be told apart case-insensitively, or with [`BuildError::TooManyKeys`].
    pub fn from_pairs<K, I>(pairs: I, options: Options) -> Result<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let normalize: fn(&[u8]) -> Vec<u8> = match options.case {
            CaseMode::Sensitive => Sensitive::normalize,
            CaseMode::Insensitive => AsciiFold::normalize,
        };

        let mut seen: HashMap<Vec<u8>, usize> = HashMap::new();
        let mut keys = Vec::new();
        let mut values = Vec::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            match seen.entry(normalize(key.as_bytes())) {
                Entry::Occupied(e) => values[*e.get()] = value,
                Entry::Vacant(e) => {
                    e.insert(keys.len());
                    keys.push(key.to_owned());
                    values.push(value);
                }
            }
        }

        Self::build(keys, values, options)
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.find(key.as_bytes()).map(|i| &self.values[i as usize])
    }

    /// Returns the stored spelling of the matching key along with its value.
    pub fn get_key_value(&self, key: &str) -> Option<(&str, &V)> {
        self.find(key.as_bytes())
            .map(|i| (&*self.table.keys[i as usize], &self.values[i as usize]))
    }

    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.find(key.as_bytes()).is_some()
    }

    #[inline]
    fn find(&self, key: &[u8]) -> Option<u32> {
        match (&self.resolver, self.case) {
            (Resolver::Interpreted, CaseMode::Sensitive) => {
                interpreted::find::<Sensitive>(&self.table, key)
            }
            (Resolver::Interpreted, CaseMode::Insensitive) => {
                interpreted::find::<AsciiFold>(&self.table, key)
            }
            (Resolver::Compiled(program), CaseMode::Sensitive) => {
                compiled::find::<Sensitive>(&self.table, program, key)
            }
            (Resolver::Compiled(program), CaseMode::Insensitive) => {
                compiled::find::<AsciiFold>(&self.table, program, key)
            }
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn case_mode(&self) -> CaseMode {
        self.case
    }

    pub fn engine(&self) -> Engine {
        match self.resolver {
            Resolver::Interpreted => Engine::Interpreted,
            Resolver::Compiled(_) => Engine::Compiled,
        }
    }

    /// The generated program, for [`Engine::Compiled`] tries.
    pub fn program(&self) -> Option<&Program> {
        match &self.resolver {
            Resolver::Interpreted => None,
            Resolver::Compiled(program) => Some(program),
        }
    }

    pub fn min_key_len(&self) -> Option<usize> {
        (!self.is_empty()).then_some(self.table.min_len)
    }

    pub fn max_key_len(&self) -> Option<usize> {
        (!self.is_empty()).then_some(self.table.max_len)
    }

    /// Heap bytes held by the trie, excluding anything owned by the values.
    pub fn memory_usage(&self) -> usize {
        self.table.memory_usage()
            + self.values.len() * std::mem::size_of::<V>()
            + self.program().map_or(0, Program::memory_usage)
    }

    /// Entries in construction order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            keys: self.table.keys.iter(),
            values: self.values.iter(),
        }
    }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.table.keys.iter().map(|k| &**k)
    }

    pub fn values(&self) -> std::slice::Iter<'_, V> {
        self.values.iter()
    }
}

/// Keys must be pairwise distinct after the dispatch fold; a pair that folds
/// together is either a duplicate or a collision.
fn build_nodes<C: CaseFold>(keys: &[Box<str>]) -> Result<Vec<node::Node>> {
    let mut seen: HashMap<Vec<u8>, usize> = HashMap::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        if let Some(first) = seen.insert(C::folded(key.as_bytes()), i) {
            return Err(if C::eq(keys[first].as_bytes(), key.as_bytes()) {
                BuildError::DuplicateKey { first, second: i }
            } else {
                BuildError::FoldCollision { first, second: i }
            });
        }
    }
    Ok(TrieBuilder::<C>::new(keys).build())
}

impl<K: AsRef<str>, V> FromIterator<(K, V)> for FrozenTrie<V> {
    /// Case-sensitive, interpreted.
    ///
    /// # Panics
    ///
    /// If there are `u32::MAX` or more distinct keys.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        match Self::from_pairs(iter, Options::default()) {
            Ok(trie) => trie,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for FrozenTrie<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, V> IntoIterator for &'a FrozenTrie<V> {
    type Item = (&'a str, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'a, V> {
    keys: std::slice::Iter<'a, Box<str>>,
    values: std::slice::Iter<'a, V>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        Some((&**self.keys.next()?, self.values.next()?))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}


#[cfg(test)]
mod proptests;
