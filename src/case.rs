//! Case strategies.
//!
//! A strategy is a byte transform plus the string equality it implies. Every
//! stage (validation, building, both lookup engines) is generic over
//! [`CaseFold`], so the choice is made once per structure and the per-byte
//! work is monomorphized away.

/// How keys are compared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum CaseMode {
    /// Bytes must match exactly.
    #[default]
    Sensitive,
    /// ASCII letters match regardless of case; every other byte must match
    /// exactly. No Unicode case folding.
    ///
    /// Dispatch sets bit `0x20` on every byte, so besides letters it also
    /// routes `@`/`` ` ``, `[`/`{`, `\`/`|`, `]`/`}`, `^`/`~`, `_`/DEL and each
    /// control byte to the same branch as its counterpart. Keys that differ
    /// only in such a pair cannot share a trie and are rejected at build.
    Insensitive,
}

impl CaseMode {
    #[inline]
    pub fn from_ignore_case(ignore_case: bool) -> Self {
        if ignore_case {
            CaseMode::Insensitive
        } else {
            CaseMode::Sensitive
        }
    }

    #[inline]
    pub fn ignores_case(self) -> bool {
        self == CaseMode::Insensitive
    }

    /// Applies the mode's transform to a single byte.
    #[inline]
    pub fn fold(self, b: u8) -> u8 {
        match self {
            CaseMode::Sensitive => Sensitive::fold(b),
            CaseMode::Insensitive => AsciiFold::fold(b),
        }
    }

    /// Key equality for the mode.
    #[inline]
    pub fn equals(self, a: &[u8], b: &[u8]) -> bool {
        match self {
            CaseMode::Sensitive => Sensitive::eq(a, b),
            CaseMode::Insensitive => AsciiFold::eq(a, b),
        }
    }
}

/// Dispatch transform plus key equality.
///
/// `eq(a, b)` must imply that `fold` maps both slices to the same bytes, so
/// that equal keys always take the same branch. The converse need not hold:
/// `fold` may merge bytes `eq` keeps apart.
pub trait CaseFold: Copy + Send + Sync + 'static {
    const MODE: CaseMode;

    fn fold(b: u8) -> u8;

    fn eq(a: &[u8], b: &[u8]) -> bool;

    /// Canonical spelling of `key` under `eq`, used as a deduplication key.
    fn normalize(key: &[u8]) -> Vec<u8>;

    /// `key` as dispatch sees it.
    fn folded(key: &[u8]) -> Vec<u8> {
        key.iter().map(|&b| Self::fold(b)).collect()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Sensitive;

impl CaseFold for Sensitive {
    const MODE: CaseMode = CaseMode::Sensitive;

    #[inline(always)]
    fn fold(b: u8) -> u8 {
        b
    }

    #[inline(always)]
    fn eq(a: &[u8], b: &[u8]) -> bool {
        a == b
    }

    fn normalize(key: &[u8]) -> Vec<u8> {
        key.to_vec()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AsciiFold;

impl CaseFold for AsciiFold {
    const MODE: CaseMode = CaseMode::Insensitive;

    #[inline(always)]
    fn fold(b: u8) -> u8 {
        // Total on purpose: node layouts depend on every byte being folded.
        // Only dispatch sees this; equality is `eq`.
        b | 0x20
    }

    #[inline]
    fn eq(a: &[u8], b: &[u8]) -> bool {
        a.eq_ignore_ascii_case(b)
    }

    fn normalize(key: &[u8]) -> Vec<u8> {
        key.to_ascii_lowercase()
    }
}
