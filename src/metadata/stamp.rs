//! Merge primitives keyed by declaration sequence
//!
//! Annotations may be applied in any order. Every field of a metadata record
//! is stored through one of these primitives so that applying the same set of
//! annotations in any permutation, or applying one twice, yields the same
//! record.

/// Position of an annotation in declaration order
pub type Seq = u64;

/// A value tagged with the declaration that wrote it
#[derive(Debug, Clone, PartialEq)]
pub struct Stamped<T> {
    pub seq: Seq,
    pub value: T,
}

/// Single-valued slot: the latest declaration wins, whatever the apply order
pub(crate) fn offer<T>(slot: &mut Option<Stamped<T>>, seq: Seq, value: T) {
    match slot {
        Some(existing) if existing.seq > seq => {}
        _ => *slot = Some(Stamped { seq, value }),
    }
}

/// List kept sorted by declaration sequence, one entry per declaration
#[derive(Debug, Clone, PartialEq)]
pub struct SeqList<T>(Vec<Stamped<T>>);

impl<T> Default for SeqList<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> SeqList<T> {
    /// Insert at the position given by `seq`; a second insert of the same
    /// declaration is ignored
    pub(crate) fn insert(&mut self, seq: Seq, value: T) {
        if let Err(pos) = self.0.binary_search_by_key(&seq, |s| s.seq) {
            self.0.insert(pos, Stamped { seq, value });
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.iter().map(|s| &s.value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
