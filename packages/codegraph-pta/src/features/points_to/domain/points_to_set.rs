//! Monotone points-to sets
//!
//! Objects keep insertion order so deltas and iteration are deterministic.
//! Sets only grow.

use super::cs_element::CSObj;
use rustc_hash::FxHashSet;

#[derive(Debug, Clone, Default)]
pub struct PointsToSet {
    objects: Vec<CSObj>,
    index: FxHashSet<CSObj>,
}

impl PointsToSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(obj: CSObj) -> Self {
        let mut set = Self::new();
        set.add(obj);
        set
    }

    /// Returns `true` if `obj` was not already present
    pub fn add(&mut self, obj: CSObj) -> bool {
        if self.index.insert(obj) {
            self.objects.push(obj);
            true
        } else {
            false
        }
    }

    /// Add every object of `other`, returning the ones that were new
    pub fn add_all(&mut self, other: &PointsToSet) -> PointsToSet {
        let mut delta = PointsToSet::new();
        for obj in other.iter() {
            if self.add(obj) {
                delta.add(obj);
            }
        }
        delta
    }

    #[inline]
    pub fn contains(&self, obj: CSObj) -> bool {
        self.index.contains(&obj)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = CSObj> + '_ {
        self.objects.iter().copied()
    }
}

impl PartialEq for PointsToSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|o| other.contains(o))
    }
}

impl Eq for PointsToSet {}

impl FromIterator<CSObj> for PointsToSet {
    fn from_iter<I: IntoIterator<Item = CSObj>>(iter: I) -> Self {
        let mut set = PointsToSet::new();
        for obj in iter {
            set.add(obj);
        }
        set
    }
}

impl<'a> IntoIterator for &'a PointsToSet {
    type Item = CSObj;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, CSObj>>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.iter().copied()
    }
}
