//! Link storage for one relation
//!
//! A link is a `(left, right)` pair of item ids. Each relation keeps a single
//! set, so both relationship fields read the same data.

use std::collections::BTreeSet;

use crate::registry::Side;
use crate::value::ItemId;

#[derive(Debug, Default, Clone)]
pub struct LinkSet {
    pairs: BTreeSet<(ItemId, ItemId)>,
}

impl LinkSet {
    fn pair(side: Side, item: &ItemId, other: &ItemId) -> (ItemId, ItemId) {
        match side {
            Side::Left => (item.clone(), other.clone()),
            Side::Right => (other.clone(), item.clone()),
        }
    }

    /// Items linked to `item`, where `item` sits on `side`
    pub fn linked(&self, side: Side, item: &ItemId) -> Vec<ItemId> {
        self.pairs
            .iter()
            .filter_map(|(l, r)| match side {
                Side::Left if l == item => Some(r.clone()),
                Side::Right if r == item => Some(l.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn has_links(&self, side: Side, item: &ItemId) -> bool {
        self.pairs.iter().any(|(l, r)| match side {
            Side::Left => l == item,
            Side::Right => r == item,
        })
    }

    pub fn insert(&mut self, side: Side, item: &ItemId, other: &ItemId) {
        self.pairs.insert(Self::pair(side, item, other));
    }

    pub fn remove(&mut self, side: Side, item: &ItemId, other: &ItemId) {
        self.pairs.remove(&Self::pair(side, item, other));
    }

    /// Drop every link of `item` on `side`
    pub fn clear(&mut self, side: Side, item: &ItemId) {
        self.pairs.retain(|(l, r)| match side {
            Side::Left => l != item,
            Side::Right => r != item,
        });
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
