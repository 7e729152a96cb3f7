//! Ordered, id-addressed container for anything with a label and an
//! active flag.

use indexmap::IndexMap;

use super::ItemId;
use crate::error::CoreError;

/// Capabilities an [`ItemList`] needs from its elements.
pub trait Listed {
    fn label(&self) -> &str;
    fn is_active(&self) -> bool;
    fn set_active(&mut self, active: bool);
}

/// Insertion-ordered list with stable ids.
///
/// Removal compacts the order but never reuses an id, so an [`ItemId`]
/// held by a caller either resolves to the same element or to nothing.
#[derive(Debug)]
pub struct ItemList<T> {
    items: IndexMap<ItemId, T>,
    next_id: u64,
}

impl<T> Default for ItemList<T> {
    fn default() -> Self {
        Self {
            items: IndexMap::new(),
            next_id: 1,
        }
    }
}

impl<T: Listed> ItemList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` and return its freshly allocated id.
    pub fn push(&mut self, item: T) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        self.items.insert(id, item);
        id
    }

    /// Remove `id`, keeping the relative order of the remaining elements.
    pub fn remove(&mut self, id: ItemId) -> Option<T> {
        self.items.shift_remove(&id)
    }

    /// Exchange the positions of `a` and `b`.
    pub fn swap(&mut self, a: ItemId, b: ItemId) -> Result<(), CoreError> {
        let ia = self.position(a).ok_or(CoreError::ItemNotFound { id: a })?;
        let ib = self.position(b).ok_or(CoreError::ItemNotFound { id: b })?;
        self.items.swap_indices(ia, ib);
        Ok(())
    }

    pub fn get(&self, id: ItemId) -> Option<&T> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut T> {
        self.items.get_mut(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn position(&self, id: ItemId) -> Option<usize> {
        self.items.get_index_of(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Elements in their current order.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &T)> {
        self.items.iter().map(|(id, item)| (*id, item))
    }

    pub fn has_active(&self) -> bool {
        self.items.values().any(Listed::is_active)
    }

    /// The first active element, if any.
    pub fn active(&self) -> Option<(ItemId, &T)> {
        self.iter().find(|(_, item)| item.is_active())
    }

    pub fn is_active(&self, id: ItemId) -> bool {
        self.get(id).is_some_and(Listed::is_active)
    }
}
