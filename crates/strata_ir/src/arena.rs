//! Append-only storage for modules, operations, values and blocks.
//!
//! Entities are never removed while a pass runs; an erased operation stays
//! in its arena and is only unlinked from its block. IDs therefore remain
//! valid for the lifetime of the body that handed them out.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// A typed index into an [`Arena`].
pub trait ArenaId: Copy {
    /// The ID at position `index`.
    fn from_index(index: usize) -> Self;

    /// Position of this ID in its arena.
    fn index(self) -> usize;
}

/// A `Vec<T>` addressed by `I` instead of `usize`.
///
/// In JSON an arena is the bare list of its items; the position of an item
/// is its ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arena<I, T> {
    items: Vec<T>,
    #[serde(skip)]
    key: PhantomData<fn() -> I>,
}

impl<I, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            key: PhantomData,
        }
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    /// An empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `item` and returns its ID.
    pub fn alloc(&mut self, item: T) -> I {
        let id = self.next_id();
        self.items.push(item);
        id
    }

    /// The ID the next [`alloc`](Self::alloc) will hand out.
    pub fn next_id(&self) -> I {
        I::from_index(self.items.len())
    }

    /// The item behind `id`. Panics on an ID from another arena.
    pub fn get(&self, id: I) -> &T {
        &self.items[id.index()]
    }

    /// Mutable access to the item behind `id`.
    pub fn get_mut(&mut self, id: I) -> &mut T {
        &mut self.items[id.index()]
    }

    /// The item behind `id`, or `None` if `id` is out of range.
    pub fn try_get(&self, id: I) -> Option<&T> {
        self.items.get(id.index())
    }

    /// Whether `id` is in range for this arena.
    pub fn contains(&self, id: I) -> bool {
        id.index() < self.items.len()
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing has been allocated.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `(id, item)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> + '_ {
        self.items.iter().enumerate().map(|(i, item)| (I::from_index(i), item))
    }

    /// Items in allocation order.
    pub fn values(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// All items; position `i` holds the item of `I::from_index(i)`.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// All items, mutably. Used to hand modules to rayon workers.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        self.get(id)
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        self.get_mut(id)
    }
}

impl<I, T> FromIterator<T> for Arena<I, T> {
    fn from_iter<It: IntoIterator<Item = T>>(iter: It) -> Self {
        Self {
            items: iter.into_iter().collect(),
            key: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ModuleId, ValueId};

    #[test]
    fn ids_follow_allocation_order() {
        let mut arena: Arena<ValueId, &str> = Arena::new();
        let predicted = arena.next_id();
        let a = arena.alloc("a");
        let b = arena.alloc("b");
        assert_eq!(a, predicted);
        assert_eq!(b.index(), 1);
        assert_eq!(arena[b], "b");
        assert_eq!(arena.iter().map(|(id, _)| id).collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn out_of_range_ids_are_detected() {
        let arena: Arena<ModuleId, u8> = [1].into_iter().collect();
        assert!(arena.contains(ModuleId::from_raw(0)));
        assert!(!arena.contains(ModuleId::from_raw(1)));
        assert_eq!(arena.try_get(ModuleId::from_raw(1)), None);
    }

    #[test]
    fn slice_edits_are_visible_by_id() {
        let mut arena: Arena<ModuleId, u32> = [1, 2, 3].into_iter().collect();
        arena.as_mut_slice().iter_mut().for_each(|item| *item *= 10);
        assert_eq!(arena[ModuleId::from_raw(2)], 30);
    }

    #[test]
    fn json_form_is_the_item_list() {
        let arena: Arena<ModuleId, String> = ["a".to_string(), "b".to_string()].into_iter().collect();
        let json = serde_json::to_string(&arena).unwrap();
        assert_eq!(json, r#"["a","b"]"#);
        let restored: Arena<ModuleId, String> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored[ModuleId::from_raw(1)], "b");
    }
}
