use std::marker::PhantomData;

/// Holds all items and allows for fast allocation and is cache friendly.
/// Items are never removed, so an id handed out stays valid for the arena's lifetime.
#[derive(Debug, Clone)]
pub(crate) struct Arena<I, T> {
    storage: Vec<T>,
    _id: PhantomData<I>,
}

impl<I, T> Arena<I, T>
where
    I: From<usize> + Copy,
{
    /// Create a new empty storage
    pub fn new() -> Self {
        Arena {
            storage: Vec::new(),
            _id: PhantomData,
        }
    }

    /// Allocate a new item to the storage and return the associated id
    pub fn allocate(&mut self, item: T) -> I {
        let id = I::from(self.storage.len());
        self.storage.push(item);
        id
    }

    /// Retrieve an associated item from the Arena
    pub fn get(&self, index: usize) -> Option<&T> {
        self.storage.get(index)
    }

    /// Retrieve an associated item from the Arena as a mutable borrow
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.storage.get_mut(index)
    }

    /// Check the length of the Arena
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if the Arena is empty
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Iterate items together with their ids, in allocation order.
    pub fn iter_with_ids(&self) -> impl Iterator<Item = (I, &T)> + '_ {
        self.storage
            .iter()
            .enumerate()
            .map(|(index, item)| (I::from(index), item))
    }
}
