use foldhash::fast::RandomState;
use hashbrown::hash_table::{Entry, Iter};
use std::{
    borrow::Borrow,
    hash::{BuildHasher, Hash},
};

/// An entry which carries its own key.
pub trait HTEntry {
    type Key: Hash + Clone + PartialEq + Eq;
    fn key(&self) -> &Self::Key;
}

/// A hash table of self-keyed entries.
#[derive(Debug, Clone)]
pub struct HashTable<T: HTEntry> {
    table: hashbrown::HashTable<T>,
    hash_builder: RandomState,
}

impl<T: HTEntry> Default for HashTable<T> {
    fn default() -> Self {
        Self {
            table: Default::default(),
            hash_builder: RandomState::default(),
        }
    }
}

impl<T: HTEntry> HashTable<T> {
    fn h<K>(&self, key: &K) -> u64
    where
        T::Key: Borrow<K> + PartialEq<K>,
        K: Hash + Eq + ?Sized,
    {
        self.hash_builder.hash_one(key)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    /// If the key is not present in the table, `init` builds the entry.
    pub fn get_or_insert_with(&mut self, key: &T::Key, init: impl FnOnce() -> T) -> &mut T {
        self.entry(key).or_insert_with(init).into_mut()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn has<K>(&self, key: &K) -> bool
    where
        T::Key: Borrow<K> + PartialEq<K>,
        K: Hash + Eq + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Finds a reference to the value corresponding to the key
    /// or returns `None` if the key is not present in the table.
    pub fn find<K>(&self, key: &K) -> Option<&T>
    where
        T::Key: Borrow<K> + PartialEq<K>,
        K: Hash + Eq + ?Sized,
    {
        self.table.find(self.h(key), |entry| entry.key() == key)
    }

    /// Finds a mutable reference to the value corresponding to the key
    /// or returns `None` if the key is not present in the table.
    pub fn find_mut<K>(&mut self, key: &K) -> Option<&mut T>
    where
        T::Key: Borrow<K> + PartialEq<K>,
        K: Hash + Eq + ?Sized,
    {
        self.table.find_mut(self.h(key), |entry| entry.key() == key)
    }

    pub fn remove<K>(&mut self, key: &K) -> Option<T>
    where
        T::Key: Borrow<K> + PartialEq<K>,
        K: Hash + Eq + ?Sized,
    {
        match self.table.find_entry(self.h(key), |entry| entry.key() == key) {
            Ok(entry) => Some(entry.remove().0),
            Err(_) => None,
        }
    }

    /// Removes and yields every entry matching the predicate.
    pub fn extract_if<'a, F>(&'a mut self, f: F) -> impl Iterator<Item = T> + 'a
    where
        F: FnMut(&mut T) -> bool + 'a,
    {
        self.table.extract_if(f)
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    fn entry<K>(&mut self, key: &K) -> Entry<'_, T>
    where
        T::Key: Borrow<K> + PartialEq<K>,
        K: Hash + Eq + ?Sized,
    {
        let hb = &self.hash_builder;
        self.table.entry(
            hb.hash_one(key),
            |entry| entry.key() == key,
            |entry| hb.hash_one(entry.key()),
        )
    }

    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        self.table.iter()
    }
}

impl<'a, T: HTEntry> IntoIterator for &'a HashTable<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
