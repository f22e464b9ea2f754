use std::collections::BTreeMap;

/// Rows keyed by a store-assigned id, iterated in ascending id order.
#[derive(Debug)]
pub(crate) struct MemoryTable<T> {
    next_id: i64,
    rows: BTreeMap<i64, T>,
}

impl<T> Default for MemoryTable<T> {
    fn default() -> Self {
        Self { next_id: 1, rows: BTreeMap::new() }
    }
}

impl<T: Clone> MemoryTable<T> {
    /// Assigns the next id and stores the row built from it. Ids are never reused.
    pub(crate) fn insert_with(&mut self, build: impl FnOnce(i64) -> T) -> T {
        let id = self.next_id;
        self.next_id += 1;
        let row = build(id);
        self.rows.insert(id, row.clone());
        row
    }

    pub(crate) fn get(&self, id: i64) -> Option<&T> {
        self.rows.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: i64) -> Option<&mut T> {
        self.rows.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: i64) -> Option<T> {
        self.rows.remove(&id)
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    pub(crate) fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows.values().filter(|r| pred(*r)).cloned().collect()
    }

    /// Removes every row matching `pred` and returns how many went.
    pub(crate) fn remove_where(&mut self, pred: impl Fn(&T) -> bool) -> u64 {
        let before = self.rows.len();
        self.rows.retain(|_, r| !pred(&*r));
        (before - self.rows.len()) as u64
    }
}
