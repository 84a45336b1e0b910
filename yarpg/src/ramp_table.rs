use core::marker::PhantomData;

/// A compact `K -> [T]` multimap.  All values live in one table; `index[k]..index[k + 1]` is
/// the slice belonging to key `k`.  Keys are dense and added in order.
#[derive(Clone, Debug)]
pub struct RampTable<K, T> {
    index: Vec<usize>,
    table: Vec<T>,
    phantom_k: PhantomData<K>,
}

impl<K, T> RampTable<K, T>
where
    usize: From<K>,
{
    pub fn new() -> Self {
        Self {
            index: vec![0],
            table: Vec::new(),
            phantom_k: PhantomData,
        }
    }

    pub fn values(&self, key: K) -> &[T] {
        let key = usize::from(key);
        &self.table[self.index[key]..self.index[key + 1]]
    }

    /// Iterates the value slices, one for each key in the table.
    pub fn iter_values(&self) -> impl Iterator<Item = &[T]> {
        self.index.windows(2).map(move |w| &self.table[w[0]..w[1]])
    }

    /// Use like this:
    ///
    ///   rt.push_value(...);
    ///   rt.push_value(...);
    ///   rt.finish_key();
    pub fn push_value(&mut self, value: T) {
        self.table.push(value);
    }

    pub fn finish_key(&mut self) {
        self.index.push(self.table.len());
    }
}
