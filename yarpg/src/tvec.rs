use core::convert::TryFrom;
use core::fmt::Debug;
use core::fmt::Formatter;
use core::marker::PhantomData;
use core::ops::Index;
use core::ops::IndexMut;

/// A `Vec` that can only be indexed by one kind of id, so that a `RuleId` can never be used to
/// look up a state.
#[derive(Clone, PartialEq, Eq)]
pub struct TVec<I, T> {
    vec: Vec<T>,
    phantom_i: PhantomData<I>,
}

impl<I, T> TVec<I, T> {
    pub fn new() -> Self {
        Self {
            vec: Vec::new(),
            phantom_i: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.vec.iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, T> {
        self.vec.iter_mut()
    }

    pub fn vec(&self) -> &Vec<T> {
        &self.vec
    }
}

impl<I: From<usize>, T> TVec<I, T> {
    /// Appends `value` and returns its id.
    pub fn push(&mut self, value: T) -> I {
        let id = I::from(self.vec.len());
        self.vec.push(value);
        id
    }

    /// Iterates `(id, &value)` pairs in id order.
    pub fn iter_enumerated(&self) -> impl Iterator<Item = (I, &T)> + '_ {
        self.vec.iter().enumerate().map(|(i, v)| (I::from(i), v))
    }

    pub fn ids(&self) -> impl Iterator<Item = I> {
        (0..self.vec.len()).map(I::from)
    }
}

impl<I, T> Default for TVec<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, T: Debug> core::fmt::Debug for TVec<I, T> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> core::fmt::Result {
        self.vec.fmt(fmt)
    }
}

fn to_usize<I>(index: I) -> usize
where
    usize: TryFrom<I>,
{
    match usize::try_from(index) {
        Ok(v) => v,
        Err(_) => panic!("failed to convert index"),
    }
}

impl<I, T> Index<I> for TVec<I, T>
where
    usize: TryFrom<I>,
{
    type Output = T;
    fn index(&self, index: I) -> &T {
        let u = to_usize(index);
        &self.vec[u]
    }
}

impl<I, T> IndexMut<I> for TVec<I, T>
where
    usize: TryFrom<I>,
{
    fn index_mut(&mut self, index: I) -> &mut T {
        let u = to_usize(index);
        &mut self.vec[u]
    }
}
