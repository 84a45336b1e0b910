use log::trace;

pub const BITS_PER_WORD: usize = 32;

// An M x N matrix of bits, in row-major form with padding at the end of each row.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmat {
    pub data: Vec<u32>,
    pub rows: usize,
    pub cols: usize,
    // Number of u32 elements per row
    pub rowsize: usize,
}

impl Bitmat {
    pub fn new(rows: usize, cols: usize) -> Bitmat {
        let rowsize = word_size(cols);
        Bitmat {
            data: vec![0; rowsize * rows],
            rows,
            cols,
            rowsize,
        }
    }

    // r and c are row and column indices, not word offsets.
    pub fn set(&mut self, r: usize, c: usize) {
        assert!(r < self.rows);
        assert!(c < self.cols);
        self.data[r * self.rowsize + c / BITS_PER_WORD] |= 1u32 << (c % BITS_PER_WORD);
    }

    pub fn get(&self, r: usize, c: usize) -> bool {
        assert!(r < self.rows);
        assert!(c < self.cols);
        (self.data[r * self.rowsize + c / BITS_PER_WORD] & (1u32 << (c % BITS_PER_WORD))) != 0
    }

    pub fn row(&self, r: usize) -> &[u32] {
        assert!(r < self.rows);
        &self.data[r * self.rowsize..(r + 1) * self.rowsize]
    }

    /// Positions of all columns set in row `r`.
    pub fn iter_ones_in_row(&self, r: usize) -> BitMaskIterator<'_> {
        bit_vector_iter_ones(self.row(r), self.cols)
    }

    /// Row-major scan of all (row, col) cells that are set.
    pub fn iter_ones(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.rows).flat_map(move |r| self.iter_ones_in_row(r).map(move |c| (r, c)))
    }

    /// Warshall's algorithm, followed by setting the diagonal.  The matrix must be square.
    pub fn reflexive_transitive_closure(&mut self) {
        assert_eq!(self.rows, self.cols);
        let rowsize = self.rowsize;
        for k in 0..self.rows {
            for i in 0..self.rows {
                if i != k && self.get(i, k) {
                    trace!("closure: row {} absorbs row {}", i, k);
                    for w in 0..rowsize {
                        let from = self.data[k * rowsize + w];
                        self.data[i * rowsize + w] |= from;
                    }
                }
            }
        }
        for i in 0..self.rows {
            self.set(i, i);
        }
    }
}

pub fn word_size(n: usize) -> usize {
    (n + (BITS_PER_WORD - 1)) / BITS_PER_WORD
}

pub struct BitMaskIterator<'a> {
    words: &'a [u32],
    // contains the bits that we are currently reading
    current: u32,
    // number of bits remaining in entire sequence
    nbits: usize,
    // current bit position
    bitpos: usize,
}

impl<'a> Iterator for BitMaskIterator<'a> {
    type Item = usize;
    fn next(&mut self) -> Option<usize> {
        while self.bitpos < self.nbits {
            let nextbit = self.bitpos % BITS_PER_WORD;
            if nextbit == 0 {
                self.current = self.words[self.bitpos / BITS_PER_WORD];

                // Step over entire words, if they are empty.
                if self.bitpos + BITS_PER_WORD <= self.nbits && self.current == 0 {
                    self.bitpos += BITS_PER_WORD;
                    continue;
                }
            }

            let cpos = self.bitpos;
            self.bitpos += 1;
            if ((self.current >> nextbit) & 1) != 0 {
                return Some(cpos);
            }
        }
        None
    }
}

/// Iterates the indices of all of the bits set to 1 in a given bit vector.
pub fn bit_vector_iter_ones(words: &[u32], nbits: usize) -> BitMaskIterator<'_> {
    assert!(words.len() >= word_size(nbits));
    BitMaskIterator {
        words,
        current: 0,
        nbits,
        bitpos: 0,
    }
}

pub struct Bitv32 {
    pub data: Vec<u32>,
    pub nbits: usize,
}

impl Bitv32 {
    pub fn from_elem(n: usize, value: bool) -> Bitv32 {
        let w = if value { !0u32 } else { 0u32 };
        Bitv32 {
            data: vec![w; word_size(n)],
            nbits: n,
        }
    }

    pub fn set_all(&mut self, value: bool) {
        let w = if value { !0u32 } else { 0u32 };
        for i in self.data.iter_mut() {
            *i = w;
        }
    }

    /// ORs a row of a matrix with the same number of columns into this vector.
    pub fn union_with(&mut self, words: &[u32]) {
        for (dst, &src) in self.data.iter_mut().zip(words) {
            *dst |= src;
        }
    }

    pub fn iter_ones(&self) -> BitMaskIterator<'_> {
        bit_vector_iter_ones(&self.data, self.nbits)
    }
}

impl core::fmt::Debug for Bitmat {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        struct Values<'a>(&'a Bitmat);

        impl<'a> core::fmt::Debug for Values<'a> {
            fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let mut dl = fmt.debug_list();
                for (i, j) in self.0.iter_ones() {
                    dl.entry(&(i, j));
                }
                dl.finish()
            }
        }

        let mut b = fmt.debug_struct("Bitmat");
        b.field("rows", &self.rows);
        b.field("cols", &self.cols);
        b.field("values", &Values(self));
        b.finish()
    }
}
