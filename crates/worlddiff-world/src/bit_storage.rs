/// Fixed-width indices packed into 64-bit words.
///
/// Indices never span two words: each word holds `64 / bits` values and any
/// leftover high bits stay unused. This is the layout region files have used
/// since 1.16.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitStorage {
    bits: u8,
    size: usize,
    data: Vec<u64>,
}

impl BitStorage {
    /// Zero-filled storage for `size` values of `bits` bits each.
    pub fn new(bits: u8, size: usize) -> Self {
        BitStorage {
            bits,
            size,
            data: vec![0; Self::longs_needed(bits, size)],
        }
    }

    /// Wraps packed words as read from disk or the network. An undersized array is
    /// kept as-is; reads past its end yield 0.
    pub fn from_data(bits: u8, size: usize, data: Vec<u64>) -> Self {
        BitStorage { bits, size, data }
    }

    pub fn longs_needed(bits: u8, size: usize) -> usize {
        if bits == 0 {
            return 0;
        }
        let per_long = 64 / bits as usize;
        (size + per_long - 1) / per_long
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn data(&self) -> &[u64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u64> {
        self.data
    }

    fn mask(&self) -> u64 {
        (1u64 << self.bits) - 1
    }

    fn locate(&self, index: usize) -> (usize, usize) {
        let per_long = 64 / self.bits as usize;
        (index / per_long, (index % per_long) * self.bits as usize)
    }

    pub fn get(&self, index: usize) -> u32 {
        if self.bits == 0 || index >= self.size {
            return 0;
        }
        let (word, offset) = self.locate(index);
        match self.data.get(word) {
            Some(value) => ((value >> offset) & self.mask()) as u32,
            None => 0,
        }
    }

    pub fn set(&mut self, index: usize, value: u32) {
        if self.bits == 0 || index >= self.size {
            return;
        }
        let (word, offset) = self.locate(index);
        if word >= self.data.len() {
            self.data.resize(Self::longs_needed(self.bits, self.size), 0);
        }
        let mask = self.mask();
        self.data[word] &= !(mask << offset);
        self.data[word] |= (value as u64 & mask) << offset;
    }

    /// Copy of this storage re-packed at `new_bits`. Values wider than `new_bits`
    /// are truncated, so callers only shrink when they know the values fit.
    pub fn repacked(&self, new_bits: u8) -> BitStorage {
        let mut resized = BitStorage::new(new_bits, self.size);
        for index in 0..self.size {
            resized.set(index, self.get(index));
        }
        resized
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.size).map(move |index| self.get(index))
    }
}
