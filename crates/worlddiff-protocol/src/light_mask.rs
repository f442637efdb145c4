use crate::packet::PacketBuffer;
use std::io;

/// How a light mask is framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskEncoding {
    /// A single VarInt, one bit per light section (1.14 - 1.16).
    VarInt,
    /// A VarInt-counted array of longs (1.17+).
    LongArray,
}

/// Bitset over light-section indices (index 0 is the lowest light section).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LightMask {
    words: Vec<u64>,
}

impl LightMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_words(words: Vec<u64>) -> Self {
        let mut mask = LightMask { words };
        mask.trim();
        mask
    }

    pub fn get(&self, index: usize) -> bool {
        self.words
            .get(index / 64)
            .map_or(false, |word| word & (1u64 << (index % 64)) != 0)
    }

    pub fn set(&mut self, index: usize, value: bool) {
        let word = index / 64;
        if value {
            if self.words.len() <= word {
                self.words.resize(word + 1, 0);
            }
            self.words[word] |= 1u64 << (index % 64);
        } else if let Some(bits) = self.words.get_mut(word) {
            *bits &= !(1u64 << (index % 64));
            self.trim();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }

    pub fn read(buffer: &mut PacketBuffer, encoding: MaskEncoding) -> io::Result<Self> {
        match encoding {
            MaskEncoding::VarInt => {
                let bits = buffer.read_varint()? as u32;
                Ok(LightMask::from_words(vec![bits as u64]))
            }
            MaskEncoding::LongArray => Ok(LightMask::from_words(buffer.read_long_array()?)),
        }
    }

    pub fn write(&self, buffer: &mut PacketBuffer, encoding: MaskEncoding) -> io::Result<()> {
        match encoding {
            MaskEncoding::VarInt => {
                let word = self.words.first().copied().unwrap_or(0);
                if self.words.len() > 1 || word > u32::MAX as u64 {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "Light mask does not fit in a VarInt",
                    ));
                }
                buffer.write_varint(word as u32 as i32);
            }
            MaskEncoding::LongArray => buffer.write_long_array(&self.words),
        }
        Ok(())
    }
}
