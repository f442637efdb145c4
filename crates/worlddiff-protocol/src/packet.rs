use std::io::{self, Read};
use worlddiff_nbt::Tag;

fn eof(what: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("Not enough bytes to read {}", what),
    )
}

/// Packet buffer. Contains the buffer and the cursor.
/// The cursor is used to keep track of the current read position; writes always append.
#[derive(Debug, Default, Clone)]
pub struct PacketBuffer {
    pub buffer: Vec<u8>,
    cursor: usize,
}

impl PacketBuffer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            cursor: 0,
        }
    }

    /// Creates a buffer positioned at the start of `bytes`.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            buffer: bytes,
            cursor: 0,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn get_cursor(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    pub fn peek_byte(&self) -> Option<u8> {
        self.buffer.get(self.cursor).copied()
    }

    fn take(&mut self, len: usize, what: &str) -> io::Result<&[u8]> {
        if self.remaining() < len {
            return Err(eof(what));
        }
        let start = self.cursor;
        self.cursor += len;
        Ok(&self.buffer[start..start + len])
    }

    /// Writes a VarInt: 7 bits per byte, least significant group first, high bit set on
    /// every byte except the last.
    pub fn write_varint(&mut self, value: i32) {
        let mut value = value as u32;
        while (value & !0x7F) != 0 {
            self.buffer.push(((value & 0x7F) as u8) | 0x80);
            value >>= 7;
        }
        self.buffer.push((value & 0x7F) as u8);
    }

    /// Reads a VarInt. More than five bytes is an error.
    pub fn read_varint(&mut self) -> io::Result<i32> {
        let mut result = 0u32;
        let mut shift = 0;

        loop {
            let byte = self.read_u8().map_err(|_| {
                io::Error::new(io::ErrorKind::UnexpectedEof, "EOF while reading VarInt")
            })?;

            result |= ((byte & 0x7F) as u32) << shift;
            shift += 7;

            if (byte & 0x80) == 0 {
                break;
            }

            if shift >= 35 {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "VarInt too big"));
            }
        }

        Ok(result as i32)
    }

    /// Reads a VarInt used as a length or count; negative values are rejected.
    pub fn read_length(&mut self) -> io::Result<usize> {
        let length = self.read_varint()?;
        if length < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Negative length: {}", length),
            ));
        }
        Ok(length as usize)
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buffer.push(value as u8);
    }

    pub fn read_bool(&mut self) -> io::Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.take(1, "u8")?[0])
    }

    // Write an i16 in network (big-endian) order.
    pub fn write_i16(&mut self, value: i16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn read_i16(&mut self) -> io::Result<i16> {
        let bytes = self.take(2, "i16")?;
        Ok(i16::from_be_bytes([bytes[0], bytes[1]]))
    }

    // Write an u16 in network (big-endian) order.
    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn read_u16(&mut self) -> io::Result<u16> {
        let bytes = self.take(2, "u16")?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn read_i64(&mut self) -> io::Result<i64> {
        let bytes = self.take(8, "i64")?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(i64::from_be_bytes(raw))
    }

    pub fn write_bytes_raw(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn read_bytes_raw(&mut self, len: usize) -> io::Result<Vec<u8>> {
        Ok(self.take(len, "byte array")?.to_vec())
    }

    /// VarInt length followed by the bytes.
    pub fn write_byte_array(&mut self, bytes: &[u8]) {
        self.write_varint(bytes.len() as i32);
        self.buffer.extend_from_slice(bytes);
    }

    pub fn read_byte_array(&mut self) -> io::Result<Vec<u8>> {
        let length = self.read_length()?;
        self.read_bytes_raw(length)
    }

    /// VarInt count followed by that many VarInts.
    pub fn write_varint_array(&mut self, values: &[i32]) {
        self.write_varint(values.len() as i32);
        for &value in values {
            self.write_varint(value);
        }
    }

    pub fn read_varint_array(&mut self) -> io::Result<Vec<i32>> {
        let length = self.read_length()?;
        let mut values = Vec::with_capacity(length.min(self.remaining()));
        for _ in 0..length {
            values.push(self.read_varint()?);
        }
        Ok(values)
    }

    /// VarInt count followed by that many big-endian longs.
    pub fn write_long_array(&mut self, values: &[u64]) {
        self.write_varint(values.len() as i32);
        for &value in values {
            self.write_i64(value as i64);
        }
    }

    pub fn read_long_array(&mut self) -> io::Result<Vec<u64>> {
        let length = self.read_length()?;
        if self.remaining() < length * 8 {
            return Err(eof("long array"));
        }
        let mut values = Vec::with_capacity(length);
        for _ in 0..length {
            values.push(self.read_i64()? as u64);
        }
        Ok(values)
    }

    /// Network NBT: a root tag with an empty name.
    pub fn write_nbt(&mut self, tag: &Tag) -> io::Result<()> {
        tag.write(&mut self.buffer, "")
    }

    pub fn read_nbt(&mut self) -> io::Result<Tag> {
        let (_, tag) = Tag::read(self)?;
        Ok(tag)
    }
}

impl Read for PacketBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let to_read = buf.len().min(self.remaining());
        buf[..to_read].copy_from_slice(&self.buffer[self.cursor..self.cursor + to_read]);
        self.cursor += to_read;
        Ok(to_read)
    }
}
