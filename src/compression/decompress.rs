use super::{Operation, DEFAULT_CAPACITY};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Decompressor<'a> {
    src: &'a [u8],
    dst: Vec<u8>,

    /// index the stream starts at, used to count the consumed bytes
    start_index: usize,
    /// index to read from
    read_index: usize,

    /// output length that may not be exceeded before an operation starts
    capacity: usize,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecompressError {
    #[error("Data contained an unsupported operation {0:#04x}")]
    UnsupportedOpcode(u8),
    #[error("Maximum size exceeded")]
    CapacityExceeded,
    #[error("Data ended unexpectedly at offset {offset:#x}")]
    UnexpectedEnd { offset: usize },
    #[error("Back reference of {distance} bytes with only {available} bytes written")]
    InvalidBackref { distance: usize, available: usize },
}

/// Result of a successful decompression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decompressed {
    pub data: Vec<u8>,
    /// Number of input bytes consumed, including the terminating operation.
    pub bytes_read: usize,
}

/// Decompress the stream at the start of `src`.
///
/// `capacity` is checked before every operation, so the returned data can be
/// longer than `capacity` by the output of the last operation.
pub fn decompress(src: &[u8], capacity: usize) -> Result<Decompressed, DecompressError> {
    Decompressor::new(src, 0)
        .with_capacity(capacity)
        .decompress()
}

impl Operation {
    pub fn decode(op: u8, decompressor: &mut Decompressor) -> Result<Self, DecompressError> {
        let operation = match op {
            n @ 0x00..0x40 => Self::CopySimple(usize::from(n & 0x3f) + 1),
            n @ 0x40..0x50 => Self::Reserved(n),
            n @ 0x50..0x60 => Self::CopyDoubled(usize::from(n & 0x0f) + 1),
            n @ 0x60..0x80 => Self::CopyInterleaved {
                count: usize::from(n & 0x0f) + 2,
                fixed_value: decompressor.read()?,
                fixed_first: n < 0x70,
            },

            n @ 0x80..0xc0 => Self::decode_copy_backread_small(n, decompressor)?,
            n @ 0xc0..0xe0 => Self::decode_copy_backread_large(n, decompressor)?,

            n @ 0xe0..0xf0 => Self::decode_repeat_value_large(n, decompressor)?,
            n @ 0xf0..0xf8 => Self::decode_repeat_value_small(n, decompressor)?,

            n @ 0xf8..0xfe => Self::Reserved(n),
            0xfe | 0xff => Self::Exit,
        };

        Ok(operation)
    }

    fn decode_copy_backread_small(
        op: u8,
        decompressor: &mut Decompressor,
    ) -> Result<Self, DecompressError> {
        let count = usize::from((op & 0x3c) >> 2) + 2;

        let upper = op & 0x03;
        let lower = decompressor.read()?;
        let back = usize::from(u16::from_be_bytes([upper, lower]));

        Ok(Self::CopyBackread { count, back })
    }

    fn decode_copy_backread_large(
        op: u8,
        decompressor: &mut Decompressor,
    ) -> Result<Self, DecompressError> {
        let upper = op & 0x1f;
        let lower = decompressor.read()?;

        let count = usize::from((upper << 1) | (lower >> 7)) + 2;
        let back = usize::from(u16::from_be_bytes([lower & 0x7f, decompressor.read()?]));

        Ok(Self::CopyBackread { count, back })
    }

    fn decode_repeat_value_large(
        op: u8,
        decompressor: &mut Decompressor,
    ) -> Result<Self, DecompressError> {
        let upper = op & 0x0f;
        let lower = decompressor.read()?;
        let count = usize::from(u16::from_be_bytes([upper, lower])) + 3;

        let value = decompressor.read()?;

        Ok(Self::RepeatValue { count, value })
    }

    fn decode_repeat_value_small(
        op: u8,
        decompressor: &mut Decompressor,
    ) -> Result<Self, DecompressError> {
        let count = usize::from(op & 0x0f) + 3;
        let value = decompressor.read()?;

        Ok(Self::RepeatValue { count, value })
    }
}

impl<'a> Decompressor<'a> {
    /// Prepare decompression of the stream starting at `offset` in `src`.
    pub fn new(src: &'a [u8], offset: usize) -> Self {
        Self {
            src,
            dst: Vec::new(),

            start_index: offset,
            read_index: offset,

            capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn decompress(mut self) -> Result<Decompressed, DecompressError> {
        loop {
            if self.dst.len() > self.capacity {
                return Err(DecompressError::CapacityExceeded);
            }

            let value = self.read()?;

            let operation = Operation::decode(value, &mut self)?;
            log::trace!("operation: {:?}", operation);

            match operation {
                Operation::CopySimple(count) => self.copy_simple(count)?,
                Operation::CopyDoubled(count) => self.copy_doubled(count)?,
                Operation::CopyInterleaved {
                    count,
                    fixed_value,
                    fixed_first,
                } => self.copy_interleaved(count, fixed_value, fixed_first)?,

                Operation::CopyBackread { count, back } => self.copy_backread(count, back)?,

                Operation::RepeatValue { count, value } => self.repeat_value(count, value),

                Operation::Reserved(op) => return Err(DecompressError::UnsupportedOpcode(op)),
                Operation::Exit => break,
            }
        }

        Ok(Decompressed {
            bytes_read: self.read_index - self.start_index,
            data: self.dst,
        })
    }

    fn read(&mut self) -> Result<u8, DecompressError> {
        let value = *self
            .src
            .get(self.read_index)
            .ok_or(DecompressError::UnexpectedEnd {
                offset: self.read_index,
            })?;
        self.read_index += 1;

        Ok(value)
    }

    fn read_slice(&mut self, count: usize) -> Result<&'a [u8], DecompressError> {
        let src: &'a [u8] = self.src;
        let bytes = src
            .get(self.read_index..self.read_index + count)
            .ok_or(DecompressError::UnexpectedEnd { offset: src.len() })?;
        self.read_index += count;

        Ok(bytes)
    }

    fn copy_simple(&mut self, count: usize) -> Result<(), DecompressError> {
        let bytes = self.read_slice(count)?;
        self.dst.extend_from_slice(bytes);

        Ok(())
    }

    fn copy_doubled(&mut self, count: usize) -> Result<(), DecompressError> {
        for &value in self.read_slice(count)? {
            self.dst.push(value);
            self.dst.push(value);
        }

        Ok(())
    }

    fn copy_interleaved(
        &mut self,
        count: usize,
        fixed_value: u8,
        fixed_first: bool,
    ) -> Result<(), DecompressError> {
        for &read in self.read_slice(count)? {
            if fixed_first {
                self.dst.push(fixed_value);
                self.dst.push(read);
            } else {
                self.dst.push(read);
                self.dst.push(fixed_value);
            }
        }

        Ok(())
    }

    /// Byte by byte so that a source overlapping the written region repeats
    /// the last `back` bytes.
    fn copy_backread(&mut self, count: usize, back: usize) -> Result<(), DecompressError> {
        if back == 0 || self.dst.len() < back {
            return Err(DecompressError::InvalidBackref {
                distance: back,
                available: self.dst.len(),
            });
        }

        let start = self.dst.len() - back;
        for index in start..start + count {
            let value = self.dst[index];
            self.dst.push(value);
        }

        Ok(())
    }

    fn repeat_value(&mut self, count: usize, value: u8) {
        self.dst.resize(self.dst.len() + count, value);
    }
}
