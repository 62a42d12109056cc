mod decompress;
pub use decompress::{decompress, DecompressError, Decompressed, Decompressor};

/// Output bound used when no capacity is given explicitly.
pub const DEFAULT_CAPACITY: usize = 0x10000;

/// A single decoded instruction of the compressed stream.
///
/// Counts are always the number of iterations of the operation, already
/// adjusted by the bias the encoding uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `0x00..=0x3f`: copy `n` bytes from the input.
    CopySimple(usize),
    /// `0x50..=0x5f`: copy `n` bytes from the input, writing each one twice.
    CopyDoubled(usize),
    /// `0x60..=0x7f`: write `count` pairs made of a fixed byte and a byte read
    /// from the input. The fixed byte comes first for `0x60..=0x6f`.
    CopyInterleaved {
        count: usize,
        fixed_value: u8,
        fixed_first: bool,
    },
    /// `0x80..=0xdf`: copy `count` bytes of already written output, starting
    /// `back` bytes behind the current end. The regions may overlap.
    CopyBackread { count: usize, back: usize },
    /// `0xe0..=0xf7`: write `value` `count` times.
    RepeatValue { count: usize, value: u8 },
    /// `0x40..=0x4f` and `0xf8..=0xfd` are never produced by the encoder.
    Reserved(u8),
    /// `0xfe` or `0xff`
    Exit,
}
