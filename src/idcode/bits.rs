//! Six-bit printable bit streams.
//!
//! Every stream byte carries six payload bits, most significant first, stored
//! as `64 + bits` so that the encoded text stays within `@`..`\x7f`. Fields of
//! any width are read and written across byte boundaries.

use super::error::IdcodeError;

/// Bias added to every six-bit group.
pub const BYTE_BIAS: u8 = 64;
/// Payload bits per stream byte.
pub const BITS_PER_BYTE: u32 = 6;

/// Read cursor over a six-bit stream.
///
/// The cursor owns all decode state, so independent readers over the same
/// buffer never interfere.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    index: usize,
    window: u8,
    avail: u32,
}

impl<'a> BitReader<'a> {
    /// Starts reading at byte `offset`, loading its six bits eagerly.
    pub fn start(bytes: &'a [u8], offset: usize) -> Result<Self, IdcodeError> {
        let window = payload(bytes, offset)?;
        Ok(Self {
            bytes,
            index: offset,
            window,
            avail: BITS_PER_BYTE,
        })
    }

    /// Reads `n` bits (at most 32), most significant first.
    pub fn read_bits(&mut self, n: u32) -> Result<u32, IdcodeError> {
        debug_assert!(n <= 32);
        let mut data = 0u32;
        for _ in 0..n {
            if self.avail == 0 {
                self.index += 1;
                self.window = payload(self.bytes, self.index)?;
                self.avail = BITS_PER_BYTE;
            }
            self.avail -= 1;
            data = (data << 1) | u32::from((self.window >> self.avail) & 1);
        }
        Ok(data)
    }

    pub fn read_bit(&mut self) -> Result<bool, IdcodeError> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Reads an `n`-bit value as an index into a table of `len` entries.
    pub fn read_index(&mut self, n: u32, len: usize, atoms: bool) -> Result<usize, IdcodeError> {
        let index = self.read_bits(n)? as usize;
        if index >= len {
            return Err(if atoms {
                IdcodeError::AtomIndexOutOfRange {
                    index,
                    atom_count: len,
                }
            } else {
                IdcodeError::BondIndexOutOfRange {
                    index,
                    bond_count: len,
                }
            });
        }
        Ok(index)
    }
}

fn payload(bytes: &[u8], offset: usize) -> Result<u8, IdcodeError> {
    let byte = *bytes
        .get(offset)
        .ok_or(IdcodeError::UnexpectedEnd { offset })?;
    if !(BYTE_BIAS..BYTE_BIAS + 64).contains(&byte) {
        return Err(IdcodeError::InvalidByte { offset, byte });
    }
    Ok(byte - BYTE_BIAS)
}

/// Accumulates bit fields into six-bit printable bytes.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    current: u8,
    filled: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the low `n` bits of `value` (at most 32), most significant first.
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32);
        for i in (0..n).rev() {
            self.current = (self.current << 1) | ((value >> i) & 1) as u8;
            self.filled += 1;
            if self.filled == BITS_PER_BYTE {
                self.bytes.push(self.current + BYTE_BIAS);
                self.current = 0;
                self.filled = 0;
            }
        }
    }

    pub fn write_bit(&mut self, bit: bool) {
        self.write_bits(u32::from(bit), 1);
    }

    /// Number of bits written so far.
    pub fn bit_len(&self) -> usize {
        self.bytes.len() * BITS_PER_BYTE as usize + self.filled as usize
    }

    /// Pads the last byte with zero bits and returns the stream.
    pub fn finish(mut self) -> Vec<u8> {
        if self.filled > 0 {
            let pad = BITS_PER_BYTE - self.filled;
            self.bytes.push((self.current << pad) + BYTE_BIAS);
        }
        self.bytes
    }
}

/// Number of bits needed to write every value below or equal to `max`;
/// `0` for `max == 0`.
pub fn needed_bits(max: usize) -> u32 {
    usize::BITS - max.leading_zeros()
}
