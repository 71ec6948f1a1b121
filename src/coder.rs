//! The binary range coder.
//!
//! A fairly typical carry-aware arithmetic coder. The encoder keeps its low
//! end in a 64-bit register so a carry out of bit 31 is not lost but parked
//! in bit 32, to be folded into the output during renormalization. Bytes
//! that could still be changed by such a carry (one buffered byte plus a
//! run of 0xFF bytes) are withheld from the output until a byte arrives
//! that settles them.
//!
//! The first byte of every stream is 0x00 and carries no information; it
//! exists so the renormalization loop needs no special case for an empty
//! buffer, and the decoder simply absorbs it while filling its register.
//!
//! The decoder tracks `code - low` instead of both registers, which makes
//! its renormalization a plain byte shift.

use std::io::{Read, Write};

use crate::error::Result;

/// Bit width of coder probabilities.
pub const PROB_BITS: u32 = 12;
/// One past the largest coder probability; every `p1` must lie strictly
/// inside `(0, PROB_SCALE)`.
pub const PROB_SCALE: u32 = 1 << PROB_BITS;

/// Renormalize while `range` is at or below this: the top byte holds no
/// information anymore.
const RANGE_FLOOR: u32 = 0x00FF_FFFF;

/// The encoding half of the coder.
pub struct Encoder<W: Write> {
    code: W,
    low: u64,
    range: u32,
    /// Length of the withheld byte run: `flux_fst` plus `flux_len - 1`
    /// bytes of 0xFF.
    flux_len: u32,
    /// First withheld byte; a carry arriving later increments it.
    flux_fst: u8,
}

impl<W: Write> Encoder<W> {
    /// Wrap a byte sink.
    pub fn new(code: W) -> Self {
        Self {
            code,
            low: 0,
            range: u32::MAX,
            flux_len: 1,
            flux_fst: 0,
        }
    }

    /// Narrow the interval to the side selected by `bit`.
    ///
    /// Emits nothing by itself; pair each call with one
    /// [`normalize`](Encoder::normalize).
    pub fn encode(&mut self, bit: u8, p1: u32) {
        debug_assert!(0 < p1 && p1 < PROB_SCALE);
        let mid = self.range / PROB_SCALE * p1;
        if bit == 1 {
            self.range = mid;
        } else {
            // 64-bit add: a carry out of bit 31 lands in bit 32.
            self.low += u64::from(mid);
            self.range -= mid;
        }
    }

    /// Shift fully determined bytes out of the coding window.
    ///
    /// A byte equal to 0xFF with no carry pending joins the withheld run: a
    /// later carry would turn it into 0x00 and bump the byte before it.
    pub fn normalize(&mut self) -> Result<()> {
        while self.range <= RANGE_FLOOR {
            let lo32 = self.low as u32;
            let carry = (self.low >> 32) as u8;
            if lo32 < 0xFF00_0000 || carry != 0 {
                self.put(self.flux_fst.wrapping_add(carry))?;
                for _ in 1..self.flux_len {
                    self.put(0xFFu8.wrapping_add(carry))?;
                }
                self.flux_len = 0;
                self.flux_fst = (lo32 >> 24) as u8;
            }
            self.flux_len += 1;
            // The 32-bit shift drops the byte just dealt with and clears
            // the parked carry.
            self.low = u64::from(lo32 << 8);
            self.range <<= 8;
        }
        Ok(())
    }

    /// Drain the withheld run and the four live bytes of `low`, consuming
    /// the encoder.
    pub fn flush(mut self) -> Result<()> {
        let lo32 = self.low as u32;
        let carry = (self.low >> 32) as u8;
        self.put(self.flux_fst.wrapping_add(carry))?;
        while self.flux_len > 1 {
            self.put(0xFFu8.wrapping_add(carry))?;
            self.flux_len -= 1;
        }
        self.code.write_all(&lo32.to_be_bytes())?;
        Ok(())
    }

    fn put(&mut self, byte: u8) -> Result<()> {
        self.code.write_all(&[byte])?;
        Ok(())
    }
}

/// The decoding half of the coder.
pub struct Decoder<R: Read> {
    code: R,
    range: u32,
    /// Code minus low.
    cml: u32,
}

impl<R: Read> Decoder<R> {
    /// Wrap a byte source.
    pub fn new(code: R) -> Self {
        Self {
            code,
            range: u32::MAX,
            cml: 0,
        }
    }

    /// Prime the code register with the first five bytes of the stream, the
    /// first of which is the encoder's 0x00 lead.
    ///
    /// Call exactly once, before the first [`decode`](Decoder::decode).
    pub fn fill(&mut self) -> Result<()> {
        for _ in 0..5 {
            self.cml = (self.cml << 8) | u32::from(self.next_byte()?);
        }
        Ok(())
    }

    /// Return the bit the interval encodes under probability `p1`, and
    /// narrow the interval the same way the encoder did.
    pub fn decode(&mut self, p1: u32) -> u8 {
        debug_assert!(0 < p1 && p1 < PROB_SCALE);
        let mid = self.range / PROB_SCALE * p1;
        if self.cml < mid {
            self.range = mid;
            1
        } else {
            self.cml -= mid;
            self.range -= mid;
            0
        }
    }

    /// Mirror of the encoder's renormalization: shift one byte in per eight
    /// bits of lost precision.
    pub fn normalize(&mut self) -> Result<()> {
        while self.range <= RANGE_FLOOR {
            self.cml = (self.cml << 8) | u32::from(self.next_byte()?);
            self.range <<= 8;
        }
        Ok(())
    }

    /// A stream that ends early reads as zeroes, so a truncated input
    /// decodes into garbage of the declared length instead of failing.
    fn next_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        loop {
            match self.code.read(&mut byte) {
                Ok(0) => return Ok(0),
                Ok(_) => return Ok(byte[0]),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
