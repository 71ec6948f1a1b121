//! Stream framing and the per-bit drive loop.
//!
//! A compressed stream is a 4-byte big-endian uncompressed length, the
//! coder's 0x00 lead byte, and the coded bits; no trailer, no checksum, no
//! terminator. The loop feeds each byte MSB-first through
//! predict / code / update / normalize, one bit at a time, and the decoder
//! stops once it has produced the declared number of bytes.
//!
//! The length prefix is why the compressor must know the input size up
//! front; this crate takes whole byte slices and returns whole vectors.

use crate::coder::{Decoder, Encoder};
use crate::error::{Error, Result};
use crate::model::{Config, Ppm};

/// Observer of the byte loop; implementors render progress.
pub trait Progress {
    /// Called once per input byte compressed or output byte produced.
    /// `total` is never zero.
    fn update(&mut self, processed: u32, total: u32, memory_mib: u32) {
        let _ = (processed, total, memory_mib);
    }

    /// Called once after the final byte with the uncompressed and coded
    /// stream lengths. Not called at all for empty inputs.
    fn finish(&mut self, text_len: u32, code_len: u64, memory_mib: u32) {
        let _ = (text_len, code_len, memory_mib);
    }
}

/// A [`Progress`] that reports nothing.
pub struct Silent;

impl Progress for Silent {}

/// Compress `text` into a fresh frame.
///
/// # Errors
///
/// Fails if the input cannot be framed ([`Error::InputTooLarge`]) or the
/// configuration cannot hold the initial model ([`Error::MemoryLimit`]).
pub fn compress(text: &[u8], config: &Config, progress: &mut impl Progress) -> Result<Vec<u8>> {
    let text_len =
        u32::try_from(text.len()).map_err(|_| Error::InputTooLarge { len: text.len() })?;

    let mut code = Vec::with_capacity(text.len() / 2 + 16);
    code.extend_from_slice(&text_len.to_be_bytes());

    let mut ppm = Ppm::new(config)?;
    let mut enc = Encoder::new(&mut code);
    for (processed, &byte) in text.iter().enumerate() {
        progress.update(processed as u32, text_len, ppm.used_memory_mib());
        for shift in (0..8).rev() {
            let bit = (byte >> shift) & 1;
            let p1 = ppm.predict();
            enc.encode(bit, p1);
            ppm.update(bit);
            enc.normalize()?;
        }
    }
    enc.flush()?;

    if text_len != 0 {
        progress.finish(text_len, code.len() as u64, ppm.used_memory_mib());
    }
    Ok(code)
}

/// Expand a frame back into the original bytes.
///
/// The coded stream carries no integrity check: corrupt or truncated input,
/// or a configuration differing from the compressing side, yields the
/// declared number of bytes with no indication that anything went wrong.
///
/// # Errors
///
/// Fails only on a frame too short to hold its own length prefix
/// ([`Error::TruncatedHeader`]) or a configuration the model rejects.
pub fn decompress(code: &[u8], config: &Config, progress: &mut impl Progress) -> Result<Vec<u8>> {
    let header: [u8; 4] = code
        .get(..4)
        .and_then(|h| h.try_into().ok())
        .ok_or(Error::TruncatedHeader { len: code.len() })?;
    let text_len = u32::from_be_bytes(header);

    let mut text = Vec::with_capacity(text_len as usize);
    let mut ppm = Ppm::new(config)?;
    let mut dec = Decoder::new(&code[4..]);
    dec.fill()?;
    for processed in 0..text_len {
        progress.update(processed, text_len, ppm.used_memory_mib());
        let mut byte = 0u8;
        for _ in 0..8 {
            let p1 = ppm.predict();
            let bit = dec.decode(p1);
            ppm.update(bit);
            dec.normalize()?;
            byte = (byte << 1) | bit;
        }
        text.push(byte);
    }

    if text_len != 0 {
        progress.finish(text_len, code.len() as u64, ppm.used_memory_mib());
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_frame_is_byte_exact() {
        // Four length bytes, then the flush of an untouched encoder: the
        // 0x00 lead plus the four zero bytes of its low register.
        let code = compress(&[], &Config::default(), &mut Silent).unwrap();
        assert_eq!(code, [0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let text = decompress(&code, &Config::default(), &mut Silent).unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn test_header_shorter_than_prefix_is_rejected() {
        let err = decompress(&[0, 0, 1], &Config::default(), &mut Silent).unwrap_err();
        assert!(matches!(err, Error::TruncatedHeader { len: 3 }));
    }

    #[test]
    fn test_length_prefix_is_big_endian() {
        let text = vec![0x41u8; 300];
        let code = compress(&text, &Config::default(), &mut Silent).unwrap();
        assert_eq!(code[..4], 300u32.to_be_bytes());
        assert_eq!(code[4], 0, "coder lead byte");
    }

    #[test]
    fn test_progress_is_skipped_for_empty_input() {
        struct Panics;
        impl Progress for Panics {
            fn update(&mut self, _: u32, _: u32, _: u32) {
                panic!("update on empty input");
            }
            fn finish(&mut self, _: u32, _: u64, _: u32) {
                panic!("finish on empty input");
            }
        }
        compress(&[], &Config::default(), &mut Panics).unwrap();
        decompress(&[0, 0, 0, 0, 0, 0, 0, 0, 0], &Config::default(), &mut Panics).unwrap();
    }

    #[test]
    fn test_progress_sees_every_byte() {
        struct CountBytes(u32, bool);
        impl Progress for CountBytes {
            fn update(&mut self, processed: u32, total: u32, _: u32) {
                assert_eq!(processed, self.0);
                assert_eq!(total, 5);
                self.0 += 1;
            }
            fn finish(&mut self, text_len: u32, code_len: u64, _: u32) {
                assert_eq!(text_len, 5);
                assert!(code_len > 4);
                self.1 = true;
            }
        }
        let mut counter = CountBytes(0, false);
        compress(b"hello", &Config::default(), &mut counter).unwrap();
        assert_eq!(counter.0, 5);
        assert!(counter.1);
    }
}
