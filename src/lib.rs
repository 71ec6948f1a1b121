//! # Bitwise PPM compression
//!
//! *Adaptive context modeling over single bits, squeezed through a
//! carry-aware range coder.*
//!
//! ## Intuition First
//!
//! Reading a book, you can often guess the next letter from the last few
//! words. A context model makes that guess mechanical: it remembers what
//! followed each recently seen string and bets accordingly. The better the
//! bets, the fewer bits an entropy coder needs to write down what actually
//! happened.
//!
//! This crate predicts one *bit* at a time. Every context is a string of
//! bits that starts on a byte boundary, and contexts of every length up to
//! a configured order compete implicitly: the model always speaks with the
//! voice of the longest context it has seen before, falling back to
//! shorter ones through suffix links when the long one has nothing to say.
//!
//! ## The Problem
//!
//! Static entropy coders need the symbol distribution up front and code
//! every position the same way. Real data is wildly non-stationary: the
//! distribution of the next bit depends on what came just before. Keeping
//! a separate adaptive estimate per context captures that, at the price of
//! a model that grows with the data and must be rebuilt, identically, by
//! the decompressor.
//!
//! ## Historical Context
//!
//! ```text
//! 1948  Shannon          Entropy as the fundamental limit
//! 1976  Rissanen         Arithmetic coding: optimal rate
//! 1979  Martin           Range coding: byte-wise renormalization
//! 1984  Cleary & Witten  PPM: prediction by partial matching
//! 1990  Moffat           PPMC: practical escape estimation
//! 2002  Shkarin          PPMd: information inheritance
//! 2002  Mahoney          PAQ: binary-alphabet context mixing
//! ```
//!
//! The model here crosses two of these lines: a PPM-style suffix-linked
//! trie, but over a binary alphabet with no explicit escape symbol.
//! Information inheritance seeds every new context with its parent's
//! estimate, so there is never nothing to predict with.
//!
//! ## Mathematical Formulation
//!
//! Each context keeps a probability $p_1$ and a count $n$. After observing
//! bit $b$:
//!
//! ```text
//! p1 += (b - p1) * k / n      (k = 32, n capped at 1023)
//! ```
//!
//! a count-decayed exponential moving average: young contexts move in
//! steps of roughly 1/12 of the remaining error, saturated ones in steps
//! near 1/32. The coder then narrows its interval to the fraction
//! `p1 / 4096` (bit 1) or its complement (bit 0), spending $-\log_2 p$
//! bits per event.
//!
//! ## Complexity Analysis
//!
//! - **Time**: $O(1)$ amortized per bit; one counter update plus a suffix
//!   walk whose hops each shorten the match by a byte.
//! - **Space**: a fixed arena of 16-byte nodes; at most one node is added
//!   per coded bit, and growth stops silently at the memory limit.
//!
//! ## Failure Modes
//!
//! 1. **Configuration mismatch**: the stream does not record the memory or
//!    order limits. Decompressing with different values yields bytes of
//!    the right count and the wrong values, with no warning.
//! 2. **No integrity check**: a corrupt or truncated stream decodes into
//!    garbage of the declared length.
//! 3. **Arena exhaustion**: compression still works, but long contexts
//!    stop being learned and the ratio degrades toward order-0.
//!
//! ## Implementation Notes
//!
//! This crate provides:
//! - **model**: the suffix-linked context trie with packed counters.
//! - **coder**: a binary range coder with a 64-bit low register and
//!   deferred carry propagation.
//! - **frame**: the length-prefixed container and the per-bit drive loop.
//!
//! The division in the counter update is table-driven ([`divide`]) and the
//! probability rescaling is zero-avoiding ([`fixed`]); both are part of
//! the stream format, since their rounding feeds every prediction.
//!
//! ## References
//!
//! - Cleary, J. and Witten, I. (1984). "Data compression using adaptive
//!   coding and partial string matching."
//! - Shkarin, D. (2002). "PPM: one step to practicality."
//! - Mahoney, M. (2005). "Adaptive weighing of context models for lossless
//!   data compression."

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coder;
pub mod divide;
pub mod error;
pub mod fixed;
pub mod frame;
pub mod model;

pub use coder::{Decoder, Encoder};
pub use error::Error;
pub use frame::{compress, decompress, Progress, Silent};
pub use model::{Config, Ppm};
