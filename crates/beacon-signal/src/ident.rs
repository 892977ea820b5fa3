//! Identifier generation for registered connections.
//!
//! The generation strategy (length, alphabet, entropy source) is kept
//! behind [`IdGenerator`] so it can be swapped without touching the
//! registry or routing logic. Collision handling is the registry's
//! job: it regenerates on the rare collision rather than failing.

use rand::Rng;

use crate::types::ConnectionId;

/// Default identifier length.
///
/// 36^7 ≈ 7.8e10 tokens, which makes collisions negligible for any
/// realistic concurrent connection count while staying short enough
/// to read over the phone.
pub const DEFAULT_ID_LENGTH: usize = 7;

/// Minimum identifier length accepted by [`RandomIdGenerator`].
pub const MIN_ID_LENGTH: usize = 5;

/// Uppercase alphanumeric alphabet, chosen for unambiguous manual entry.
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates identifiers for new connections.
pub trait IdGenerator: Send + Sync {
    /// Produce a candidate identifier.
    ///
    /// Candidates are not required to be unique; the registry retries
    /// on collision.
    fn generate(&self) -> ConnectionId;
}

/// Default generator: random tokens from an uppercase alphanumeric
/// alphabet.
#[derive(Debug, Clone)]
pub struct RandomIdGenerator {
    length: usize,
}

impl RandomIdGenerator {
    /// Create a generator producing tokens of [`DEFAULT_ID_LENGTH`].
    pub fn new() -> Self {
        Self {
            length: DEFAULT_ID_LENGTH,
        }
    }

    /// Create a generator with a custom token length.
    ///
    /// Lengths below [`MIN_ID_LENGTH`] are clamped up to keep the
    /// token space large enough for collision-free operation.
    pub fn with_length(length: usize) -> Self {
        Self {
            length: length.max(MIN_ID_LENGTH),
        }
    }
}

impl Default for RandomIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> ConnectionId {
        let mut rng = rand::rng();
        let token: String = (0..self.length)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        ConnectionId::from(token)
    }
}
