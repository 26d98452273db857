//! Replay fingerprint of a game state.
//!
//! Two games fed the same seed and the same inputs must produce the same
//! [`StateHash`] after every step. The hash is FNV-1a over little-endian
//! encodings; it is not cryptographic.

use telco_spatial::TilePosition;

use crate::fixed::Fixed64;

const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const PRIME: u64 = 0x0000_0100_0000_01b3;

/// Marker written for an absent optional value.
const NONE_MARKER: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(u64);

impl StateHash {
    pub fn new() -> Self {
        Self(OFFSET_BASIS)
    }

    fn absorb(&mut self, bytes: &[u8]) {
        self.0 = bytes
            .iter()
            .fold(self.0, |h, &b| (h ^ u64::from(b)).wrapping_mul(PRIME));
    }

    pub fn write_u64(&mut self, v: u64) {
        self.absorb(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.absorb(&v.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.absorb(&v.to_bits().to_le_bytes());
    }

    pub fn write_position(&mut self, pos: TilePosition) {
        self.absorb(&pos.x.to_le_bytes());
        self.absorb(&pos.y.to_le_bytes());
    }

    /// A collection length; keeps `[a] [b c]` apart from `[a b] [c]`.
    pub fn write_len(&mut self, len: usize) {
        self.write_u64(len as u64);
    }

    /// An optional small id such as a provider.
    pub fn write_opt_u32(&mut self, v: Option<u32>) {
        self.write_u32(v.unwrap_or(NONE_MARKER));
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}
