//! Four-state logic values and bit vectors.
//!
//! Recorded waveforms carry `0`, `1`, `x` (undefined) and `z` (high
//! impedance) per bit. A [`BitVector`] keeps its bits MSB first, the same
//! order they appear in a value-change dump.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::trace::TraceError;

/// A single four-state bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Logic {
    Zero,
    One,
    /// Undefined
    X,
    /// High impedance
    Z,
}

impl Logic {
    /// Parses a single bit character (`0`, `1`, `x`/`X`, `z`/`Z`).
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Logic::Zero),
            '1' => Some(Logic::One),
            'x' | 'X' => Some(Logic::X),
            'z' | 'Z' => Some(Logic::Z),
            _ => None,
        }
    }

    /// Returns the lowercase character for this bit.
    pub fn to_char(self) -> char {
        match self {
            Logic::Zero => '0',
            Logic::One => '1',
            Logic::X => 'x',
            Logic::Z => 'z',
        }
    }

    /// Returns true for `0` and `1`.
    pub fn is_definite(self) -> bool {
        matches!(self, Logic::Zero | Logic::One)
    }

    /// Logical inverse. Undefined and high-impedance bits invert to `x`.
    pub fn invert(self) -> Self {
        match self {
            Logic::Zero => Logic::One,
            Logic::One => Logic::Zero,
            Logic::X | Logic::Z => Logic::X,
        }
    }
}

impl From<bool> for Logic {
    fn from(level: bool) -> Self {
        if level {
            Logic::One
        } else {
            Logic::Zero
        }
    }
}

/// A fixed-width vector of four-state bits, most significant bit first.
///
/// Serialized as its string form (`"01xz"`), which keeps trace fixtures
/// readable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BitVector {
    bits: Vec<Logic>,
}

impl BitVector {
    /// Creates a bit vector from MSB-first bits.
    pub fn new(bits: Vec<Logic>) -> Self {
        Self { bits }
    }

    /// Creates a one-bit vector.
    pub fn bit(value: Logic) -> Self {
        Self { bits: vec![value] }
    }

    /// One-bit `0`.
    pub fn low() -> Self {
        Self::bit(Logic::Zero)
    }

    /// One-bit `1`.
    pub fn high() -> Self {
        Self::bit(Logic::One)
    }

    /// One-bit vector for a boolean level.
    pub fn level(high: bool) -> Self {
        Self::bit(Logic::from(high))
    }

    /// Encodes the low `width` bits of `value`.
    pub fn from_u64(value: u64, width: usize) -> Self {
        let bits = (0..width)
            .rev()
            .map(|i| Logic::from(i < 64 && (value >> i) & 1 == 1))
            .collect();
        Self { bits }
    }

    /// Parses a bit string. An optional leading `b`/`B` (VCD vector prefix)
    /// is accepted; underscores are ignored.
    pub fn parse(text: &str) -> Result<Self, TraceError> {
        let body = text
            .strip_prefix('b')
            .or_else(|| text.strip_prefix('B'))
            .unwrap_or(text);

        let bits = body
            .chars()
            .filter(|c| *c != '_')
            .map(Logic::from_char)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| TraceError::InvalidLogic(text.to_string()))?;

        if bits.is_empty() {
            return Err(TraceError::InvalidLogic(text.to_string()));
        }
        Ok(Self { bits })
    }

    /// Number of bits.
    pub fn width(&self) -> usize {
        self.bits.len()
    }

    /// Bits, MSB first.
    pub fn bits(&self) -> &[Logic] {
        &self.bits
    }

    /// Returns true if every bit is `0` or `1`.
    pub fn is_definite(&self) -> bool {
        self.bits.iter().all(|b| b.is_definite())
    }

    /// Unsigned value of the vector.
    ///
    /// Returns `None` when any bit is undefined or when set bits lie beyond
    /// the 64-bit range.
    pub fn to_u64(&self) -> Option<u64> {
        let mut value: u64 = 0;
        for (i, bit) in self.bits.iter().rev().enumerate() {
            match bit {
                Logic::Zero => {}
                Logic::One if i < 64 => value |= 1u64 << i,
                _ => return None,
            }
        }
        Some(value)
    }

    /// Binary level of the vector: `Some(false)` when all bits are a
    /// definite zero, `Some(true)` when definite and non-zero, `None` when
    /// any bit is undefined.
    pub fn as_level(&self) -> Option<bool> {
        if !self.is_definite() {
            return None;
        }
        Some(self.bits.iter().any(|b| *b == Logic::One))
    }

    /// Bitwise inverse.
    pub fn invert(&self) -> Self {
        Self {
            bits: self.bits.iter().map(|b| b.invert()).collect(),
        }
    }
}

impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in &self.bits {
            write!(f, "{}", bit.to_char())?;
        }
        Ok(())
    }
}

impl FromStr for BitVector {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BitVector {
    type Error = TraceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BitVector> for String {
    fn from(value: BitVector) -> Self {
        value.to_string()
    }
}
