//! Fixed-point signed battle power.
//!
//! The contract stores power as an `int256` scaled by `1e16` and hands it
//! back as the raw unsigned word.

use std::fmt;
use std::sync::OnceLock;

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

/// Fixed-point scale: one unit of power is `10^16` raw units.
pub const POWER_DECIMALS: usize = 16;

fn pow2(bits: u32) -> BigUint {
    BigUint::one() << bits
}

fn scale() -> &'static BigUint {
    static SCALE: OnceLock<BigUint> = OnceLock::new();
    SCALE.get_or_init(|| BigUint::from(10u32).pow(POWER_DECIMALS as u32))
}

/// Exact decoded battle power.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattlePower {
    pub negative: bool,
    /// Absolute value in raw units (`10^-16` power).
    pub magnitude: BigUint,
}

impl BattlePower {
    pub fn as_f64(&self) -> f64 {
        let value = self.magnitude.to_f64().unwrap_or(f64::INFINITY) / 1e16;
        if self.negative { -value } else { value }
    }
}

/// Decodes one raw word.
///
/// Words at or above `2^255` are negative: `-(2^256 - word)`. Both branches
/// are then read with 16 implied decimals.
pub fn decode_battle_power(word: &BigUint) -> BattlePower {
    let midpoint = pow2(255);
    if *word >= midpoint {
        let modulus = pow2(256);
        let magnitude = if *word < modulus {
            modulus - word
        } else {
            BigUint::zero()
        };
        BattlePower {
            negative: !magnitude.is_zero(),
            magnitude,
        }
    } else {
        BattlePower {
            negative: false,
            magnitude: word.clone(),
        }
    }
}

impl fmt::Display for BattlePower {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = &self.magnitude / scale();
        let frac = &self.magnitude % scale();
        if self.negative {
            f.write_str("-")?;
        }
        write!(f, "{whole}")?;
        if !frac.is_zero() {
            let digits = format!("{:0>width$}", frac.to_str_radix(10), width = POWER_DECIMALS);
            write!(f, ".{}", digits.trim_end_matches('0'))?;
        }
        Ok(())
    }
}
