// ── Fixed-point decimals ──
//
// The controller reports levels, positions and temperatures with three
// fractional digits. Stored as an exact count of thousandths so equality
// comparisons in the cache never suffer from float noise.

use std::fmt;
use std::str::FromStr;

use super::DecodeError;

/// Exact decimal with three fractional digits (e.g. `21.500`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FixedPoint(i64);

impl FixedPoint {
    /// Number of raw units per whole number.
    pub const SCALE: i64 = 1000;

    pub const ZERO: Self = Self(0);

    /// Build from a raw count of thousandths.
    pub const fn from_thousandths(raw: i64) -> Self {
        Self(raw)
    }

    /// Build from a whole number.
    pub const fn from_int(value: i64) -> Self {
        Self(value.saturating_mul(Self::SCALE))
    }

    /// Build from a float, rounding to the nearest thousandth.
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    pub fn from_f64(value: f64) -> Self {
        Self((value * 1000.0).round() as i64)
    }

    /// Raw count of thousandths.
    pub const fn thousandths(self) -> i64 {
        self.0
    }

    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Clamp into `[min, max]`.
    pub fn clamp_to(self, min: Self, max: Self) -> Self {
        Self(self.0.clamp(min.0, max.0))
    }
}

impl From<i32> for FixedPoint {
    fn from(value: i32) -> Self {
        Self::from_int(i64::from(value))
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:03}", abs / 1000, abs % 1000)
    }
}

impl FromStr for FixedPoint {
    type Err = DecodeError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let err = || DecodeError::new(token, "FixedPoint");

        let (negative, body) = match token.as_bytes().first() {
            Some(b'-') => (true, &token[1..]),
            Some(b'+') => (false, &token[1..]),
            _ => (false, token),
        };

        let (whole, frac) = match body.split_once('.') {
            Some((w, f)) => (w, f),
            None => (body, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(err());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(err());
        }
        // Precision beyond thousandths is only accepted when it is zero padding.
        if frac.len() > 3 && frac[3..].bytes().any(|b| b != b'0') {
            return Err(err());
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| err())?
        };

        let mut frac_value: i64 = 0;
        for (i, digit) in frac.bytes().take(3).enumerate() {
            let place = match i {
                0 => 100,
                1 => 10,
                _ => 1,
            };
            frac_value += i64::from(digit - b'0') * place;
        }

        let raw = whole_value
            .checked_mul(Self::SCALE)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(err)?;

        Ok(Self(if negative { -raw } else { raw }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_text() {
        assert_eq!("21.5".parse::<FixedPoint>().unwrap().thousandths(), 21_500);
        assert_eq!("-0.25".parse::<FixedPoint>().unwrap().thousandths(), -250);
        assert_eq!("100".parse::<FixedPoint>().unwrap().thousandths(), 100_000);
        assert_eq!(".5".parse::<FixedPoint>().unwrap().thousandths(), 500);
        assert_eq!("1.2340000".parse::<FixedPoint>().unwrap().thousandths(), 1_234);
    }

    #[test]
    fn rejects_garbage_and_excess_precision() {
        for token in ["", "-", ".", "abc", "1.2.3", "1e3", "1.0001", "12a"] {
            assert!(token.parse::<FixedPoint>().is_err(), "{token:?} should fail");
        }
    }

    #[test]
    fn displays_three_digits() {
        assert_eq!(FixedPoint::from_thousandths(21_500).to_string(), "21.500");
        assert_eq!(FixedPoint::from_thousandths(-250).to_string(), "-0.250");
        assert_eq!(FixedPoint::ZERO.to_string(), "0.000");
    }

    #[test]
    fn float_conversion_rounds() {
        assert_eq!(FixedPoint::from_f64(0.1234).thousandths(), 123);
        assert!((FixedPoint::from_thousandths(1_500).to_f64() - 1.5).abs() < f64::EPSILON);
    }
}
