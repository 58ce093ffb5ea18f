//! Fixed-point numbers and 2D vectors for the battlefield.
//!
//! All simulation math uses fixed-point arithmetic so that two servers
//! fed the same requests end up with bit-identical worlds. Floating-point
//! values only appear at the edges: configuration files and the headless
//! JSON protocol.

use std::ops::{Add, Sub};

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Signed 32.32 fixed-point scalar used for positions, speeds and time.
pub type Fixed = I32F32;

/// Fixed-point 2D vector on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Bit-exact encoding for snapshots: a `Fixed` travels as its `i64` bits.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Write the raw bits.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Read raw bits back.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        i64::deserialize(deserializer).map(Fixed::from_bits)
    }
}

/// Serde support for `Option<Fixed>` via raw bits.
pub mod option_fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Write `Some(bits)` or `None`.
    pub fn serialize<S>(value: &Option<Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_some(&v.to_bits()),
            None => serializer.serialize_none(),
        }
    }

    /// Read `Some(bits)` or `None`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<i64>::deserialize(deserializer).map(|bits| bits.map(Fixed::from_bits))
    }
}

/// Serde support for human-written decimals.
///
/// Configuration files say `range: 25.0`, not raw bits. The conversion
/// happens once at load time, so the tick itself never sees a float.
pub mod decimal_serde {
    use super::Fixed;
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.to_num::<f64>())
    }

    /// Deserialize a decimal into a fixed-point number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| de::Error::custom(format!("{value} is out of fixed-point range")))
    }
}

/// Serde support for optional human-written decimals.
pub mod option_decimal_serde {
    use super::Fixed;
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize an optional fixed-point number as a decimal.
    pub fn serialize<S>(value: &Option<Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_some(&v.to_num::<f64>()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<f64>::deserialize(deserializer)? {
            Some(value) => Fixed::checked_from_num(value)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("{value} is out of fixed-point range"))),
            None => Ok(None),
        }
    }
}

impl Vec2Fixed {
    /// Vector from two scalars.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Squared distance. Range and clearance checks compare against this.
    ///
    /// Saturates at [`Fixed::MAX`], so points too far apart to measure
    /// still compare as out of range.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let delta = Self::new(self.x.saturating_sub(other.x), self.y.saturating_sub(other.y));
        delta.dot(delta)
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        sqrt(self.distance_squared(other))
    }

    /// Vector length.
    #[must_use]
    pub fn length(self) -> Fixed {
        sqrt(self.dot(self))
    }

    /// Dot product, saturating on overflow.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x
            .saturating_mul(other.x)
            .saturating_add(self.y.saturating_mul(other.y))
    }

    /// Scale both components.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Point `t` of the way from `self` to `other`.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        self + (other - self).scale(t)
    }

    /// Unit vector in the same direction; zero stays zero.
    #[must_use]
    pub fn normalize(self) -> Self {
        match self.length() {
            len if len == Fixed::ZERO => Self::ZERO,
            len => Self::new(self.x / len, self.y / len),
        }
    }

    /// Move toward `target` by at most `max_step`, landing exactly on it
    /// instead of overshooting.
    #[must_use]
    pub fn move_towards(self, target: Self, max_step: Fixed) -> Self {
        let remaining = self.distance(target);
        if remaining <= max_step || remaining == Fixed::ZERO {
            return target;
        }

        self + (target - self).normalize().scale(max_step)
    }

    /// Convert to floats for presentation layers.
    #[must_use]
    pub fn to_f64(self) -> (f64, f64) {
        (self.x.to_num(), self.y.to_num())
    }
}

/// Square of a scalar, saturating at [`Fixed::MAX`].
#[must_use]
pub fn squared(value: Fixed) -> Fixed {
    value.saturating_mul(value)
}

/// Integer-only square root by bisection. Non-positive input gives zero.
#[must_use]
pub fn sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let (mut below, mut above) = (Fixed::ZERO, value.max(Fixed::ONE));
    for _ in 0..64 {
        let guess = below + (above - below) / 2;
        if guess.saturating_mul(guess) <= value {
            below = guess;
        } else {
            above = guess;
        }
    }
    below
}

impl Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_squared_is_exact() {
        let a = Vec2Fixed::from_ints(3, 0);
        let b = Vec2Fixed::from_ints(0, 4);
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
    }

    #[test]
    fn test_sqrt_exact_squares() {
        let epsilon = Fixed::ONE / Fixed::from_num(100_000);
        for n in [1, 4, 9, 100, 400, 10_000] {
            let root = sqrt(Fixed::from_num(n));
            let expected = Fixed::from_num(f64::from(n).sqrt());
            assert!((root - expected).abs() < epsilon, "sqrt({n}) = {root}");
        }
        assert_eq!(sqrt(Fixed::from_num(-4)), Fixed::ZERO);
    }

    #[test]
    fn test_vec2_distance() {
        let a = Vec2Fixed::from_ints(0, 0);
        let b = Vec2Fixed::from_ints(3, 4);
        let epsilon = Fixed::ONE / Fixed::from_num(100_000);
        assert!((a.distance(b) - Fixed::from_num(5)).abs() < epsilon);
    }

    #[test]
    fn test_lerp_quarter_way() {
        let from = Vec2Fixed::from_ints(-40, 0);
        let to = Vec2Fixed::from_ints(-40, 40);
        assert_eq!(from.lerp(to, Fixed::from_num(0.25)), Vec2Fixed::from_ints(-40, 10));
    }

    #[test]
    fn test_distance_squared_saturates_when_far_apart() {
        let near = Vec2Fixed::from_ints(0, 0);
        let far = Vec2Fixed::from_ints(100_000, 0);
        assert_eq!(near.distance_squared(far), Fixed::MAX);

        let opposite = Vec2Fixed::new(Fixed::MIN, Fixed::MAX);
        assert_eq!(opposite.distance_squared(Vec2Fixed::new(Fixed::MAX, Fixed::MIN)), Fixed::MAX);
        assert_eq!(squared(Fixed::from_num(-50_000)), Fixed::MAX);
        assert_eq!(squared(Fixed::from_num(8)), Fixed::from_num(64));
    }

    #[test]
    fn test_normalize_gives_unit_length() {
        let unit = Vec2Fixed::from_ints(-6, 8).normalize();
        let epsilon = Fixed::ONE / Fixed::from_num(10_000);
        assert!((unit.length() - Fixed::ONE).abs() < epsilon);
        assert!((unit.x + Fixed::from_num(0.6)).abs() < epsilon);
        assert!((unit.y - Fixed::from_num(0.8)).abs() < epsilon);

        assert_eq!(Vec2Fixed::ZERO.normalize(), Vec2Fixed::ZERO);
    }

    #[test]
    fn test_move_towards_snaps_instead_of_overshooting() {
        let start = Vec2Fixed::from_ints(0, 0);
        let target = Vec2Fixed::from_ints(2, 0);

        assert_eq!(start.move_towards(target, Fixed::from_num(5)), target);

        let partial = start.move_towards(target, Fixed::ONE);
        let epsilon = Fixed::ONE / Fixed::from_num(10_000);
        assert!((partial.x - Fixed::ONE).abs() < epsilon);
        assert_eq!(partial.y, Fixed::ZERO);
    }

    #[test]
    fn test_decimal_serde_reads_config_values() {
        #[derive(Deserialize)]
        struct Range {
            #[serde(with = "decimal_serde")]
            value: Fixed,
        }

        let parsed: Range = ron::from_str("(value: 12.5)").unwrap();
        assert_eq!(parsed.value, Fixed::from_num(12.5));
        assert!(ron::from_str::<Range>("(value: 1e12)").is_err());
    }
}
