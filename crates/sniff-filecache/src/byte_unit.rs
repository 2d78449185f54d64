use std::{
    fmt::{self, Debug, Display},
    ops::{Add, Mul, Sub},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

struct NamedByteUnit {
    value: ByteUnit,
    suffix: &'static str,
}

const KB: NamedByteUnit = NamedByteUnit { value: ByteUnit::KB, suffix: "KB" };
const MB: NamedByteUnit = NamedByteUnit { value: ByteUnit::MB, suffix: "MB" };
const GB: NamedByteUnit = NamedByteUnit { value: ByteUnit::GB, suffix: "GB" };
const TB: NamedByteUnit = NamedByteUnit { value: ByteUnit::TB, suffix: "TB" };

/// A number of bytes. Used for cache budgets and for reporting sizes in logs.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ByteUnit(u64);

impl ByteUnit {
    pub const ZERO: ByteUnit = ByteUnit(0);
    pub const MAX: ByteUnit = ByteUnit(u64::MAX);

    pub const KB: ByteUnit = ByteUnit(1 << 10);
    pub const MB: ByteUnit = ByteUnit(1 << 20);
    pub const GB: ByteUnit = ByteUnit(1 << 30);
    pub const TB: ByteUnit = ByteUnit(1 << 40);

    pub const fn new(bytes: u64) -> ByteUnit {
        ByteUnit(bytes)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    const fn as_f64(&self) -> f64 {
        self.0 as f64
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub const fn from_kb(kb: u64) -> ByteUnit {
        ByteUnit(kb.saturating_mul(KB.value.0))
    }

    pub const fn from_mb(mb: u64) -> ByteUnit {
        ByteUnit(mb.saturating_mul(MB.value.0))
    }

    pub const fn from_gb(gb: u64) -> ByteUnit {
        ByteUnit(gb.saturating_mul(GB.value.0))
    }
}

impl Display for ByteUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = *self;
        for unit in &[TB, GB, MB, KB] {
            if value >= unit.value {
                let whole = value.0 / unit.value.0;
                let rem = ByteUnit(value.0 % unit.value.0);
                let frac = rem.as_f64() / unit.value.as_f64();
                if frac < 0.005 {
                    write!(f, "{whole} {}", unit.suffix)?;
                } else if frac >= 0.95 {
                    write!(f, "{} {}", whole + 1, unit.suffix)?;
                } else {
                    write!(f, "{whole}.{:02.0} {}", frac * 100.0, unit.suffix)?;
                }
                return Ok(());
            }
        }

        write!(f, "{} B", value.0)
    }
}

impl Debug for ByteUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseByteUnitErr {
    #[error("empty byte size")]
    Empty,

    #[error("invalid byte size number `{0}`")]
    InvalidNumber(String),

    #[error("unknown byte size suffix `{0}`")]
    UnknownSuffix(String),
}

impl FromStr for ByteUnit {
    type Err = ParseByteUnitErr;

    /// Parses `"4096"`, `"512KB"`, `"512 kb"`, `"64 MB"` and friends.
    /// Suffixes are binary multiples.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseByteUnitErr::Empty);
        }

        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, suffix) = s.split_at(split);
        let count: u64 = digits
            .parse()
            .map_err(|_| ParseByteUnitErr::InvalidNumber(digits.to_string()))?;

        let multiplier = match suffix.trim().to_ascii_uppercase().as_str() {
            "" | "B" => ByteUnit(1),
            "K" | "KB" => ByteUnit::KB,
            "M" | "MB" => ByteUnit::MB,
            "G" | "GB" => ByteUnit::GB,
            "T" | "TB" => ByteUnit::TB,
            other => return Err(ParseByteUnitErr::UnknownSuffix(other.to_string())),
        };

        Ok(multiplier * count)
    }
}

impl Serialize for ByteUnit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for ByteUnit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bytes(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Bytes(bytes) => Ok(ByteUnit(bytes)),
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

impl<T: Into<ByteUnit>> Mul<T> for ByteUnit {
    type Output = Self;

    #[inline(always)]
    fn mul(self, rhs: T) -> Self::Output {
        ByteUnit(self.0.saturating_mul(rhs.into().0))
    }
}

impl<T: Into<ByteUnit>> Add<T> for ByteUnit {
    type Output = Self;

    #[inline(always)]
    fn add(self, rhs: T) -> Self::Output {
        ByteUnit(self.0.saturating_add(rhs.into().0))
    }
}

impl<T: Into<ByteUnit>> Sub<T> for ByteUnit {
    type Output = Self;

    #[inline(always)]
    fn sub(self, rhs: T) -> Self::Output {
        ByteUnit(self.0.saturating_sub(rhs.into().0))
    }
}

macro_rules! impl_arith_op {
    ($T:ident, $Trait:ident, $func:ident, $op:tt) => (
        impl $Trait<ByteUnit> for $T {
            type Output = ByteUnit;

            #[inline(always)]
            fn $func(self, rhs: ByteUnit) -> Self::Output {
                ByteUnit::from(self) $op rhs
            }
        }
    )
}

macro_rules! impl_primitive {
    ($T:ident) => {
        impl From<$T> for ByteUnit {
            fn from(bytes: $T) -> ByteUnit {
                ByteUnit(bytes as u64)
            }
        }

        impl_arith_op!($T, Mul, mul, *);
        impl_arith_op!($T, Add, add, +);
        impl_arith_op!($T, Sub, sub, -);
    };
}

impl_primitive!(u8);
impl_primitive!(u16);
impl_primitive!(u32);
impl_primitive!(u64);
impl_primitive!(usize);
