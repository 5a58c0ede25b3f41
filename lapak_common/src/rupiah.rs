use std::{fmt, fmt::Display, str::FromStr};

use serde::{de, de::Visitor, Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

pub const RUPIAH_CURRENCY_CODE: &str = "IDR";
const SEN_PER_RUPIAH: i64 = 100;

//--------------------------------------       Rupiah        ---------------------------------------------------------
/// An exact rupiah amount with two fraction digits, held as an integer number of sen (1/100 rupiah).
///
/// Amounts are serialized as decimal strings ("15000.50") so that no client ever sees a float. Deserialization also
/// accepts plain JSON numbers.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[sqlx(transparent)]
pub struct Rupiah(i64);

impl Rupiah {
    pub const fn from_sen(sen: i64) -> Self {
        Self(sen)
    }

    pub fn from_rupiah(rupiah: i64) -> Self {
        Self(rupiah.saturating_mul(SEN_PER_RUPIAH))
    }

    pub fn sen(&self) -> i64 {
        self.0
    }

    /// The whole-rupiah part of the amount. Fractional sen are discarded (truncation towards zero).
    pub fn whole_rupiah(&self) -> i64 {
        self.0 / SEN_PER_RUPIAH
    }

    pub fn is_whole(&self) -> bool {
        self.0 % SEN_PER_RUPIAH == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Multiplies by an integer quantity, returning `None` on overflow.
    pub fn checked_mul(self, quantity: i64) -> Option<Self> {
        self.0.checked_mul(quantity).map(Self)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid rupiah amount '{amount}': {reason}")]
pub struct RupiahParseError {
    pub amount: String,
    pub reason: String,
}

impl RupiahParseError {
    fn new(amount: &str, reason: &str) -> Self {
        Self { amount: amount.to_string(), reason: reason.to_string() }
    }
}

impl FromStr for Rupiah {
    type Err = RupiahParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, fraction) = match digits.split_once('.') {
            Some((_, "")) => return Err(RupiahParseError::new(s, "missing digits after the decimal point")),
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RupiahParseError::new(s, "not a decimal number"));
        }
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RupiahParseError::new(s, "not a decimal number"));
        }
        if fraction.len() > 2 {
            return Err(RupiahParseError::new(s, "at most 2 decimal places are allowed"));
        }
        let whole = whole.parse::<i64>().map_err(|e| RupiahParseError::new(s, &e.to_string()))?;
        let fraction_sen = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|e| RupiahParseError::new(s, &e.to_string()))? * 10,
            _ => fraction.parse::<i64>().map_err(|e| RupiahParseError::new(s, &e.to_string()))?,
        };
        let sen = whole
            .checked_mul(SEN_PER_RUPIAH)
            .and_then(|v| v.checked_add(fraction_sen))
            .ok_or_else(|| RupiahParseError::new(s, "amount is too large"))?;
        Ok(Self(if negative { -sen } else { sen }))
    }
}

impl Display for Rupiah {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / SEN_PER_RUPIAH as u64, abs % SEN_PER_RUPIAH as u64)
    }
}

impl Serialize for Rupiah {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct RupiahVisitor;

impl<'de> Visitor<'de> for RupiahVisitor {
    type Value = Rupiah;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a rupiah amount with at most 2 decimal places, as a string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Rupiah::from_str(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        v.checked_mul(SEN_PER_RUPIAH).map(Rupiah).ok_or_else(|| E::custom("amount is too large"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        i64::try_from(v).map_err(E::custom).and_then(|v| self.visit_i64(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        // Shortest round-trip formatting, so 19.99 arrives as "19.99"
        Rupiah::from_str(&format!("{v}")).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Rupiah {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RupiahVisitor)
    }
}
