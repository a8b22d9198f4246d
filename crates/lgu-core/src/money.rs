//! # Money Module
//!
//! Provides the `Money` type for handling peso amounts safely.
//!
//! ## Why Integer Centavos?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Fees on the books:  499.98 + 500.00 + 300.00                           │
//! │    as f64            = 1299.98000000000002  ❌                          │
//! │                                                                         │
//! │  Quarterly split of 3299.98 / 4 = 824.995 → not a payable amount        │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Centavos                                         │
//! │    329998 centavos split into 82500 + 82500 + 82499 + 82499             │
//! │    Sum is exactly the annual total, every installment is payable        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use lgu_core::money::Money;
//!
//! let fee = Money::from_cents(49998);              // ₱499.98
//! let total = fee + Money::from_major_minor(500, 0); // ₱999.98
//! assert_eq!(total.cents(), 99998);
//!
//! // Decimal strings from forms and JSON are parsed exactly
//! let parsed: Money = "1299.98".parse().unwrap();
//! assert_eq!(parsed.cents(), 129998);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A peso amount in centavos.
///
/// ## Design Decisions
/// - **i64 (signed)**: discounts are subtracted and may be shown negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Derives**: full serde support (serialized as centavos)
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  taxable_amount ──► × rate ──► tax_amount ──┐                           │
/// │                                             ├──► total_tax ──► ÷ 4      │
/// │  active fees ──► Σ ──► regulatory_fees ─────┘          │                │
/// │                                                        ▼                │
/// │                               QuarterlyTax.total_quarterly_tax × 4      │
/// │                                                        │                │
/// │                     + penalty − discount ──► PaymentTransaction.amount  │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    ///
    /// ## Example
    /// ```rust
    /// use lgu_core::money::Money;
    ///
    /// let fee = Money::from_cents(49998); // ₱499.98
    /// assert_eq!(fee.cents(), 49998);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from pesos and centavos.
    ///
    /// ## Example
    /// ```rust
    /// use lgu_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(824, 99).cents(), 82499);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts, only the major unit should be negative.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-peso portion.
    #[inline]
    pub const fn pesos(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the centavo portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Lossy conversion for JSON display. Never feed the result back into
    /// arithmetic.
    #[inline]
    pub fn as_pesos_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Converts a decimal peso amount from a JSON request, rounding to the
    /// nearest centavo. `None` for NaN, infinities and out-of-range values.
    pub fn from_pesos_f64(pesos: f64) -> Option<Self> {
        if !pesos.is_finite() {
            return None;
        }
        let cents = (pesos * 100.0).round();
        if cents.abs() > i64::MAX as f64 / 2.0 {
            return None;
        }
        Some(Money(cents as i64))
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Applies a rate, rounding half away from zero to the centavo.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`, computed in i128.
    ///
    /// ## Example
    /// ```rust
    /// use lgu_core::money::Money;
    /// use lgu_core::types::TaxRate;
    ///
    /// let gross = Money::from_major_minor(100_000, 0);
    /// let tax = gross.calculate_tax(TaxRate::from_bps(200)); // 2%
    /// assert_eq!(tax, Money::from_major_minor(2_000, 0));
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        self.apply_bps(rate.bps())
    }

    /// `self × bps / 10000`, rounded to the nearest centavo.
    pub fn apply_bps(&self, bps: u32) -> Money {
        let product = self.0 as i128 * bps as i128;
        let rounded = if product >= 0 {
            (product + 5000) / 10000
        } else {
            (product - 5000) / 10000
        };
        Money::from_cents(rounded as i64)
    }

    /// Splits the amount into `parts` installments that sum back exactly.
    ///
    /// Leftover centavos go to the earliest installments.
    ///
    /// ## Example
    /// ```rust
    /// use lgu_core::money::Money;
    ///
    /// let parts = Money::from_cents(329998).split_even(4);
    /// let cents: Vec<i64> = parts.iter().map(|m| m.cents()).collect();
    /// assert_eq!(cents, vec![82500, 82500, 82499, 82499]);
    /// ```
    pub fn split_even(&self, parts: usize) -> Vec<Money> {
        if parts == 0 {
            return Vec::new();
        }
        let n = parts as i64;
        let base = self.0.div_euclid(n);
        let remainder = self.0.rem_euclid(n);
        (0..n)
            .map(|i| Money(base + if i < remainder { 1 } else { 0 }))
            .collect()
    }

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses decimal peso strings: `"100000"`, `"499.98"`, `"824.5"`, `"-12.05"`.
///
/// More than two decimal places is rejected rather than rounded, so a
/// taxpayer never pays a different amount than the one submitted.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "amount".to_string(),
            });
        }

        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("not a number"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid("not a number"));
        }
        if frac.len() > 2 {
            return Err(invalid("at most two decimal places"));
        }

        let pesos: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("amount too large"))?
        };
        let centavos: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid("not a number"))? * 10,
            _ => frac.parse().map_err(|_| invalid("not a number"))?,
        };

        let cents = pesos
            .checked_mul(100)
            .and_then(|c| c.checked_add(centavos))
            .ok_or_else(|| invalid("amount too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering, e.g. `3299.98`, used on receipts and in logs.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.pesos().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(82499);
        assert_eq!(money.cents(), 82499);
        assert_eq!(money.pesos(), 824);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_pesos_f64() {
        assert_eq!(Money::from_pesos_f64(1299.98), Some(Money::from_cents(129_998)));
        assert_eq!(Money::from_pesos_f64(0.1 + 0.2), Some(Money::from_cents(30)));
        assert_eq!(Money::from_pesos_f64(-5.005).map(|m| m.is_negative()), Some(true));
        assert_eq!(Money::from_pesos_f64(f64::NAN), None);
        assert_eq!(Money::from_pesos_f64(f64::INFINITY), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(329998).to_string(), "3299.98");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_parse_decimal_strings() {
        assert_eq!("100000".parse::<Money>().unwrap().cents(), 10_000_000);
        assert_eq!("499.98".parse::<Money>().unwrap().cents(), 49_998);
        assert_eq!("824.5".parse::<Money>().unwrap().cents(), 82_450);
        assert_eq!(".75".parse::<Money>().unwrap().cents(), 75);
        assert_eq!("-12.05".parse::<Money>().unwrap().cents(), -1_205);

        assert!("".parse::<Money>().is_err());
        assert!("12.345".parse::<Money>().is_err());
        assert!("1e5".parse::<Money>().is_err());
        assert!("12,000".parse::<Money>().is_err());
        assert!(".".parse::<Money>().is_err());
    }

    #[test]
    fn test_gross_sales_example() {
        // 100,000.00 at 2% = 2,000.00
        let tax = Money::from_major_minor(100_000, 0).calculate_tax(TaxRate::from_bps(200));
        assert_eq!(tax.cents(), 200_000);
    }

    #[test]
    fn test_apply_bps_rounds_half_away_from_zero() {
        // 10.00 at 8.25% = 0.825 → 0.83
        assert_eq!(Money::from_cents(1000).apply_bps(825).cents(), 83);
        assert_eq!(Money::from_cents(-1000).apply_bps(825).cents(), -83);
    }

    #[test]
    fn test_split_even_sums_back() {
        let total = Money::from_cents(329_998);
        let parts = total.split_even(4);
        assert_eq!(parts.len(), 4);
        assert_eq!(parts.iter().copied().sum::<Money>(), total);
        assert_eq!(parts[0].cents(), 82_500);
        assert_eq!(parts[3].cents(), 82_499);

        let exact = Money::from_cents(400).split_even(4);
        assert!(exact.iter().all(|m| m.cents() == 100));

        assert!(Money::from_cents(100).split_even(0).is_empty());
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(1).is_positive());
        assert!(Money::from_cents(-1).is_negative());
    }
}
