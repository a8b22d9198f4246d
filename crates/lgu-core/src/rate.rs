//! # Rate Resolver
//!
//! Picks the applicable rate row from a time-bounded rate table.
//!
//! ## Selection Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  configs ──► drop expired (expiration < as_of)                         │
//! │          ──► keep rows whose scope answers the lookup                   │
//! │               • capital: min_amount <= amount <= max_amount            │
//! │               • gross:   business_type matches (trimmed, any case)     │
//! │          ──► winner = latest effective_date, then highest id            │
//! │                                                                         │
//! │  no survivor ──► RateResolution::NoApplicableRate                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{RateScope, TaxCalculationType, TaxConfiguration, TaxRate};

/// Zero sentinel older rate tables use for "no expiration".
const ZERO_DATE: &str = "0000-00-00";

/// What the caller is asking a rate for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLookup {
    /// Declared capital of a new business.
    CapitalInvestment(Money),
    /// Business type of a renewing business.
    GrossSales(String),
}

impl RateLookup {
    pub fn calculation_type(&self) -> TaxCalculationType {
        match self {
            RateLookup::CapitalInvestment(_) => TaxCalculationType::CapitalInvestment,
            RateLookup::GrossSales(_) => TaxCalculationType::GrossSales,
        }
    }

    /// Human-readable key, used in errors and logs.
    pub fn key(&self) -> String {
        match self {
            RateLookup::CapitalInvestment(amount) => amount.to_string(),
            RateLookup::GrossSales(business_type) => business_type.trim().to_string(),
        }
    }
}

/// Outcome of a rate lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateResolution {
    Resolved(TaxConfiguration),
    NoApplicableRate,
}

impl RateResolution {
    /// The resolved rate, or zero on a miss.
    pub fn rate_or_zero(&self) -> TaxRate {
        match self {
            RateResolution::Resolved(config) => config.rate,
            RateResolution::NoApplicableRate => TaxRate::zero(),
        }
    }

    /// Where the rate came from, as reported to the dashboard.
    pub fn source(&self) -> RateSource {
        match self {
            RateResolution::Resolved(_) => RateSource::Configured,
            RateResolution::NoApplicableRate => RateSource::DefaultZero,
        }
    }
}

/// Provenance of the rate used in a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    Configured,
    DefaultZero,
}

/// Parses a stored expiration value.
///
/// `None`, `""` and `"0000-00-00"` all mean open-ended.
pub fn parse_expiration(raw: Option<&str>) -> Result<Option<NaiveDate>, ValidationError> {
    let Some(raw) = raw.map(str::trim) else {
        return Ok(None);
    };

    if raw.is_empty() || raw == ZERO_DATE {
        return Ok(None);
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ValidationError::InvalidFormat {
            field: "expiration_date".to_string(),
            reason: format!("'{}' is not a YYYY-MM-DD date", raw),
        })
}

/// True while a row with this expiration still applies on `as_of`.
#[inline]
pub fn is_active(expiration: Option<NaiveDate>, as_of: NaiveDate) -> bool {
    match expiration {
        None => true,
        Some(expires) => expires >= as_of,
    }
}

fn answers(scope: &RateScope, lookup: &RateLookup) -> bool {
    match (scope, lookup) {
        (
            RateScope::CapitalInvestment {
                min_amount,
                max_amount,
            },
            RateLookup::CapitalInvestment(amount),
        ) => min_amount <= amount && amount <= max_amount,
        (RateScope::GrossSales { business_type }, RateLookup::GrossSales(wanted)) => {
            business_type.trim().eq_ignore_ascii_case(wanted.trim())
        }
        _ => false,
    }
}

/// Resolves the rate row for `lookup` as of `as_of`.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use lgu_core::rate::{resolve_rate, RateLookup, RateResolution};
/// use lgu_core::types::{RateScope, TaxConfiguration, TaxRate};
///
/// let retail = TaxConfiguration {
///     id: 1,
///     scope: RateScope::GrossSales { business_type: "Retail".into() },
///     rate: TaxRate::from_bps(200),
///     effective_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///     expiration_date: None,
/// };
/// let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
///
/// let hit = resolve_rate(&[retail], &RateLookup::GrossSales("retail".into()), today);
/// assert_eq!(hit.rate_or_zero().bps(), 200);
///
/// let miss = resolve_rate(&[], &RateLookup::GrossSales("retail".into()), today);
/// assert_eq!(miss, RateResolution::NoApplicableRate);
/// ```
pub fn resolve_rate(
    configs: &[TaxConfiguration],
    lookup: &RateLookup,
    as_of: NaiveDate,
) -> RateResolution {
    configs
        .iter()
        .filter(|c| is_active(c.expiration_date, as_of))
        .filter(|c| answers(&c.scope, lookup))
        .max_by_key(|c| (c.effective_date, c.id))
        .cloned()
        .map(RateResolution::Resolved)
        .unwrap_or(RateResolution::NoApplicableRate)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn gross(id: i64, business_type: &str, bps: u32, effective: NaiveDate) -> TaxConfiguration {
        TaxConfiguration {
            id,
            scope: RateScope::GrossSales {
                business_type: business_type.into(),
            },
            rate: TaxRate::from_bps(bps),
            effective_date: effective,
            expiration_date: None,
        }
    }

    fn bracket(id: i64, min: i64, max: i64, bps: u32) -> TaxConfiguration {
        TaxConfiguration {
            id,
            scope: RateScope::CapitalInvestment {
                min_amount: Money::from_major_minor(min, 0),
                max_amount: Money::from_major_minor(max, 0),
            },
            rate: TaxRate::from_bps(bps),
            effective_date: date(2024, 1, 1),
            expiration_date: None,
        }
    }

    #[test]
    fn test_parse_expiration_sentinels() {
        assert_eq!(parse_expiration(None).unwrap(), None);
        assert_eq!(parse_expiration(Some("")).unwrap(), None);
        assert_eq!(parse_expiration(Some("0000-00-00")).unwrap(), None);
        assert_eq!(
            parse_expiration(Some("2026-12-31")).unwrap(),
            Some(date(2026, 12, 31))
        );
        assert!(parse_expiration(Some("31/12/2026")).is_err());
    }

    #[test]
    fn test_expiration_is_inclusive() {
        let today = date(2026, 10, 16);
        assert!(is_active(None, today));
        assert!(is_active(Some(today), today));
        assert!(!is_active(Some(date(2026, 10, 15)), today));
    }

    #[test]
    fn test_latest_effective_date_wins() {
        let configs = vec![
            gross(1, "Retail", 150, date(2023, 1, 1)),
            gross(2, "Retail", 200, date(2025, 1, 1)),
            gross(3, "Wholesale", 300, date(2026, 1, 1)),
        ];
        let resolved = resolve_rate(
            &configs,
            &RateLookup::GrossSales(" RETAIL ".into()),
            date(2026, 10, 16),
        );
        assert_eq!(resolved.rate_or_zero().bps(), 200);
        assert_eq!(resolved.source(), RateSource::Configured);
    }

    #[test]
    fn test_expired_rows_are_skipped() {
        let mut newest = gross(2, "Retail", 250, date(2025, 1, 1));
        newest.expiration_date = Some(date(2025, 12, 31));
        let configs = vec![gross(1, "Retail", 150, date(2023, 1, 1)), newest];

        let resolved = resolve_rate(
            &configs,
            &RateLookup::GrossSales("Retail".into()),
            date(2026, 10, 16),
        );
        assert_eq!(resolved.rate_or_zero().bps(), 150);
    }

    #[test]
    fn test_effective_date_tie_breaks_on_highest_id() {
        let configs = vec![
            gross(7, "Retail", 200, date(2025, 1, 1)),
            gross(9, "Retail", 225, date(2025, 1, 1)),
            gross(8, "Retail", 210, date(2025, 1, 1)),
        ];
        let resolved = resolve_rate(
            &configs,
            &RateLookup::GrossSales("Retail".into()),
            date(2026, 1, 1),
        );
        match resolved {
            RateResolution::Resolved(config) => assert_eq!(config.id, 9),
            other => panic!("expected a rate, got {:?}", other),
        }
    }

    #[test]
    fn test_capital_bracket_bounds_are_inclusive() {
        let configs = vec![bracket(1, 0, 50_000, 100), bracket(2, 50_001, 500_000, 150)];
        let today = date(2026, 10, 16);

        let at_edge = resolve_rate(
            &configs,
            &RateLookup::CapitalInvestment(Money::from_major_minor(50_000, 0)),
            today,
        );
        assert_eq!(at_edge.rate_or_zero().bps(), 100);

        let next = resolve_rate(
            &configs,
            &RateLookup::CapitalInvestment(Money::from_major_minor(50_001, 0)),
            today,
        );
        assert_eq!(next.rate_or_zero().bps(), 150);
    }

    #[test]
    fn test_miss_is_typed_and_defaults_to_zero() {
        let configs = vec![bracket(1, 0, 50_000, 100)];
        let resolved = resolve_rate(
            &configs,
            &RateLookup::CapitalInvestment(Money::from_major_minor(1_000_000, 0)),
            date(2026, 10, 16),
        );
        assert_eq!(resolved, RateResolution::NoApplicableRate);
        assert!(resolved.rate_or_zero().is_zero());
        assert_eq!(resolved.source(), RateSource::DefaultZero);
    }

    #[test]
    fn test_scope_kinds_do_not_cross() {
        let configs = vec![gross(1, "Retail", 200, date(2024, 1, 1))];
        let resolved = resolve_rate(
            &configs,
            &RateLookup::CapitalInvestment(Money::from_major_minor(10, 0)),
            date(2026, 1, 1),
        );
        assert_eq!(resolved, RateResolution::NoApplicableRate);
    }
}
