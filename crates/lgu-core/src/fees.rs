//! Regulatory fee aggregation.
//!
//! Every fee that is open-ended or not yet expired is added to the business
//! tax. There is no per-business-type filtering.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::rate::is_active;
use crate::types::RegulatoryFee;

/// Sum of the fees active on a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FeeTotal {
    pub amount: Money,
    pub fee_count: u32,
}

/// Sums every fee active on `as_of`.
pub fn aggregate_fees(fees: &[RegulatoryFee], as_of: NaiveDate) -> FeeTotal {
    fees.iter()
        .filter(|fee| is_active(fee.expiration_date, as_of))
        .fold(FeeTotal::default(), |total, fee| FeeTotal {
            amount: total.amount + fee.amount,
            fee_count: total.fee_count + 1,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fee(id: i64, cents: i64, expires: Option<NaiveDate>) -> RegulatoryFee {
        RegulatoryFee {
            id,
            name: format!("fee-{}", id),
            amount: Money::from_cents(cents),
            expiration_date: expires,
        }
    }

    #[test]
    fn test_sums_active_fees() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let fees = vec![
            fee(1, 49_998, None),
            fee(2, 50_000, Some(NaiveDate::from_ymd_opt(2026, 12, 31).unwrap())),
            fee(3, 30_000, Some(today)),
            fee(4, 99_999, Some(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap())),
        ];

        let total = aggregate_fees(&fees, today);
        assert_eq!(total.amount.cents(), 129_998);
        assert_eq!(total.fee_count, 3);
    }

    #[test]
    fn test_empty_is_zero() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(aggregate_fees(&[], today), FeeTotal::default());
    }
}
