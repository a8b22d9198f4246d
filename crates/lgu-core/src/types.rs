//! # Domain Types
//!
//! Core domain types used throughout the portal backend.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐    │
//! │  │ TaxConfiguration │   │    TaxRecord     │   │ PaymentTransaction│   │
//! │  │  ──────────────  │   │  ──────────────  │   │  ──────────────  │    │
//! │  │  scope           │   │  permit id       │   │  payment_id      │    │
//! │  │  rate (bps)      │   │  tax / fees      │   │  otp challenge   │    │
//! │  │  effective/expiry│   │  status          │   │  linkage         │    │
//! │  └──────────────────┘   └────────┬─────────┘   └────────┬─────────┘    │
//! │                                  │ owns 1:4             │ references   │
//! │  ┌──────────────────┐   ┌────────▼─────────┐            │              │
//! │  │  RegulatoryFee   │   │   QuarterlyTax   │◄───────────┘              │
//! │  │  amount / expiry │   │  Q1..Q4, status  │                           │
//! │  └──────────────────┘   └────────▲─────────┘                           │
//! │                                  │ owns 1:4                             │
//! │                         ┌────────┴─────────┐                            │
//! │                         │  PropertyTotal   │  (RPT, per year)           │
//! │                         └──────────────────┘                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000.
/// 200 bps = 2% (a common gross-sales rate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round().max(0.0) as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Rate Configuration
// =============================================================================

/// How a business tax is assessed, which also selects the rate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TaxCalculationType {
    /// New businesses: rate bracket chosen by declared capital.
    CapitalInvestment,
    /// Renewals: rate chosen by business type, applied to gross sales.
    GrossSales,
}

impl TaxCalculationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxCalculationType::CapitalInvestment => "capital_investment",
            TaxCalculationType::GrossSales => "gross_sales",
        }
    }
}

impl FromStr for TaxCalculationType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "capital_investment" | "capital" => Ok(TaxCalculationType::CapitalInvestment),
            "gross_sales" | "gross" => Ok(TaxCalculationType::GrossSales),
            _ => Err(ValidationError::NotAllowed {
                field: "tax_calculation_type".to_string(),
                allowed: vec!["capital_investment".to_string(), "gross_sales".to_string()],
            }),
        }
    }
}

/// The lookup key a configuration row answers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateScope {
    /// Capital bracket `[min_amount, max_amount]`, both inclusive.
    CapitalInvestment { min_amount: Money, max_amount: Money },
    /// Gross sales rate for one business type.
    GrossSales { business_type: String },
}

impl RateScope {
    pub fn calculation_type(&self) -> TaxCalculationType {
        match self {
            RateScope::CapitalInvestment { .. } => TaxCalculationType::CapitalInvestment,
            RateScope::GrossSales { .. } => TaxCalculationType::GrossSales,
        }
    }
}

/// A time-bounded rate table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxConfiguration {
    pub id: i64,
    pub scope: RateScope,
    pub rate: TaxRate,
    #[ts(as = "String")]
    pub effective_date: NaiveDate,
    /// `None` means open-ended.
    #[ts(as = "Option<String>")]
    pub expiration_date: Option<NaiveDate>,
}

/// A flat regulatory fee added on top of every computed business tax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RegulatoryFee {
    pub id: i64,
    pub name: String,
    pub amount: Money,
    #[ts(as = "Option<String>")]
    pub expiration_date: Option<NaiveDate>,
}

// =============================================================================
// Tax Record
// =============================================================================

/// Lifecycle of a business tax record. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TaxRecordStatus {
    /// Computed but not yet billable.
    Pending,
    /// Billable; quarterly rows exist.
    Approved,
    /// Permit active (set by the permit workflow, never by recompute).
    Active,
}

impl Default for TaxRecordStatus {
    fn default() -> Self {
        TaxRecordStatus::Pending
    }
}

impl TaxRecordStatus {
    /// True once the record has left `Pending`.
    pub fn is_frozen(&self) -> bool {
        !matches!(self, TaxRecordStatus::Pending)
    }
}

/// Business tax liability for one permit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRecord {
    pub id: String,
    pub business_permit_id: String,
    pub business_name: String,
    pub full_name: String,
    pub business_type: String,
    pub calculation_type: TaxCalculationType,
    pub taxable_amount: Money,
    pub tax_rate: TaxRate,
    pub tax_amount: Money,
    pub regulatory_fees: Money,
    pub total_tax: Money,
    pub status: TaxRecordStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Annual real-property-tax liability for one registration and year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PropertyTotal {
    pub id: String,
    pub registration_id: String,
    pub tdn: Option<String>,
    pub year: i32,
    pub total_annual_tax: Money,
    pub status: TaxRecordStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Quarterly Ledger
// =============================================================================

/// One of the four fixed calendar billing periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    /// All quarters in billing order.
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    /// 1-based quarter number.
    pub fn number(&self) -> u32 {
        match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 2,
            Quarter::Q3 => 3,
            Quarter::Q4 => 4,
        }
    }

    /// Quarter containing the given date.
    pub fn of(date: NaiveDate) -> Quarter {
        Quarter::ALL[((date.month() - 1) / 3) as usize]
    }

    /// Last calendar day of the quarter in `year`.
    pub fn due_date(&self, year: i32) -> Option<NaiveDate> {
        match self {
            Quarter::Q1 => NaiveDate::from_ymd_opt(year, 3, 31),
            Quarter::Q2 => NaiveDate::from_ymd_opt(year, 6, 30),
            Quarter::Q3 => NaiveDate::from_ymd_opt(year, 9, 30),
            Quarter::Q4 => NaiveDate::from_ymd_opt(year, 12, 31),
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.number())
    }
}

impl FromStr for Quarter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "Q1" | "1" => Ok(Quarter::Q1),
            "Q2" | "2" => Ok(Quarter::Q2),
            "Q3" | "3" => Ok(Quarter::Q3),
            "Q4" | "4" => Ok(Quarter::Q4),
            _ => Err(ValidationError::NotAllowed {
                field: "quarter".to_string(),
                allowed: vec!["Q1".into(), "Q2".into(), "Q3".into(), "Q4".into()],
            }),
        }
    }
}

/// Payment state of a single quarter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum QuarterStatus {
    Pending,
    Paid,
    Overdue,
}

impl Default for QuarterStatus {
    fn default() -> Self {
        QuarterStatus::Pending
    }
}

impl QuarterStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, QuarterStatus::Paid)
    }
}

/// Which parent table a quarter row hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// Parent is a business `TaxRecord`.
    Business,
    /// Parent is an RPT `PropertyTotal`.
    Property,
}

/// One quarterly installment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuarterlyTax {
    pub id: String,
    pub ledger: LedgerKind,
    pub parent_total_id: String,
    pub quarter: Quarter,
    pub year: i32,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub total_quarterly_tax: Money,
    pub penalty_amount: Money,
    pub discount_amount: Money,
    pub payment_status: QuarterStatus,
    pub receipt_number: Option<String>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl QuarterlyTax {
    /// What the taxpayer owes on this row right now.
    pub fn amount_due(&self) -> Money {
        if self.payment_status.is_paid() {
            return Money::zero();
        }
        self.total_quarterly_tax + self.penalty_amount - self.discount_amount
    }
}

// =============================================================================
// Payment Transaction
// =============================================================================

/// Whether the money has been collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

/// Whether the linked ledger rows reflect the payment.
///
/// `Failed` rows form the reconciliation outbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
}

impl Default for SyncStatus {
    fn default() -> Self {
        SyncStatus::Pending
    }
}

/// What a payment settles once verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentLinkage {
    /// Not tied to any ledger row.
    None,
    /// A single quarterly row by id.
    QuarterRow { tax_id: String },
    /// One RPT quarter addressed by property, quarter and year.
    PropertyQuarter {
        property_total_id: String,
        quarter: Quarter,
        year: i32,
    },
    /// Every unpaid RPT quarter of a year.
    PropertyAnnual { property_total_id: String, year: i32 },
}

impl PaymentLinkage {
    /// Builds the linkage from the loose request fields.
    ///
    /// `tax_id` wins over property fields; `is_annual` selects the annual
    /// settlement and ignores `quarter`.
    pub fn from_parts(
        tax_id: Option<String>,
        property_total_id: Option<String>,
        quarter: Option<Quarter>,
        year: Option<i32>,
        is_annual: bool,
    ) -> Result<Self, ValidationError> {
        let tax_id = tax_id.filter(|s| !s.trim().is_empty());
        let property_total_id = property_total_id.filter(|s| !s.trim().is_empty());

        if let Some(tax_id) = tax_id {
            return Ok(PaymentLinkage::QuarterRow { tax_id });
        }

        let Some(property_total_id) = property_total_id else {
            return Ok(PaymentLinkage::None);
        };

        let year = year.ok_or_else(|| ValidationError::Required {
            field: "year".to_string(),
        })?;

        if is_annual {
            return Ok(PaymentLinkage::PropertyAnnual {
                property_total_id,
                year,
            });
        }

        let quarter = quarter.ok_or_else(|| ValidationError::Required {
            field: "quarter".to_string(),
        })?;

        Ok(PaymentLinkage::PropertyQuarter {
            property_total_id,
            quarter,
            year,
        })
    }

    /// Property total this payment touches, if any.
    pub fn property_total_id(&self) -> Option<&str> {
        match self {
            PaymentLinkage::PropertyQuarter {
                property_total_id, ..
            }
            | PaymentLinkage::PropertyAnnual {
                property_total_id, ..
            } => Some(property_total_id),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, PaymentLinkage::None)
    }
}

/// A payment attempt gated by an OTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentTransaction {
    pub payment_id: String,
    pub phone: String,
    pub payment_method: String,
    pub purpose: String,
    pub amount: Money,
    #[serde(skip_serializing)]
    #[ts(skip)]
    pub otp_code: String,
    #[ts(as = "String")]
    pub otp_expires_at: DateTime<Utc>,
    pub otp_attempts: u32,
    pub otp_locked: bool,
    pub payment_status: PaymentStatus,
    pub receipt_number: Option<String>,
    pub sync_status: SyncStatus,
    pub system_error: Option<String>,
    /// Failed ledger syncs so far.
    pub sync_attempts: u32,
    #[ts(as = "Option<String>")]
    pub last_sync_attempt_at: Option<DateTime<Utc>>,
    pub linkage: PaymentLinkage,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

// =============================================================================
// RPT Registration
// =============================================================================

/// Review workflow for a property registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    ForInspection,
    Assessed,
    NeedsCorrection,
    Approved,
    Rejected,
}

impl RegistrationStatus {
    pub const ALL: [RegistrationStatus; 6] = [
        RegistrationStatus::Pending,
        RegistrationStatus::ForInspection,
        RegistrationStatus::Assessed,
        RegistrationStatus::NeedsCorrection,
        RegistrationStatus::Approved,
        RegistrationStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::ForInspection => "for_inspection",
            RegistrationStatus::Assessed => "assessed",
            RegistrationStatus::NeedsCorrection => "needs_correction",
            RegistrationStatus::Approved => "approved",
            RegistrationStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for RegistrationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        RegistrationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: RegistrationStatus::ALL
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect(),
            })
    }
}

/// A citizen's property registration under review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RptRegistration {
    pub id: String,
    pub owner_name: String,
    pub property_address: String,
    pub tdn: Option<String>,
    pub status: RegistrationStatus,
    pub correction_notes: Option<String>,
    /// Set once the property has been assessed.
    pub annual_tax: Option<Money>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_percentage() {
        assert_eq!(TaxRate::from_percentage(2.0).bps(), 200);
        assert_eq!(TaxRate::from_percentage(0.75).bps(), 75);
        assert!((TaxRate::from_bps(825).percentage() - 8.25).abs() < 0.001);
    }

    #[test]
    fn test_quarter_of_date_and_due_dates() {
        let d = NaiveDate::from_ymd_opt(2026, 8, 14).unwrap();
        assert_eq!(Quarter::of(d), Quarter::Q3);
        assert_eq!(
            Quarter::Q1.due_date(2026),
            NaiveDate::from_ymd_opt(2026, 3, 31)
        );
        assert_eq!(
            Quarter::Q4.due_date(2026),
            NaiveDate::from_ymd_opt(2026, 12, 31)
        );
    }

    #[test]
    fn test_quarter_parsing() {
        assert_eq!("q2".parse::<Quarter>().unwrap(), Quarter::Q2);
        assert_eq!("4".parse::<Quarter>().unwrap(), Quarter::Q4);
        assert!("Q5".parse::<Quarter>().is_err());
    }

    #[test]
    fn test_registration_status_parsing() {
        assert_eq!(
            "For_Inspection".parse::<RegistrationStatus>().unwrap(),
            RegistrationStatus::ForInspection
        );
        assert!("archived".parse::<RegistrationStatus>().is_err());
    }

    #[test]
    fn test_linkage_prefers_tax_id() {
        let linkage = PaymentLinkage::from_parts(
            Some("q-1".into()),
            Some("prop-1".into()),
            Some(Quarter::Q1),
            Some(2026),
            true,
        )
        .unwrap();
        assert_eq!(
            linkage,
            PaymentLinkage::QuarterRow {
                tax_id: "q-1".into()
            }
        );
    }

    #[test]
    fn test_linkage_property_requires_year_and_quarter() {
        assert!(PaymentLinkage::from_parts(None, Some("p".into()), None, None, true).is_err());
        assert!(
            PaymentLinkage::from_parts(None, Some("p".into()), None, Some(2026), false).is_err()
        );

        let annual =
            PaymentLinkage::from_parts(None, Some("p".into()), None, Some(2026), true).unwrap();
        assert_eq!(annual.property_total_id(), Some("p"));
        assert!(matches!(annual, PaymentLinkage::PropertyAnnual { .. }));

        let none = PaymentLinkage::from_parts(Some("  ".into()), None, None, None, false).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_amount_due_is_zero_once_paid() {
        let mut row = QuarterlyTax {
            id: "q".into(),
            ledger: LedgerKind::Property,
            parent_total_id: "p".into(),
            quarter: Quarter::Q1,
            year: 2026,
            due_date: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            total_quarterly_tax: Money::from_cents(10_000),
            penalty_amount: Money::from_cents(200),
            discount_amount: Money::zero(),
            payment_status: QuarterStatus::Overdue,
            receipt_number: None,
            paid_at: None,
        };
        assert_eq!(row.amount_due().cents(), 10_200);

        row.payment_status = QuarterStatus::Paid;
        assert!(row.amount_due().is_zero());
    }

    #[test]
    fn test_status_ordering_is_forward() {
        assert!(TaxRecordStatus::Pending < TaxRecordStatus::Approved);
        assert!(TaxRecordStatus::Approved < TaxRecordStatus::Active);
        assert!(!TaxRecordStatus::Pending.is_frozen());
        assert!(TaxRecordStatus::Approved.is_frozen());
    }
}
