//! Business tax computation: rate lookup, fee total, arithmetic, persistence.

use tracing::{info, warn};

use lgu_core::fees::aggregate_fees;
use lgu_core::rate::{resolve_rate, RateLookup, RateResolution, RateSource};
use lgu_core::tax::TaxComputation;
use lgu_core::validation::{validate_required_text, validate_taxable_amount};
use lgu_core::{CoreError, Money, TaxCalculationType};
use lgu_db::{BusinessTaxInput, SavedTaxRecord};

use crate::error::ApiResult;
use crate::state::AppState;

/// Result of a computation, with where its rate came from.
#[derive(Debug, Clone)]
pub struct CalculatedTax {
    pub saved: SavedTaxRecord,
    pub computation: TaxComputation,
    pub rate_source: RateSource,
}

/// Computes and stores the tax of one business permit.
///
/// Capital investment looks the rate up by amount bracket, gross sales by
/// business type. A missing rate becomes 0% unless the configuration
/// rejects it.
pub async fn calculate(
    state: &AppState,
    input: BusinessTaxInput,
    taxable_amount: Money,
) -> ApiResult<CalculatedTax> {
    let input = BusinessTaxInput {
        business_permit_id: validate_required_text("business_permit_id", &input.business_permit_id, 100)?,
        business_name: validate_required_text("business_name", &input.business_name, 200)?,
        full_name: validate_required_text("full_name", &input.full_name, 200)?,
        business_type: validate_required_text("business_type", &input.business_type, 100)?,
        calculation_type: input.calculation_type,
    };
    validate_taxable_amount(taxable_amount)?;

    let now = state.now();
    let today = now.date_naive();
    let tax_config = state.db.tax_config();

    let lookup = match input.calculation_type {
        TaxCalculationType::CapitalInvestment => RateLookup::CapitalInvestment(taxable_amount),
        TaxCalculationType::GrossSales => RateLookup::GrossSales(input.business_type.clone()),
    };
    let configurations = tax_config.list_configurations(input.calculation_type).await?;
    let resolution = resolve_rate(&configurations, &lookup, today);

    if let RateResolution::NoApplicableRate = resolution {
        if state.config.tax.reject_missing_rate {
            return Err(CoreError::NoApplicableRate {
                calculation_type: lookup.calculation_type().as_str().to_string(),
                key: lookup.key(),
            }
            .into());
        }
        warn!(
            permit = %input.business_permit_id,
            calculation_type = lookup.calculation_type().as_str(),
            key = %lookup.key(),
            "No applicable rate, using 0%"
        );
    }

    let fees = aggregate_fees(&tax_config.list_fees().await?, today);
    let computation = TaxComputation::compute(taxable_amount, resolution.rate_or_zero(), fees.amount);

    let saved = state
        .db
        .business_tax()
        .save_computation(&input, &computation, now)
        .await?;

    info!(
        permit = %saved.record.business_permit_id,
        rate_bps = computation.tax_rate.bps(),
        fee_count = fees.fee_count,
        total_tax = %computation.total_tax,
        "Business tax calculated"
    );

    Ok(CalculatedTax {
        saved,
        computation,
        rate_source: resolution.source(),
    })
}
