//! Business tax endpoints.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use lgu_core::rate::RateSource;
use lgu_core::tax::RecordAction;
use lgu_core::{
    LedgerKind, Quarter, QuarterStatus, QuarterlyTax, TaxCalculationType, TaxRecordStatus,
};
use lgu_db::BusinessTaxInput;

use crate::error::{ApiError, ApiResult};
use crate::routes::{money_from_pesos, pesos};
use crate::services::business_tax;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/business-tax/calculate", post(calculate))
        .route("/business-tax/quarters", get(quarters))
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct CalculateBody {
    pub business_permit_id: String,
    pub business_name: String,
    pub full_name: String,
    pub business_type: String,
    /// Pesos.
    pub taxable_amount: f64,
    /// `capital_investment` or `gross_sales`.
    pub tax_calculation_type: String,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxCalculationView {
    pub record_id: String,
    /// Percent, e.g. `2.0` for 2%.
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub regulatory_fees: f64,
    pub total_tax: f64,
    pub action: RecordAction,
    pub rate_source: RateSource,
    pub status: TaxRecordStatus,
    pub quarters_created: u64,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CalculateResponse {
    pub success: bool,
    pub tax_calculation: TaxCalculationView,
}

#[derive(Debug, Deserialize)]
pub struct QuartersQuery {
    pub business_permit_id: String,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuarterView {
    pub id: String,
    pub quarter: Quarter,
    pub year: i32,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub total_quarterly_tax: f64,
    pub penalty_amount: f64,
    pub discount_amount: f64,
    pub amount_due: f64,
    pub payment_status: QuarterStatus,
    pub receipt_number: Option<String>,
}

impl From<&QuarterlyTax> for QuarterView {
    fn from(row: &QuarterlyTax) -> Self {
        QuarterView {
            id: row.id.clone(),
            quarter: row.quarter,
            year: row.year,
            due_date: row.due_date,
            total_quarterly_tax: pesos(row.total_quarterly_tax),
            penalty_amount: pesos(row.penalty_amount),
            discount_amount: pesos(row.discount_amount),
            amount_due: pesos(row.amount_due()),
            payment_status: row.payment_status,
            receipt_number: row.receipt_number.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuartersResponse {
    pub success: bool,
    pub business_permit_id: String,
    pub quarters: Vec<QuarterView>,
}

async fn calculate(
    State(state): State<AppState>,
    Json(body): Json<CalculateBody>,
) -> ApiResult<Json<CalculateResponse>> {
    let calculation_type: TaxCalculationType = body.tax_calculation_type.trim().parse()?;
    let taxable_amount = money_from_pesos("taxable_amount", body.taxable_amount)?;

    let input = BusinessTaxInput {
        business_permit_id: body.business_permit_id,
        business_name: body.business_name,
        full_name: body.full_name,
        business_type: body.business_type,
        calculation_type,
    };

    let calculated = business_tax::calculate(&state, input, taxable_amount).await?;
    let computation = calculated.computation;

    Ok(Json(CalculateResponse {
        success: true,
        tax_calculation: TaxCalculationView {
            record_id: calculated.saved.record.id,
            tax_rate: computation.tax_rate.percentage(),
            tax_amount: pesos(computation.tax_amount),
            regulatory_fees: pesos(computation.regulatory_fees),
            total_tax: pesos(computation.total_tax),
            action: calculated.saved.action,
            rate_source: calculated.rate_source,
            status: calculated.saved.record.status,
            quarters_created: calculated.saved.quarters_created,
        },
    }))
}

async fn quarters(
    State(state): State<AppState>,
    Query(query): Query<QuartersQuery>,
) -> ApiResult<Json<QuartersResponse>> {
    let permit = query.business_permit_id.trim();
    let record = state
        .db
        .business_tax()
        .get_by_permit(permit)
        .await?
        .ok_or_else(|| ApiError::not_found("Tax record for permit", permit))?;

    let rows = state
        .db
        .ledger()
        .list_for_parent(LedgerKind::Business, &record.id, None)
        .await?;

    Ok(Json(QuartersResponse {
        success: true,
        business_permit_id: record.business_permit_id,
        quarters: rows.iter().map(QuarterView::from).collect(),
    }))
}
