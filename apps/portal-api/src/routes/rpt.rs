//! Real property tax statement.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use lgu_core::ledger::StatementLine;
use lgu_core::validation::validate_year;
use lgu_core::{LedgerKind, Quarter, QuarterStatus};

use crate::error::{ApiError, ApiResult};
use crate::routes::pesos;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/rpt/statement", get(statement))
}

#[derive(Debug, Deserialize)]
pub struct StatementQuery {
    pub property_total_id: String,
    pub year: i32,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StatementLineView {
    pub id: String,
    pub quarter: Quarter,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub total_quarterly_tax: f64,
    pub penalty_amount: f64,
    pub discount_amount: f64,
    pub amount_due: f64,
    pub payment_status: QuarterStatus,
    pub receipt_number: Option<String>,
}

impl From<StatementLine> for StatementLineView {
    fn from(line: StatementLine) -> Self {
        StatementLineView {
            id: line.id,
            quarter: line.quarter,
            due_date: line.due_date,
            total_quarterly_tax: pesos(line.total_quarterly_tax),
            penalty_amount: pesos(line.penalty_amount),
            discount_amount: pesos(line.discount_amount),
            amount_due: pesos(line.amount_due),
            payment_status: line.payment_status,
            receipt_number: line.receipt_number,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StatementResponse {
    pub success: bool,
    pub property_total_id: String,
    pub year: i32,
    pub total_annual_tax: f64,
    pub lines: Vec<StatementLineView>,
    pub total_due: f64,
    pub fully_paid: bool,
}

async fn statement(
    State(state): State<AppState>,
    Query(query): Query<StatementQuery>,
) -> ApiResult<Json<StatementResponse>> {
    validate_year(query.year)?;
    let id = query.property_total_id.trim();

    let total = state
        .db
        .registrations()
        .get_property_total(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Property total", id))?;

    let statement = state
        .db
        .ledger()
        .statement(LedgerKind::Property, &total.id, query.year)
        .await?;

    Ok(Json(StatementResponse {
        success: true,
        property_total_id: total.id,
        year: statement.year,
        total_annual_tax: pesos(total.total_annual_tax),
        total_due: pesos(statement.total_due),
        fully_paid: statement.fully_paid,
        lines: statement.lines.into_iter().map(StatementLineView::from).collect(),
    }))
}
