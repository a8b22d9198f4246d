//! RPT registration review.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use lgu_core::validation::validate_correction_notes;
use lgu_core::{RegistrationStatus, RptRegistration};

use crate::error::ApiResult;
use crate::routes::pesos;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/registration/update-status", post(update_status))
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct UpdateStatusBody {
    pub registration_id: String,
    pub status: String,
    #[serde(default)]
    pub correction_notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RegistrationView {
    pub id: String,
    pub owner_name: String,
    pub property_address: String,
    pub tdn: Option<String>,
    pub status: RegistrationStatus,
    pub correction_notes: Option<String>,
    pub annual_tax: Option<f64>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl From<RptRegistration> for RegistrationView {
    fn from(reg: RptRegistration) -> Self {
        RegistrationView {
            id: reg.id,
            owner_name: reg.owner_name,
            property_address: reg.property_address,
            tdn: reg.tdn,
            status: reg.status,
            correction_notes: reg.correction_notes,
            annual_tax: reg.annual_tax.map(pesos),
            updated_at: reg.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateStatusResponse {
    pub success: bool,
    pub updated: bool,
    pub registration: RegistrationView,
    /// Set once approval has produced a property total.
    pub property_total_id: Option<String>,
}

async fn update_status(
    State(state): State<AppState>,
    Json(body): Json<UpdateStatusBody>,
) -> ApiResult<Json<UpdateStatusResponse>> {
    let status: RegistrationStatus = body.status.trim().parse()?;
    let notes = validate_correction_notes(status, body.correction_notes.as_deref())?;

    let change = state
        .db
        .registrations()
        .update_status(body.registration_id.trim(), status, notes.as_deref(), state.now())
        .await?;

    if change.updated {
        info!(
            registration_id = %change.registration.id,
            status = status.as_str(),
            property_total = ?change.property_total.as_ref().map(|t| t.id.as_str()),
            "Registration status changed"
        );
    }

    Ok(Json(UpdateStatusResponse {
        success: true,
        updated: change.updated,
        property_total_id: change.property_total.map(|t| t.id),
        registration: change.registration.into(),
    }))
}
