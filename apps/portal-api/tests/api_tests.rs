//! End-to-end tests against the router with an in-memory database and a
//! pinned clock.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use lgu_core::ledger::build_schedule;
use lgu_core::{LedgerKind, Money, QuarterStatus, RateScope, TaxRate};
use lgu_db::{Database, DbConfig, NewRegistration, NewRegulatoryFee, NewTaxConfiguration};
use lgu_portal_api::{app, reconcile, AppState, Clock, FixedClock, PortalConfig};

struct TestApp {
    router: Router,
    state: AppState,
    clock: Arc<FixedClock>,
}

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 10, 9, 0, 0).unwrap()
}

async fn setup_with(configure: impl FnOnce(&mut PortalConfig)) -> TestApp {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();

    let mut config = PortalConfig::default();
    config.environment.expose_test_otp = true;
    config.reconcile.enabled = false;
    configure(&mut config);

    let clock = Arc::new(FixedClock::new(start_time()));
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    let state = AppState::with_clock(db, config, dyn_clock);

    TestApp {
        router: app(state.clone()),
        state,
        clock,
    }
}

async fn setup() -> TestApp {
    setup_with(|_| {}).await
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}

async fn post(app: &TestApp, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: &TestApp, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

/// Requests an OTP and returns `(payment_id, code)`.
async fn request_payment(app: &TestApp, extra: Value) -> (String, String) {
    let mut body = json!({
        "phone": "0917 123 4567",
        "payment_method": "gcash",
        "amount": 500.0,
        "purpose": "Business permit",
    });
    if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        body.extend(extra.clone());
    }

    let (status, body) = post(app, "/otp/request", body).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    (
        body["payment_id"].as_str().unwrap().to_string(),
        body["test_otp"].as_str().unwrap().to_string(),
    )
}

fn wrong_code(actual: &str) -> &'static str {
    if actual == "000000" {
        "111111"
    } else {
        "000000"
    }
}

async fn seed_retail_rate_and_fees(app: &TestApp) {
    let tax_config = app.state.db.tax_config();
    tax_config
        .insert_configuration(&NewTaxConfiguration {
            scope: RateScope::GrossSales {
                business_type: "Retail".to_string(),
            },
            rate: TaxRate::from_bps(200),
            effective_date: chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            expiration_date: None,
        })
        .await
        .unwrap();

    for (name, cents) in [("Sanitary", 49_998), ("Mayor's permit", 50_000), ("Fire", 30_000)] {
        tax_config
            .insert_fee(&NewRegulatoryFee {
                name: name.to_string(),
                amount: Money::from_cents(cents),
                expiration_date: None,
            })
            .await
            .unwrap();
    }
}

fn calculate_body(permit: &str, business_type: &str, amount: f64) -> Value {
    json!({
        "business_permit_id": permit,
        "business_name": "Sari-Sari Store",
        "full_name": "Juan Dela Cruz",
        "business_type": business_type,
        "taxable_amount": amount,
        "tax_calculation_type": "gross_sales",
    })
}

// =============================================================================
// OTP gate
// =============================================================================

#[tokio::test]
async fn test_request_and_verify_marks_payment_paid() {
    let app = setup().await;
    let (payment_id, otp) = request_payment(&app, json!({})).await;

    let (status, body) = post(
        &app,
        "/otp/verify",
        json!({ "payment_id": payment_id, "otp_code": otp }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert!(body["receipt_number"]
        .as_str()
        .unwrap()
        .starts_with("OR-20260210-"));
    assert_eq!(body["sync_status"], "synced");

    let (status, body) = get(&app, &format!("/otp/status?payment_id={payment_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment_status"], "paid");
    assert!(body["rpt_status"].is_null());
}

#[tokio::test]
async fn test_wrong_codes_count_down_then_lock() {
    let app = setup().await;
    let (payment_id, otp) = request_payment(&app, json!({})).await;
    let wrong = wrong_code(&otp);

    let (status, body) = post(
        &app,
        "/otp/verify",
        json!({ "payment_id": payment_id, "otp_code": wrong }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "OTP_MISMATCH");
    assert_eq!(body["remaining_attempts"], 2);

    let (_, body) = post(
        &app,
        "/otp/verify",
        json!({ "payment_id": payment_id, "otp_code": wrong }),
    )
    .await;
    assert_eq!(body["remaining_attempts"], 1);

    let (status, body) = post(
        &app,
        "/otp/verify",
        json!({ "payment_id": payment_id, "otp_code": wrong }),
    )
    .await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(body["code"], "OTP_LOCKED");

    // Even the right code is refused now
    let (status, _) = post(
        &app,
        "/otp/verify",
        json!({ "payment_id": payment_id, "otp_code": otp }),
    )
    .await;
    assert_eq!(status, StatusCode::LOCKED);

    let (status, _) = post(&app, "/otp/resend", json!({ "payment_id": payment_id })).await;
    assert_eq!(status, StatusCode::LOCKED);
}

#[tokio::test]
async fn test_expired_code_rejected() {
    let app = setup().await;
    let (payment_id, otp) = request_payment(&app, json!({})).await;

    app.clock.advance(Duration::minutes(6));

    let (status, body) = post(
        &app,
        "/otp/verify",
        json!({ "payment_id": payment_id, "otp_code": otp }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "OTP_EXPIRED");
}

#[tokio::test]
async fn test_code_accepted_at_exact_expiry() {
    let app = setup().await;
    let (payment_id, otp) = request_payment(&app, json!({})).await;

    app.clock.advance(Duration::minutes(5));

    let (status, _) = post(
        &app,
        "/otp/verify",
        json!({ "payment_id": payment_id, "otp_code": otp }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_paid_payment_cannot_be_verified_again() {
    let app = setup().await;
    let (payment_id, otp) = request_payment(&app, json!({})).await;
    let verify = json!({ "payment_id": payment_id, "otp_code": otp });

    let (status, _) = post(&app, "/otp/verify", verify.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(&app, "/otp/verify", verify).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Payment not found or already processed");
}

#[tokio::test]
async fn test_unknown_payment_and_bad_input() {
    let app = setup().await;

    let (status, _) = post(
        &app,
        "/otp/verify",
        json!({ "payment_id": uuid::Uuid::new_v4().to_string(), "otp_code": "123456" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = post(
        &app,
        "/otp/verify",
        json!({ "payment_id": "not-a-uuid", "otp_code": "123456" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = post(
        &app,
        "/otp/request",
        json!({ "phone": "12345", "payment_method": "gcash", "amount": 10.0, "purpose": "x" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = post(
        &app,
        "/otp/request",
        json!({ "phone": "09171234567", "payment_method": "gcash", "amount": 0.0, "purpose": "x" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_resend_keeps_attempt_count() {
    let app = setup().await;
    let (payment_id, otp) = request_payment(&app, json!({})).await;

    let (_, body) = post(
        &app,
        "/otp/verify",
        json!({ "payment_id": payment_id, "otp_code": wrong_code(&otp) }),
    )
    .await;
    assert_eq!(body["remaining_attempts"], 2);

    app.clock.advance(Duration::minutes(10));
    let (status, body) = post(&app, "/otp/resend", json!({ "payment_id": payment_id })).await;
    assert_eq!(status, StatusCode::OK);
    let fresh = body["test_otp"].as_str().unwrap().to_string();

    let (_, body) = post(
        &app,
        "/otp/verify",
        json!({ "payment_id": payment_id, "otp_code": wrong_code(&fresh) }),
    )
    .await;
    assert_eq!(body["remaining_attempts"], 1);

    let (status, _) = post(
        &app,
        "/otp/verify",
        json!({ "payment_id": payment_id, "otp_code": fresh }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_test_otp_hidden_unless_enabled() {
    let app = setup_with(|config| config.environment.expose_test_otp = false).await;

    let (status, body) = post(
        &app,
        "/otp/request",
        json!({ "phone": "09171234567", "payment_method": "gcash", "amount": 10.0, "purpose": "x" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("test_otp").is_none());
}

// =============================================================================
// Business tax
// =============================================================================

#[tokio::test]
async fn test_business_tax_calculation_and_quarters() {
    let app = setup().await;
    seed_retail_rate_and_fees(&app).await;

    let (status, body) = post(
        &app,
        "/business-tax/calculate",
        calculate_body("BP-2026-0001", "Retail", 100_000.0),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let calc = &body["tax_calculation"];
    assert_eq!(calc["tax_rate"], 2.0);
    assert_eq!(calc["tax_amount"], 2000.0);
    assert_eq!(calc["regulatory_fees"], 1299.98);
    assert_eq!(calc["total_tax"], 3299.98);
    assert_eq!(calc["action"], "inserted");
    assert_eq!(calc["rate_source"], "configured");
    assert_eq!(calc["status"], "approved");
    assert_eq!(calc["quarters_created"], 4);

    let (status, body) = get(&app, "/business-tax/quarters?business_permit_id=BP-2026-0001").await;
    assert_eq!(status, StatusCode::OK);
    let amounts: Vec<f64> = body["quarters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["total_quarterly_tax"].as_f64().unwrap())
        .collect();
    assert_eq!(amounts, vec![825.0, 825.0, 824.99, 824.99]);
    assert_eq!(body["quarters"][0]["quarter"], "Q1");

    // Recompute updates in place and leaves the schedule alone
    let (_, body) = post(
        &app,
        "/business-tax/calculate",
        calculate_body("BP-2026-0001", "Retail", 200_000.0),
    )
    .await;
    assert_eq!(body["tax_calculation"]["action"], "updated");
    assert_eq!(body["tax_calculation"]["quarters_created"], 0);
}

#[tokio::test]
async fn test_missing_rate_defaults_to_zero() {
    let app = setup().await;
    seed_retail_rate_and_fees(&app).await;

    let (status, body) = post(
        &app,
        "/business-tax/calculate",
        calculate_body("BP-2026-0002", "Bakery", 50_000.0),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let calc = &body["tax_calculation"];
    assert_eq!(calc["rate_source"], "default_zero");
    assert_eq!(calc["tax_amount"], 0.0);
    assert_eq!(calc["total_tax"], 1299.98);
    assert_eq!(calc["status"], "pending");
}

#[tokio::test]
async fn test_missing_rate_rejected_when_configured() {
    let app = setup_with(|config| config.tax.reject_missing_rate = true).await;

    let (status, body) = post(
        &app,
        "/business-tax/calculate",
        calculate_body("BP-2026-0003", "Bakery", 50_000.0),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_quarters_for_unknown_permit() {
    let app = setup().await;
    let (status, _) = get(&app, "/business-tax/quarters?business_permit_id=BP-NOPE").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_quarter_payment_settles_business_row() {
    let app = setup().await;
    seed_retail_rate_and_fees(&app).await;
    post(
        &app,
        "/business-tax/calculate",
        calculate_body("BP-2026-0004", "Retail", 100_000.0),
    )
    .await;

    let (_, body) = get(&app, "/business-tax/quarters?business_permit_id=BP-2026-0004").await;
    let q1_id = body["quarters"][0]["id"].as_str().unwrap().to_string();

    let (payment_id, otp) = request_payment(&app, json!({ "tax_id": q1_id, "amount": 825.0 })).await;
    let (status, body) = post(
        &app,
        "/otp/verify",
        json!({ "payment_id": payment_id, "otp_code": otp }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sync_status"], "synced");
    let receipt = body["receipt_number"].clone();

    let (_, body) = get(&app, "/business-tax/quarters?business_permit_id=BP-2026-0004").await;
    assert_eq!(body["quarters"][0]["payment_status"], "paid");
    assert_eq!(body["quarters"][0]["receipt_number"], receipt);
    assert_eq!(body["quarters"][0]["amount_due"], 0.0);
    assert_eq!(body["quarters"][1]["payment_status"], "pending");
}

// =============================================================================
// Registration and RPT
// =============================================================================

async fn new_registration(app: &TestApp) -> String {
    app.state
        .db
        .registrations()
        .insert(
            &NewRegistration {
                owner_name: "Maria Santos".to_string(),
                property_address: "12 Rizal St".to_string(),
                tdn: Some("TD-2026-001".to_string()),
                annual_tax: Some(Money::from_cents(400_000)),
            },
            start_time(),
        )
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_needs_correction_requires_notes() {
    let app = setup().await;
    let id = new_registration(&app).await;

    let (status, _) = post(
        &app,
        "/registration/update-status",
        json!({ "registration_id": id, "status": "needs_correction" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = post(
        &app,
        "/registration/update-status",
        json!({ "registration_id": id, "status": "needs_correction", "correction_notes": "Missing deed" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], true);
    assert_eq!(body["registration"]["correction_notes"], "Missing deed");
    assert!(body["property_total_id"].is_null());
}

#[tokio::test]
async fn test_unknown_registration() {
    let app = setup().await;
    let (status, _) = post(
        &app,
        "/registration/update-status",
        json!({ "registration_id": "missing", "status": "approved" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_approval_statement_and_annual_payment() {
    let app = setup().await;
    let id = new_registration(&app).await;

    let (status, body) = post(
        &app,
        "/registration/update-status",
        json!({ "registration_id": id, "status": "approved" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["updated"], true);
    let total_id = body["property_total_id"].as_str().unwrap().to_string();

    // Approving again is a no-op
    let (_, body) = post(
        &app,
        "/registration/update-status",
        json!({ "registration_id": id, "status": "approved" }),
    )
    .await;
    assert_eq!(body["updated"], false);

    let statement_uri = format!("/rpt/statement?property_total_id={total_id}&year=2026");
    let (status, body) = get(&app, &statement_uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lines"].as_array().unwrap().len(), 4);
    assert_eq!(body["total_annual_tax"], 4000.0);
    assert_eq!(body["total_due"], 4000.0);
    assert_eq!(body["fully_paid"], false);

    // Paid in February: every quarter is early and gets the 10% discount
    let (payment_id, otp) = request_payment(
        &app,
        json!({
            "amount": 3600.0,
            "property_total_id": total_id,
            "year": 2026,
            "is_annual": true,
        }),
    )
    .await;
    let (status, body) = post(
        &app,
        "/otp/verify",
        json!({ "payment_id": payment_id, "otp_code": otp }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sync_status"], "synced");

    let (_, body) = get(&app, &statement_uri).await;
    assert_eq!(body["fully_paid"], true);
    assert_eq!(body["total_due"], 0.0);
    assert_eq!(body["lines"][0]["discount_amount"], 100.0);

    let (_, body) = get(&app, &format!("/otp/status?payment_id={payment_id}")).await;
    assert_eq!(body["rpt_status"]["paid_quarters"], 4);
    assert_eq!(body["rpt_status"]["fully_paid"], true);
}

#[tokio::test]
async fn test_statement_for_unknown_property() {
    let app = setup().await;
    let (status, _) = get(&app, "/rpt/statement?property_total_id=missing&year=2026").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Ledger sync and reconciliation
// =============================================================================

#[tokio::test]
async fn test_failed_ledger_sync_keeps_payment_paid() {
    let app = setup().await;
    let missing_row = uuid::Uuid::new_v4().to_string();
    let (payment_id, otp) = request_payment(&app, json!({ "tax_id": missing_row })).await;

    let (status, body) = post(
        &app,
        "/otp/verify",
        json!({ "payment_id": payment_id, "otp_code": otp }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sync_status"], "failed");

    let (_, body) = get(&app, &format!("/otp/status?payment_id={payment_id}")).await;
    assert_eq!(body["payment_status"], "paid");
    assert_eq!(body["sync_status"], "failed");

    let report = reconcile::run_once(&app.state).await;
    assert_eq!(report.retried, 1);
    assert_eq!(report.synced, 0);
    assert_eq!(report.still_failed, 1);
    assert_eq!(app.state.db.payments().count_sync_failed().await.unwrap(), 1);
}

/// Inserts a single business quarter row under a chosen id.
async fn create_quarter_row(app: &TestApp, id: &str) {
    let mut row = build_schedule(LedgerKind::Business, id, Money::from_cents(200_000), 2026)
        .unwrap()
        .remove(0);
    row.id = id.to_string();
    app.state.db.ledger().create_schedule(&[row]).await.unwrap();
}

/// Verifies a payment whose ledger row does not exist yet.
async fn pay_against_missing_row(app: &TestApp, tax_id: &str) -> String {
    let (payment_id, otp) = request_payment(app, json!({ "tax_id": tax_id })).await;
    let (status, body) = post(
        app,
        "/otp/verify",
        json!({ "payment_id": payment_id, "otp_code": otp }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sync_status"], "failed");
    payment_id
}

#[tokio::test]
async fn test_reconcile_syncs_once_ledger_row_exists() {
    let app = setup().await;
    let tax_id = uuid::Uuid::new_v4().to_string();
    let payment_id = pay_against_missing_row(&app, &tax_id).await;

    create_quarter_row(&app, &tax_id).await;
    app.clock.advance(Duration::minutes(1));

    let report = reconcile::run_once(&app.state).await;
    assert_eq!(report.retried, 1);
    assert_eq!(report.synced, 1);
    assert_eq!(report.still_failed, 0);

    let (_, body) = get(&app, &format!("/otp/status?payment_id={payment_id}")).await;
    assert_eq!(body["payment_status"], "paid");
    assert_eq!(body["sync_status"], "synced");
    assert_eq!(body["sync_attempts"], 1);

    let row = app.state.db.ledger().get(&tax_id).await.unwrap().unwrap();
    assert_eq!(row.payment_status, QuarterStatus::Paid);
    assert_eq!(row.receipt_number, body["receipt_number"].as_str().map(String::from));

    // Drained: the next tick has nothing to retry
    let report = reconcile::run_once(&app.state).await;
    assert_eq!(report.retried, 0);
    assert_eq!(app.state.db.payments().count_sync_failed().await.unwrap(), 0);
}

#[tokio::test]
async fn test_permanent_sync_failure_does_not_starve_queue() {
    let app = setup_with(|config| {
        config.reconcile.batch_size = 1;
        config.reconcile.max_sync_attempts = 3;
    })
    .await;

    // Older payment points at a row that never appears
    let stuck = pay_against_missing_row(&app, &uuid::Uuid::new_v4().to_string()).await;
    app.clock.advance(Duration::minutes(1));

    let late_row = uuid::Uuid::new_v4().to_string();
    let recoverable = pay_against_missing_row(&app, &late_row).await;
    create_quarter_row(&app, &late_row).await;

    // Both at one attempt: the older one goes first
    let report = reconcile::run_once(&app.state).await;
    assert_eq!((report.retried, report.still_failed), (1, 1));

    // Now the recoverable one has fewer attempts
    let report = reconcile::run_once(&app.state).await;
    assert_eq!((report.retried, report.synced), (1, 1));

    let (_, body) = get(&app, &format!("/otp/status?payment_id={recoverable}")).await;
    assert_eq!(body["sync_status"], "synced");

    // Third failure puts the stuck payment at the cap
    let report = reconcile::run_once(&app.state).await;
    assert_eq!((report.retried, report.still_failed), (1, 1));
    assert_eq!(report.exhausted, 1);

    let report = reconcile::run_once(&app.state).await;
    assert_eq!(report.retried, 0);
    assert_eq!(report.exhausted, 1);

    let (_, body) = get(&app, &format!("/otp/status?payment_id={stuck}")).await;
    assert_eq!(body["payment_status"], "paid");
    assert_eq!(body["sync_status"], "failed");
    assert_eq!(body["sync_attempts"], 3);
    assert_eq!(app.state.db.payments().count_sync_failed().await.unwrap(), 1);
}

#[tokio::test]
async fn test_reconcile_marks_overdue_quarters() {
    let app = setup().await;
    seed_retail_rate_and_fees(&app).await;
    post(
        &app,
        "/business-tax/calculate",
        calculate_body("BP-2026-0005", "Retail", 100_000.0),
    )
    .await;

    let report = reconcile::run_once(&app.state).await;
    assert_eq!(report.marked_overdue, 0);

    // Q1 ends March 31
    app.clock
        .set(Utc.with_ymd_and_hms(2026, 4, 15, 9, 0, 0).unwrap());
    let report = reconcile::run_once(&app.state).await;
    assert_eq!(report.marked_overdue, 1);

    let (_, body) = get(&app, "/business-tax/quarters?business_permit_id=BP-2026-0005").await;
    assert_eq!(body["quarters"][0]["payment_status"], "overdue");
    assert!(body["quarters"][0]["penalty_amount"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_health() {
    let app = setup().await;
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}
