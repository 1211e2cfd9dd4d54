// Power Play - Web Server
// REST API over the scan pipeline, dispute letters, ledger and entitlement

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use power_play::reference::{ChexDisputeType, ConsumerLaw, LibraryItem};
use power_play::reference::{CHEX_DISPUTE_TYPES, CONSUMER_LAWS, DISPUTE_LIBRARY};
use power_play::{
    scanner_from_config, Aggregates, AppConfig, AppState, ChartSlice, CheckoutError, EntryKind,
    Finding, LedgerEntry, LetterOutcome, Plan, ScanError, Scanner, SqliteStore, StubCheckout,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
struct ServerState {
    app: Arc<Mutex<AppState>>,
    scanner: Arc<Scanner>,
    checkout: Arc<StubCheckout>,
}

impl ServerState {
    fn lock(&self) -> Result<MutexGuard<'_, AppState>, Response> {
        self.app.lock().map_err(|_| {
            tracing::error!("app state lock poisoned");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "state unavailable")
        })
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let body = ApiResponse {
        success: false,
        data: (),
        error: Some(message.to_string()),
    };
    (status, Json(body)).into_response()
}

#[derive(Serialize)]
struct LedgerResponse<'a> {
    entries: &'a [LedgerEntry],
    aggregates: Aggregates,
    #[serde(skip_serializing_if = "Option::is_none")]
    persist_error: Option<&'a str>,
}

fn ledger_response(app: &AppState) -> Response {
    let body = LedgerResponse {
        entries: app.ledger().entries(),
        aggregates: app.aggregates(),
        persist_error: app.last_persist_error(),
    };
    (StatusCode::OK, Json(ApiResponse::ok(body))).into_response()
}

/// Amount arrives as the raw form value
#[derive(Deserialize)]
struct NewEntryRequest {
    amount: serde_json::Value,
    #[serde(rename = "type")]
    kind: EntryKind,
}

#[derive(Serialize)]
struct EntitlementResponse {
    premium: bool,
}

#[derive(Serialize)]
struct ReferenceResponse {
    laws: &'static [ConsumerLaw],
    chexsystems: &'static [ChexDisputeType],
    library: &'static [LibraryItem],
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/scan - Body is the raw image
async fn scan(State(state): State<ServerState>, body: Bytes) -> Response {
    match state.scanner.scan(&body).await {
        Ok(findings) => (StatusCode::OK, Json(ApiResponse::ok(findings))).into_response(),
        Err(e @ ScanError::Busy) => error_response(StatusCode::CONFLICT, e.user_notice()),
        Err(e) => error_response(StatusCode::UNPROCESSABLE_ENTITY, e.user_notice()),
    }
}

/// GET /api/scan/status - Progress indicator
async fn scan_status(State(state): State<ServerState>) -> impl IntoResponse {
    let stage = state.scanner.stage();
    Json(ApiResponse::ok(serde_json::json!({
        "scanning": state.scanner.is_scanning(),
        "message": stage.status_message(),
    })))
}

/// POST /api/letters - Render a dispute PDF for one finding
async fn create_letter(State(state): State<ServerState>, Json(finding): Json<Finding>) -> Response {
    let outcome = match state.lock() {
        Ok(app) => app.draft_letter_today(&finding),
        Err(resp) => return resp,
    };

    let letter = match outcome {
        LetterOutcome::Ready(letter) => letter,
        LetterOutcome::UpgradeRequired => {
            return error_response(StatusCode::PAYMENT_REQUIRED, "Upgrade to PRO to unlock PDF drafting")
        }
    };

    match letter.to_pdf() {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", letter.file_name),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "letter rendering failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "letter rendering failed")
        }
    }
}

/// GET /api/ledger - Entries + totals
async fn get_ledger(State(state): State<ServerState>) -> Response {
    match state.lock() {
        Ok(app) => ledger_response(&app),
        Err(resp) => resp,
    }
}

/// POST /api/ledger - Add an entry; invalid amounts are ignored
async fn add_entry(State(state): State<ServerState>, Json(req): Json<NewEntryRequest>) -> Response {
    let mut app = match state.lock() {
        Ok(app) => app,
        Err(resp) => return resp,
    };

    match &req.amount {
        serde_json::Value::Number(n) => {
            if let Some(amount) = n.as_f64() {
                app.add_entry(amount, req.kind);
            }
        }
        serde_json::Value::String(s) => {
            app.add_entry_str(s, req.kind);
        }
        _ => {}
    }

    ledger_response(&app)
}

/// DELETE /api/ledger/:id - Idempotent
async fn remove_entry(State(state): State<ServerState>, Path(id): Path<i64>) -> Response {
    let mut app = match state.lock() {
        Ok(app) => app,
        Err(resp) => return resp,
    };
    app.remove_entry(id);
    ledger_response(&app)
}

/// GET /api/ledger/chart - {label, value} pairs
async fn ledger_chart(State(state): State<ServerState>) -> Response {
    match state.lock() {
        Ok(app) => {
            let slices: Vec<ChartSlice> = app.ledger().chart_slices();
            (StatusCode::OK, Json(ApiResponse::ok(slices))).into_response()
        }
        Err(resp) => resp,
    }
}

/// GET /api/entitlement
async fn get_entitlement(State(state): State<ServerState>) -> Response {
    match state.lock() {
        Ok(app) => Json(ApiResponse::ok(EntitlementResponse { premium: app.is_premium() })).into_response(),
        Err(resp) => resp,
    }
}

/// POST /api/entitlement/toggle - Profile toggle
async fn toggle_entitlement(State(state): State<ServerState>) -> Response {
    match state.lock() {
        Ok(mut app) => {
            let premium = app.toggle_premium();
            Json(ApiResponse::ok(EntitlementResponse { premium })).into_response()
        }
        Err(resp) => resp,
    }
}

/// POST /api/checkout/:plan - monthly | one-time
async fn checkout(State(state): State<ServerState>, Path(plan): Path<String>) -> Response {
    let plan = match Plan::parse(&plan) {
        Some(plan) => plan,
        None => return error_response(StatusCode::NOT_FOUND, "unknown plan"),
    };

    match state.checkout.checkout(plan) {
        Ok(purchase) => {
            if let Ok(mut app) = state.lock() {
                app.set_premium(true);
            }
            (StatusCode::OK, Json(ApiResponse::ok(purchase))).into_response()
        }
        Err(e @ CheckoutError::NotConnected { .. }) => {
            error_response(StatusCode::NOT_IMPLEMENTED, &e.to_string())
        }
    }
}

/// GET /api/reference - Laws, ChexSystems dispute types, dispute library
async fn reference() -> impl IntoResponse {
    Json(ApiResponse::ok(ReferenceResponse {
        laws: CONSUMER_LAWS,
        chexsystems: CHEX_DISPUTE_TYPES,
        library: DISPUTE_LIBRARY,
    }))
}

fn router(state: ServerState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/scan", post(scan))
        .route("/scan/status", get(scan_status))
        .route("/letters", post(create_letter))
        .route("/ledger", get(get_ledger).post(add_entry))
        .route("/ledger/chart", get(ledger_chart))
        .route("/ledger/:id", delete(remove_entry))
        .route("/entitlement", get(get_entitlement))
        .route("/entitlement/toggle", post(toggle_entitlement))
        .route("/checkout/:plan", post(checkout))
        .route("/reference", get(reference))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    power_play::init_tracing("power_play=info,tower_http=info");

    println!("🌐 Power Play - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = AppConfig::from_env();

    let store = SqliteStore::open(&config.db_path)?;
    let app = AppState::load(Box::new(store))?;
    println!("✓ Database opened: {:?}", config.db_path);

    let state = ServerState {
        app: Arc::new(Mutex::new(app)),
        scanner: Arc::new(scanner_from_config(&config)),
        checkout: Arc::new(StubCheckout::new(
            &config.checkout.monthly_price_id,
            &config.checkout.one_time_price_id,
        )),
    };

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/ledger", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
