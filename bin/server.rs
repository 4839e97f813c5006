// Address History Service - Web Server
// REST API with Axum: read current address, submit new address

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

use address_history::{
    append_segment, get_current, setup_database, AddressPayload, AddressSegment, FieldError,
    HistoryError,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
}

/// Query arguments for the read operation. The date defaults to today,
/// computed per request, and is currently a passthrough (reads always return
/// the latest segment).
#[derive(Deserialize)]
struct GetAddressQuery {
    date: Option<NaiveDate>,
}

/// Wire representation of an address segment. Field order is part of the
/// contract; `street_two` and `end_date` are omitted when absent.
#[derive(Serialize)]
struct AddressRecord {
    street_one: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    street_two: Option<String>,
    city: String,
    state: String,
    zip_code: String,
    start_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_date: Option<NaiveDate>,
}

impl From<&AddressSegment> for AddressRecord {
    fn from(segment: &AddressSegment) -> Self {
        Self {
            street_one: segment.street_one.clone(),
            street_two: segment.street_two.clone(),
            city: segment.city.clone(),
            state: segment.state.clone(),
            zip_code: segment.zip_code.clone(),
            start_date: segment.start_date,
            end_date: segment.end_date,
        }
    }
}

/// Error body for every non-200 response
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FieldError>>,
}

fn error_response(err: HistoryError) -> Response {
    let status = match &err {
        HistoryError::PersonNotFound | HistoryError::NoAddressOnFile => StatusCode::NOT_FOUND,
        HistoryError::InvalidTransition { .. } => StatusCode::CONFLICT,
        HistoryError::Validation(_) => StatusCode::BAD_REQUEST,
        HistoryError::Db(e) => {
            error!("database error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let err_string = err.to_string();
    let details = match err {
        HistoryError::Validation(errors) => Some(errors),
        _ => None,
    };

    let body = ErrorBody {
        error: match &details {
            Some(_) => "address payload failed validation".to_string(),
            None => err_string,
        },
        details,
    };

    (status, Json(body)).into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/persons/:person_id/address - Read the current address
async fn get_address(
    State(state): State<AppState>,
    Path(person_id): Path<Uuid>,
    Query(query): Query<GetAddressQuery>,
) -> Response {
    let as_of = query.date.unwrap_or_else(|| Utc::now().date_naive());

    let conn = state.db.lock().unwrap();
    match get_current(&conn, person_id, as_of) {
        Ok(segment) => Json(AddressRecord::from(&segment)).into_response(),
        Err(err) => error_response(err),
    }
}

/// PUT /api/persons/:person_id/address - Submit a new address
///
/// On supersession the response body is the now-closed previous segment;
/// otherwise it is the newly created one (see DESIGN.md).
async fn put_address(
    State(state): State<AppState>,
    Path(person_id): Path<Uuid>,
    Json(payload): Json<AddressPayload>,
) -> Response {
    if let Err(errors) = payload.validate() {
        return error_response(HistoryError::Validation(errors));
    }

    let written_on = Utc::now().date_naive();

    let mut conn = state.db.lock().unwrap();
    match append_segment(&mut conn, person_id, &payload, written_on) {
        Ok(outcome) => Json(AddressRecord::from(outcome.response_segment())).into_response(),
        Err(err) => error_response(err),
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "address_history=debug,tower_http=info".into()),
        )
        .init();

    let db_path = std::env::var("ADDRESS_DB").unwrap_or_else(|_| "addresses.db".to_string());
    let conn = Connection::open(&db_path).expect("Failed to open database");
    setup_database(&conn).expect("Failed to set up database schema");
    tracing::info!("database opened: {}", db_path);

    // Create shared state
    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route(
            "/persons/:person_id/address",
            get(get_address).put(put_address),
        )
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("server running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
