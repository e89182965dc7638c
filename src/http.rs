use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Request, State};
use axum::http::{Method, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use ulid::Ulid;

use crate::engine::{Engine, EngineError, ErrorClass};
use crate::limits::{MAX_TITLE_LEN, MIN_TITLE_LEN};
use crate::model::*;
use crate::observability;

pub type AppState = Arc<Engine>;

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/reservations", post(create_reservation))
        .route("/reservations/:id", delete(cancel_reservation))
        .route("/rooms/:room_id/reservations", get(list_room_reservations))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(middleware::from_fn(track_metrics))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(engine)
}

// ── Wire types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationView {
    pub id: Ulid,
    pub room_id: RoomId,
    pub title: String,
    pub start_time: String,
    pub end_time: String,
    pub created_at: String,
}

impl From<&Reservation> for ReservationView {
    fn from(r: &Reservation) -> Self {
        Self {
            id: r.id,
            room_id: r.room_id,
            title: r.title.clone(),
            start_time: format_timestamp(r.start),
            end_time: format_timestamp(r.end),
            created_at: format_timestamp(r.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status_code: u16,
    error: &'static str,
    message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        // Conflicts stay 400 for compatibility with existing clients.
        let status = match e.class() {
            ErrorClass::InvalidInput | ErrorClass::Conflict => StatusCode::BAD_REQUEST,
            ErrorClass::NotFound => StatusCode::NOT_FOUND,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status_code: self.status.as_u16(),
            error: self.status.canonical_reason().unwrap_or("Error"),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

// ── Request shape ────────────────────────────────────────────────

/// Structural checks on the create body: required string fields and title
/// length. Business rules (dates, room, timing) are left to admission.
pub fn candidate_from_body(body: &Value) -> Result<Candidate, String> {
    let Some(obj) = body.as_object() else {
        return Err("body must be object".into());
    };

    const REQUIRED: [&str; 4] = ["roomId", "title", "startTime", "endTime"];
    if let Some(missing) = REQUIRED.into_iter().find(|key| !obj.contains_key(*key)) {
        return Err(format!("body must have required property '{missing}'"));
    }
    let room_id = string_field(obj, "roomId")?;
    let title = string_field(obj, "title")?;
    let start_time = string_field(obj, "startTime")?;
    let end_time = string_field(obj, "endTime")?;

    if room_id.is_empty() {
        return Err("body/roomId must NOT have fewer than 1 characters".into());
    }
    let title_len = title.chars().count();
    if title_len < MIN_TITLE_LEN {
        return Err(format!(
            "body/title must NOT have fewer than {MIN_TITLE_LEN} characters"
        ));
    }
    if title_len > MAX_TITLE_LEN {
        return Err(format!(
            "body/title must NOT have more than {MAX_TITLE_LEN} characters"
        ));
    }

    Ok(Candidate::new(room_id, title, start_time, end_time))
}

fn string_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a str, String> {
    obj.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("body/{key} must be string"))
}

// ── Handlers ─────────────────────────────────────────────────────

async fn create_reservation(
    State(engine): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ReservationView>), ApiError> {
    let Json(body) = body?;
    let candidate = candidate_from_body(&body).map_err(ApiError::bad_request)?;
    let reservation = engine.create_reservation(&candidate).await?;
    Ok((StatusCode::CREATED, Json(ReservationView::from(&reservation))))
}

async fn cancel_reservation(
    State(engine): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    engine.cancel_reservation(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_room_reservations(
    State(engine): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<ReservationView>>, ApiError> {
    let reservations = engine.list_room(&room_id).await?;
    Ok(Json(reservations.iter().map(ReservationView::from).collect()))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        message: format!("Route {method}:{} not found", uri.path()),
    }
}

async fn track_metrics(req: Request, next: Next) -> Response {
    let route = observability::route_label(req.method().as_str(), req.uri().path());
    let start = Instant::now();
    let response = next.run(req).await;
    let status = response.status().as_u16().to_string();
    metrics::counter!(observability::REQUESTS_TOTAL, "route" => route, "status" => status)
        .increment(1);
    metrics::histogram!(observability::REQUEST_DURATION_SECONDS, "route" => route)
        .record(start.elapsed().as_secs_f64());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(value: Value) -> Result<Candidate, String> {
        candidate_from_body(&value)
    }

    #[test]
    fn accepts_complete_body() {
        let c = body(json!({
            "roomId": "4",
            "title": "Standup",
            "startTime": "2030-01-01T09:00:00Z",
            "endTime": "2030-01-01T09:15:00Z",
        }))
        .unwrap();
        assert_eq!(
            c,
            Candidate::new("4", "Standup", "2030-01-01T09:00:00Z", "2030-01-01T09:15:00Z")
        );
    }

    #[test]
    fn reports_first_missing_field() {
        let err = body(json!({ "roomId": "4", "startTime": "x" })).unwrap_err();
        assert_eq!(err, "body must have required property 'title'");
        assert_eq!(body(json!([])).unwrap_err(), "body must be object");
    }

    #[test]
    fn rejects_non_string_fields() {
        let err = body(json!({
            "roomId": 4,
            "title": "t",
            "startTime": "a",
            "endTime": "b",
        }))
        .unwrap_err();
        assert_eq!(err, "body/roomId must be string");
    }

    #[test]
    fn title_length_bounds() {
        let make = |title: String| {
            body(json!({
                "roomId": "1",
                "title": title,
                "startTime": "a",
                "endTime": "b",
            }))
        };
        assert!(make("x".repeat(MAX_TITLE_LEN)).is_ok());
        assert!(make("é".repeat(MAX_TITLE_LEN)).is_ok());
        assert_eq!(
            make("x".repeat(MAX_TITLE_LEN + 1)).unwrap_err(),
            "body/title must NOT have more than 150 characters"
        );
        assert_eq!(
            make(String::new()).unwrap_err(),
            "body/title must NOT have fewer than 1 characters"
        );
    }

    #[test]
    fn empty_room_id_is_a_shape_error() {
        let err = body(json!({
            "roomId": "",
            "title": "t",
            "startTime": "a",
            "endTime": "b",
        }))
        .unwrap_err();
        assert_eq!(err, "body/roomId must NOT have fewer than 1 characters");
    }

    #[test]
    fn view_renders_iso_timestamps() {
        let r = Reservation {
            id: Ulid::new(),
            room_id: RoomId::parse("2").unwrap(),
            title: "Review".into(),
            start: parse_timestamp("2030-05-01T10:00:00Z").unwrap(),
            end: parse_timestamp("2030-05-01T11:00:00Z").unwrap(),
            created_at: parse_timestamp("2030-04-01T08:30:00.250Z").unwrap(),
        };
        let v = serde_json::to_value(ReservationView::from(&r)).unwrap();
        assert_eq!(v["id"], r.id.to_string());
        assert_eq!(v["roomId"], "2");
        assert_eq!(v["startTime"], "2030-05-01T10:00:00.000Z");
        assert_eq!(v["endTime"], "2030-05-01T11:00:00.000Z");
        assert_eq!(v["createdAt"], "2030-04-01T08:30:00.250Z");
    }
}
