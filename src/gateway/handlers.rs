use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use uuid::Uuid;

use crate::dal::{DalError, DataAccessLayer, Value};
use crate::metrics::Metrics;

use super::models::{Event, EVENTS_TABLE};

pub const CONFIRMATION: &str = "Event received and stored successfully";

/// Shared by every request handler
#[derive(Clone)]
pub struct GatewayState {
    pub dal: DataAccessLayer,
    pub metrics: Arc<Metrics>,
}

/// Logs the full error under a fresh reference and returns a body that
/// carries only the reference.
fn internal_error(what: &str, error: &DalError) -> HttpResponse {
    let reference = Uuid::new_v4();
    tracing::error!(reference = %reference, error = %error, "Failed to {}", what);

    HttpResponse::InternalServerError()
        .content_type("text/plain; charset=utf-8")
        .body(format!("failed to {} (ref {})", what, reference))
}

/// POST /events
pub async fn ingest_event(state: web::Data<GatewayState>, body: web::Bytes) -> impl Responder {
    let event: Event = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected malformed event");
            state.metrics.record_event_rejected("malformed");
            return HttpResponse::BadRequest()
                .content_type("text/plain; charset=utf-8")
                .body(e.to_string());
        }
    };

    match state.dal.create(EVENTS_TABLE, &event.to_values()).await {
        Ok(()) => {
            state.metrics.record_event_received();
            tracing::info!(event_id = event.id, name = %event.name, "Event stored");
            HttpResponse::Ok()
                .content_type("text/plain; charset=utf-8")
                .body(CONFIRMATION)
        }
        Err(e) => {
            state.metrics.record_event_rejected("store");
            internal_error("store event", &e)
        }
    }
}

/// GET /events/{id}
pub async fn get_event(state: web::Data<GatewayState>, path: web::Path<i64>) -> impl Responder {
    let id = path.into_inner();

    match state.dal.read_as::<Event>(EVENTS_TABLE, &Value::Int(id)).await {
        Ok(event) => HttpResponse::Ok().json(event),
        Err(DalError::NotFound { .. }) => HttpResponse::NotFound()
            .content_type("text/plain; charset=utf-8")
            .body(format!("event {} not found", id)),
        Err(e) => internal_error("load event", &e),
    }
}

/// GET /health
pub async fn health(state: web::Data<GatewayState>) -> impl Responder {
    match state.dal.ping().await {
        Ok(()) => {
            state.metrics.set_store_up(true);
            HttpResponse::Ok().json(serde_json::json!({
                "status": "healthy",
                "service": "event-gateway"
            }))
        }
        Err(e) => {
            state.metrics.set_store_up(false);
            tracing::warn!(error = %e, "Health check could not reach store");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "unhealthy",
                "service": "event-gateway"
            }))
        }
    }
}
