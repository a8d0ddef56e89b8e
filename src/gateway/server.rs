use actix_web::{web, App, HttpServer};
use std::sync::Arc;

use crate::metrics::{metrics_handler, Metrics};

use super::handlers::{get_event, health, ingest_event, GatewayState};

/// Route table shared by the server and tests
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/events", web::post().to(ingest_event))
        .route("/events/{id}", web::get().to(get_event))
        .route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics_handler));
}

/// Start the ingestion gateway and serve until shutdown
pub async fn start_gateway(state: GatewayState, bind: &str) -> std::io::Result<()> {
    tracing::info!("Event gateway listening on http://{}", bind);

    let state = web::Data::new(state);
    let metrics: web::Data<Arc<Metrics>> = web::Data::new(state.metrics.clone());

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(metrics.clone())
            .configure(routes)
    })
    .bind(bind)?
    .run()
    .await
}
