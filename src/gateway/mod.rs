// ============================================================================
// Ingestion Gateway
// ============================================================================
//
// HTTP boundary: one event per request, forwarded to the DAL's create.
// Stateless per request. No retry, no idempotency key, no deduplication;
// a repeated id is refused by the store's unique constraint.
//
// ============================================================================

mod handlers;
mod models;
mod server;

pub use handlers::{GatewayState, CONFIRMATION};
pub use models::{gateway_catalog, Event, EVENTS_TABLE};
pub use server::{routes, start_gateway};
