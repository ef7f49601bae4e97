use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{payments, webhook};
use crate::services::{PaymentService, WEBHOOK_PATH};

pub fn build_router(service: Arc<PaymentService>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/phonepe/initiate", post(payments::initiate_payment))
        .route(
            "/api/phonepe/status/:merchant_order_id",
            get(payments::order_status),
        )
        .route(WEBHOOK_PATH, post(webhook::phonepe_webhook))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}

async fn health_handler() -> StatusCode {
    StatusCode::OK
}
