use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::GatewayError;
use crate::services::PaymentService;

pub async fn phonepe_webhook(
    State(service): State<Arc<PaymentService>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, GatewayError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let event = service.handle_webhook(authorization, &body)?;

    Ok(Json(json!({
        "success": true,
        "event": event.event,
    })))
}
