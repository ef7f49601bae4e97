use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap},
    response::Json,
};
use std::sync::Arc;
use tracing::{error, info};
use url::Url;

use crate::error::GatewayError;
use crate::models::payment::{InitiateRequest, OrderStatus, PaymentResult};
use crate::services::PaymentService;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Origin the caller used to reach us, honouring reverse-proxy headers.
pub fn request_origin(headers: &HeaderMap, fallback: &str) -> String {
    let host = header_str(headers, "x-forwarded-host")
        .or_else(|| header_str(headers, header::HOST.as_str()));
    let Some(host) = host else {
        return fallback.to_string();
    };
    let scheme = match header_str(headers, "x-forwarded-proto") {
        Some("https") => "https",
        _ => "http",
    };

    match Url::parse(&format!("{scheme}://{host}")) {
        Ok(url) if url.has_host() => url.origin().ascii_serialization(),
        _ => fallback.to_string(),
    }
}

pub async fn initiate_payment(
    State(service): State<Arc<PaymentService>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PaymentResult>, GatewayError> {
    let request: InitiateRequest = serde_json::from_slice(&body).map_err(|e| {
        error!("Invalid initiate request body: {}", e);
        GatewayError::internal(e)
    })?;

    let payment = request.validate()?;
    let origin = request_origin(&headers, &service.config().fallback_origin());

    let result = service.initiate(payment, &origin).await?;
    info!(order_id = %result.merchant_order_id, "Payment initiated");
    Ok(Json(result))
}

pub async fn order_status(
    State(service): State<Arc<PaymentService>>,
    Path(merchant_order_id): Path<String>,
) -> Result<Json<OrderStatus>, GatewayError> {
    service.order_status(&merchant_order_id).await.map(Json)
}
