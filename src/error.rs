use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Every failure the gateway reports to its callers.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid amount")]
    InvalidAmount,

    #[error("Redirect URL required")]
    MissingRedirectUrl,

    #[error("Failed to obtain PhonePe access token: {0}")]
    AuthFailure(String),

    #[error("Invalid response from PhonePe")]
    UpstreamMalformedResponse {
        raw_response: String,
        status_code: u16,
        request_url: String,
        request_payload: Option<Value>,
    },

    #[error("{message}")]
    PaymentInitiationFailed {
        status_code: u16,
        message: String,
        code: Option<String>,
        request_url: String,
        request_payload: Value,
        vendor_response: Value,
    },

    #[error("No checkout URL received")]
    MissingCheckoutUrl { details: Value },

    #[error("Invalid merchant order id")]
    InvalidOrderId,

    #[error("{message}")]
    StatusCheckFailed {
        status_code: u16,
        message: String,
        code: Option<String>,
        request_url: String,
        vendor_response: Value,
    },

    #[error("Invalid webhook authorization")]
    WebhookUnauthorized,

    #[error("Invalid webhook payload")]
    InvalidWebhookPayload,

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// The vendor's status passes through unchanged; a missing or invalid one becomes 400.
fn vendor_status(status_code: u16) -> StatusCode {
    (100..=599)
        .contains(&status_code)
        .then(|| StatusCode::from_u16(status_code).ok())
        .flatten()
        .unwrap_or(StatusCode::BAD_REQUEST)
}

impl GatewayError {
    pub fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidAmount
            | Self::MissingRedirectUrl
            | Self::InvalidOrderId
            | Self::InvalidWebhookPayload => StatusCode::BAD_REQUEST,
            Self::WebhookUnauthorized => StatusCode::UNAUTHORIZED,
            Self::AuthFailure(_) => StatusCode::BAD_GATEWAY,
            Self::PaymentInitiationFailed { status_code, .. }
            | Self::StatusCheckFailed { status_code, .. } => vendor_status(*status_code),
            Self::UpstreamMalformedResponse { .. }
            | Self::MissingCheckoutUrl { .. }
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount => "invalid_amount",
            Self::MissingRedirectUrl => "missing_redirect_url",
            Self::AuthFailure(_) => "auth_failure",
            Self::UpstreamMalformedResponse { .. } => "upstream_malformed_response",
            Self::PaymentInitiationFailed { .. } => "payment_initiation_failed",
            Self::MissingCheckoutUrl { .. } => "missing_checkout_url",
            Self::InvalidOrderId => "invalid_order_id",
            Self::StatusCheckFailed { .. } => "status_check_failed",
            Self::WebhookUnauthorized => "webhook_unauthorized",
            Self::InvalidWebhookPayload => "invalid_webhook_payload",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("success".into(), Value::Bool(false));

        match self {
            Self::AuthFailure(message) => {
                body.insert("error".into(), json!("Failed to obtain PhonePe access token"));
                body.insert("message".into(), json!(message));
            }
            Self::UpstreamMalformedResponse {
                raw_response,
                status_code,
                request_url,
                request_payload,
            } => {
                body.insert("error".into(), json!(self.to_string()));
                body.insert("rawResponse".into(), json!(raw_response));
                body.insert("statusCode".into(), json!(status_code));
                body.insert("requestUrl".into(), json!(request_url));
                if let Some(payload) = request_payload {
                    body.insert("requestPayload".into(), payload.clone());
                }
            }
            Self::PaymentInitiationFailed {
                status_code,
                message,
                code,
                request_url,
                request_payload,
                vendor_response,
            } => {
                body.insert("error".into(), json!(message));
                body.insert("code".into(), json!(code));
                body.insert("statusCode".into(), json!(status_code));
                body.insert("requestUrl".into(), json!(request_url));
                body.insert("requestPayload".into(), request_payload.clone());
                body.insert("phonePeResponse".into(), vendor_response.clone());
            }
            Self::StatusCheckFailed {
                status_code,
                message,
                code,
                request_url,
                vendor_response,
            } => {
                body.insert("error".into(), json!(message));
                body.insert("code".into(), json!(code));
                body.insert("statusCode".into(), json!(status_code));
                body.insert("requestUrl".into(), json!(request_url));
                body.insert("phonePeResponse".into(), vendor_response.clone());
            }
            Self::MissingCheckoutUrl { details } => {
                body.insert("error".into(), json!(self.to_string()));
                body.insert("details".into(), details.clone());
            }
            Self::Internal(message) => {
                body.insert("error".into(), json!("Internal server error"));
                body.insert("message".into(), json!(message));
            }
            Self::InvalidAmount
            | Self::MissingRedirectUrl
            | Self::InvalidOrderId
            | Self::WebhookUnauthorized
            | Self::InvalidWebhookPayload => {
                body.insert("error".into(), json!(self.to_string()));
            }
        }

        Value::Object(body)
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let mut resp = (self.status(), Json(self.body())).into_response();
        resp.headers_mut().insert(
            "X-Error-Code",
            HeaderValue::from_static(self.error_code()),
        );
        resp
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
