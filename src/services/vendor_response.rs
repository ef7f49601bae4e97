//! Lookups over PhonePe response bodies, which vary in shape between API versions.

use serde_json::Value;

/// Checkout URL locations, highest priority first.
pub const CHECKOUT_URL_POINTERS: &[&str] = &[
    "/redirectUrl",
    "/data/instrumentResponse/redirectInfo/url",
    "/data/redirectUrl",
];

pub const DEFAULT_FAILURE_MESSAGE: &str = "Payment initiation failed";

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_text(body: &Value, pointers: &[&str]) -> Option<String> {
    pointers
        .iter()
        .filter_map(|pointer| body.pointer(pointer))
        .find_map(text)
}

/// First non-empty string among [`CHECKOUT_URL_POINTERS`].
pub fn extract_checkout_url(body: &Value) -> Option<&str> {
    CHECKOUT_URL_POINTERS
        .iter()
        .filter_map(|pointer| body.pointer(pointer))
        .filter_map(Value::as_str)
        .find(|url| !url.is_empty())
}

pub fn has_error_code(body: &Value) -> bool {
    match body.get("errorCode") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(code)) => !code.is_empty(),
        Some(Value::Number(code)) => code.as_f64() != Some(0.0),
        Some(_) => true,
    }
}

pub fn error_message(body: &Value) -> String {
    first_text(body, &["/message", "/error"]).unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.into())
}

pub fn error_code(body: &Value) -> Option<String> {
    first_text(body, &["/code", "/errorCode"])
}

pub fn order_id(body: &Value) -> Option<String> {
    first_text(body, &["/orderId", "/data/orderId"])
}

pub fn order_state(body: &Value) -> Option<String> {
    first_text(body, &["/state", "/data/state"])
}

pub fn order_amount(body: &Value) -> Option<u64> {
    ["/amount", "/data/amount"]
        .iter()
        .filter_map(|pointer| body.pointer(pointer))
        .find_map(Value::as_u64)
}
