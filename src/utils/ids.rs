use chrono::Utc;
use uuid::Uuid;

/// `ORDER_<unix-millis>_<uuid>`: 52 chars, inside PhonePe's 63-char limit.
pub fn generate_merchant_order_id() -> String {
    format!(
        "ORDER_{}_{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

pub fn generate_merchant_user_id() -> String {
    format!("USER_{}", Utc::now().timestamp_millis())
}

/// PhonePe accepts up to 63 characters of `[A-Za-z0-9_-]`.
pub fn is_valid_merchant_order_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 63
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
