use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;
use crate::utils::money::{parse_amount, validate_amount};

/// Raw body of `POST /api/phonepe/initiate`, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateRequest {
    #[serde(default)]
    pub amount: Value,
    #[serde(default)]
    pub redirect_url: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub amount: Decimal,
    pub redirect_url: String,
}

impl InitiateRequest {
    pub fn validate(self) -> Result<PaymentRequest, GatewayError> {
        let amount = parse_amount(&self.amount)
            .filter(|amount| validate_amount(*amount))
            .ok_or(GatewayError::InvalidAmount)?;

        let redirect_url = match self.redirect_url {
            Some(Value::String(url)) if !url.trim().is_empty() => url,
            _ => return Err(GatewayError::MissingRedirectUrl),
        };

        Ok(PaymentRequest {
            amount,
            redirect_url,
        })
    }
}

/// Body of `POST /checkout/v2/pay`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub merchant_order_id: String,
    pub amount: u64,
    pub expire_after: u64,
    pub meta_info: MetaInfo,
    pub payment_flow: PaymentFlow,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetaInfo {
    /// Synthetic merchant user id.
    pub udf1: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFlow {
    #[serde(rename = "type")]
    pub flow_type: String,
    pub message: String,
    pub merchant_urls: MerchantUrls,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantUrls {
    pub redirect_url: String,
    pub callback_url: String,
}

pub const PG_CHECKOUT: &str = "PG_CHECKOUT";

impl PaymentPayload {
    pub fn new(
        merchant_order_id: String,
        merchant_user_id: String,
        amount_paise: u64,
        redirect_url: String,
        callback_url: String,
        expire_after: u64,
    ) -> Self {
        let message = format!("Payment for FILLS AI - Order {merchant_order_id}");
        Self {
            merchant_order_id,
            amount: amount_paise,
            expire_after,
            meta_info: MetaInfo {
                udf1: merchant_user_id,
            },
            payment_flow: PaymentFlow {
                flow_type: PG_CHECKOUT.to_string(),
                message,
                merchant_urls: MerchantUrls {
                    redirect_url,
                    callback_url,
                },
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub success: bool,
    pub checkout_url: String,
    pub merchant_order_id: String,
    pub phone_pe_order_id: Option<String>,
    /// In paise.
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatus {
    pub success: bool,
    pub merchant_order_id: String,
    pub phone_pe_order_id: Option<String>,
    pub state: Option<String>,
    pub amount: Option<u64>,
}

/// Server-to-server notification posted by PhonePe to the callback URL.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

impl WebhookEvent {
    pub fn merchant_order_id(&self) -> Option<&str> {
        self.payload.get("merchantOrderId").and_then(Value::as_str)
    }

    pub fn state(&self) -> Option<&str> {
        self.payload.get("state").and_then(Value::as_str)
    }
}
