use crate::app::config::Config;
use crate::error::{GatewayError, GatewayResult};
use crate::models::payment::{
    OrderStatus, PaymentPayload, PaymentRequest, PaymentResult, WebhookEvent,
};
use crate::services::phonepe_client::{ClientError, PhonePeClient, VendorResponse};
use crate::services::token_provider::{AccessToken, CachedTokenProvider, TokenProvider};
use crate::services::{vendor_response, webhook};
use crate::utils::ids::{
    generate_merchant_order_id, generate_merchant_user_id, is_valid_merchant_order_id,
};
use crate::utils::money::{format_paise, rupees_to_paise};
use axum::http::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const WEBHOOK_PATH: &str = "/api/phonepe/webhook";

pub struct PaymentService {
    config: Arc<Config>,
    client: Arc<PhonePeClient>,
    tokens: Arc<dyn TokenProvider>,
}

impl PaymentService {
    pub fn new(
        config: Arc<Config>,
        client: Arc<PhonePeClient>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            config,
            client,
            tokens,
        }
    }

    /// Wires the HTTP client and the token cache from `config`.
    pub fn from_config(config: Arc<Config>) -> Result<Self, ClientError> {
        let client = Arc::new(PhonePeClient::new(&config.phonepe)?);
        let tokens = Arc::new(CachedTokenProvider::new(
            client.clone(),
            config.phonepe.token_cache,
        ));
        Ok(Self::new(config, client, tokens))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn callback_url(&self, origin: &str) -> String {
        self.config
            .phonepe
            .webhook_url
            .clone()
            .unwrap_or_else(|| format!("{}{}", origin.trim_end_matches('/'), WEBHOOK_PATH))
    }

    /// A 401 from PhonePe means the token was revoked before its `expires_at`.
    fn discard_rejected_token(&self, response: &VendorResponse) {
        if response.status == StatusCode::UNAUTHORIZED.as_u16() {
            warn!(url = %response.url, "PhonePe rejected the access token; dropping cached token");
            self.tokens.invalidate();
        }
    }

    async fn access_token(&self) -> GatewayResult<AccessToken> {
        self.tokens.access_token().await.map_err(|e| {
            error!(error = %e, "Failed to obtain PhonePe access token");
            GatewayError::AuthFailure(e.to_string())
        })
    }

    pub async fn initiate(
        &self,
        request: PaymentRequest,
        origin: &str,
    ) -> GatewayResult<PaymentResult> {
        let token = self.access_token().await?;

        let merchant_order_id = generate_merchant_order_id();
        let amount_paise = rupees_to_paise(request.amount).ok_or(GatewayError::InvalidAmount)?;
        let callback_url = self.callback_url(origin);

        let payload = PaymentPayload::new(
            merchant_order_id.clone(),
            generate_merchant_user_id(),
            amount_paise,
            request.redirect_url.clone(),
            callback_url.clone(),
            self.config.phonepe.order_expiry_secs,
        );

        info!(
            order_id = %merchant_order_id,
            amount = amount_paise,
            display_amount = %format_paise(amount_paise),
            redirect_url = %request.redirect_url,
            callback_url = %callback_url,
            api_url = %self.client.pay_url(),
            "Initiating PhonePe payment"
        );

        let response = self
            .client
            .create_payment(&token, &payload)
            .await
            .map_err(|e| {
                error!(order_id = %merchant_order_id, error = %e, "PhonePe pay request failed");
                GatewayError::internal(e)
            })?;

        info!(order_id = %merchant_order_id, status = response.status, "PhonePe responded");
        self.discard_rejected_token(&response);

        self.interpret_payment(response, &payload, amount_paise)
    }

    fn interpret_payment(
        &self,
        response: VendorResponse,
        payload: &PaymentPayload,
        amount_paise: u64,
    ) -> GatewayResult<PaymentResult> {
        let request_payload = serde_json::to_value(payload).map_err(GatewayError::internal)?;

        let body: Value = match serde_json::from_str(&response.body) {
            Ok(body) => body,
            Err(_) => {
                warn!(
                    order_id = %payload.merchant_order_id,
                    status = response.status,
                    "PhonePe returned a non-JSON body"
                );
                return Err(GatewayError::UpstreamMalformedResponse {
                    raw_response: response.body,
                    status_code: response.status,
                    request_url: response.url,
                    request_payload: Some(request_payload),
                });
            }
        };

        if !response.is_success() || vendor_response::has_error_code(&body) {
            let message = vendor_response::error_message(&body);
            let code = vendor_response::error_code(&body);
            warn!(
                order_id = %payload.merchant_order_id,
                status = response.status,
                code = ?code,
                message = %message,
                "PhonePe rejected payment"
            );
            return Err(GatewayError::PaymentInitiationFailed {
                status_code: response.status,
                message,
                code,
                request_url: response.url,
                request_payload,
                vendor_response: body,
            });
        }

        let Some(checkout_url) = vendor_response::extract_checkout_url(&body).map(str::to_owned)
        else {
            warn!(order_id = %payload.merchant_order_id, "PhonePe response had no checkout URL");
            return Err(GatewayError::MissingCheckoutUrl { details: body });
        };

        Ok(PaymentResult {
            success: true,
            checkout_url,
            merchant_order_id: payload.merchant_order_id.clone(),
            phone_pe_order_id: vendor_response::order_id(&body),
            amount: amount_paise,
        })
    }

    pub async fn order_status(&self, merchant_order_id: &str) -> GatewayResult<OrderStatus> {
        if !is_valid_merchant_order_id(merchant_order_id) {
            return Err(GatewayError::InvalidOrderId);
        }

        let token = self.access_token().await?;
        let response = self
            .client
            .order_status(&token, merchant_order_id)
            .await
            .map_err(|e| {
                error!(order_id = %merchant_order_id, error = %e, "PhonePe status request failed");
                GatewayError::internal(e)
            })?;
        self.discard_rejected_token(&response);

        let body: Value = serde_json::from_str(&response.body).map_err(|_| {
            GatewayError::UpstreamMalformedResponse {
                raw_response: response.body.clone(),
                status_code: response.status,
                request_url: response.url.clone(),
                request_payload: None,
            }
        })?;

        if !response.is_success() || vendor_response::has_error_code(&body) {
            return Err(GatewayError::StatusCheckFailed {
                status_code: response.status,
                message: vendor_response::error_message(&body),
                code: vendor_response::error_code(&body),
                request_url: response.url,
                vendor_response: body,
            });
        }

        let status = OrderStatus {
            success: true,
            merchant_order_id: merchant_order_id.to_string(),
            phone_pe_order_id: vendor_response::order_id(&body),
            state: vendor_response::order_state(&body),
            amount: vendor_response::order_amount(&body),
        };
        info!(order_id = %merchant_order_id, state = ?status.state, "Fetched PhonePe order status");
        Ok(status)
    }

    pub fn handle_webhook(
        &self,
        authorization: Option<&str>,
        body: &[u8],
    ) -> GatewayResult<WebhookEvent> {
        let phonepe = &self.config.phonepe;
        match (&phonepe.webhook_username, &phonepe.webhook_password) {
            (Some(username), Some(password)) => {
                if !webhook::verify_authorization(authorization, username, password) {
                    warn!("Rejected PhonePe webhook with invalid authorization");
                    return Err(GatewayError::WebhookUnauthorized);
                }
            }
            _ => warn!("PhonePe webhook credentials not configured; skipping verification"),
        }

        let event: WebhookEvent =
            serde_json::from_slice(body).map_err(|_| GatewayError::InvalidWebhookPayload)?;

        info!(
            event = %event.event,
            order_id = ?event.merchant_order_id(),
            state = ?event.state(),
            "Received PhonePe webhook"
        );
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::{PhonePeConfig, PhonePeEnvironment};
    use async_trait::async_trait;
    use httpmock::prelude::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingTokens;

    #[async_trait]
    impl TokenProvider for FailingTokens {
        async fn access_token(&self) -> Result<AccessToken, ClientError> {
            Err(ClientError::TokenRejected {
                status: 401,
                body: "nope".into(),
            })
        }
    }

    #[derive(Default)]
    struct CountingTokens {
        invalidations: AtomicUsize,
    }

    #[async_trait]
    impl TokenProvider for CountingTokens {
        async fn access_token(&self) -> Result<AccessToken, ClientError> {
            Ok(AccessToken {
                access_token: "tok".into(),
                token_type: AccessToken::DEFAULT_TYPE.into(),
                expires_at: Some(4_102_444_800),
            })
        }

        fn invalidate(&self) {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn service_against(base_url: &str, tokens: Arc<CountingTokens>) -> PaymentService {
        let phonepe = PhonePeConfig::new(PhonePeEnvironment::Sandbox, "id", "secret")
            .with_base_url(base_url);
        let config = Arc::new(Config {
            server_port: 4321,
            phonepe,
        });
        let client = Arc::new(PhonePeClient::new(&config.phonepe).unwrap());
        PaymentService::new(config, client, tokens)
    }

    fn service(webhook_url: Option<&str>, webhook_auth: Option<(&str, &str)>) -> PaymentService {
        let mut phonepe = PhonePeConfig::new(PhonePeEnvironment::Sandbox, "id", "secret")
            .with_base_url("http://127.0.0.1:9");
        phonepe.webhook_url = webhook_url.map(str::to_string);
        if let Some((user, pass)) = webhook_auth {
            phonepe.webhook_username = Some(user.into());
            phonepe.webhook_password = Some(pass.into());
        }
        let config = Arc::new(Config {
            server_port: 4321,
            phonepe,
        });
        let client = Arc::new(PhonePeClient::new(&config.phonepe).unwrap());
        PaymentService::new(config, client, Arc::new(FailingTokens))
    }

    fn payload() -> PaymentPayload {
        PaymentPayload::new(
            "ORDER_1".into(),
            "USER_1".into(),
            10050,
            "https://site.example/done".into(),
            "https://site.example/api/phonepe/webhook".into(),
            1200,
        )
    }

    fn response(status: u16, body: &str) -> VendorResponse {
        VendorResponse {
            url: "https://api.example/checkout/v2/pay".into(),
            status,
            body: body.into(),
        }
    }

    #[test]
    fn test_callback_url_prefers_configuration() {
        let svc = service(Some("https://hooks.example/pp"), None);
        assert_eq!(svc.callback_url("https://site.example"), "https://hooks.example/pp");

        let svc = service(None, None);
        assert_eq!(
            svc.callback_url("https://site.example/"),
            "https://site.example/api/phonepe/webhook"
        );
    }

    #[tokio::test]
    async fn test_token_failure_maps_to_auth_failure() {
        let svc = service(None, None);
        let request = PaymentRequest {
            amount: dec!(10),
            redirect_url: "https://site.example/done".into(),
        };
        let err = svc.initiate(request, "https://site.example").await.unwrap_err();
        assert!(matches!(err, GatewayError::AuthFailure(_)));
    }

    #[test]
    fn test_interpret_success() {
        let svc = service(None, None);
        let result = svc
            .interpret_payment(
                response(200, r#"{"orderId":"OMO1","state":"PENDING","redirectUrl":"https://pay.example/x"}"#),
                &payload(),
                10050,
            )
            .unwrap();
        assert_eq!(result.checkout_url, "https://pay.example/x");
        assert_eq!(result.phone_pe_order_id.as_deref(), Some("OMO1"));
        assert_eq!(result.merchant_order_id, "ORDER_1");
        assert_eq!(result.amount, 10050);
    }

    #[test]
    fn test_interpret_error_code_on_http_200() {
        let svc = service(None, None);
        let err = svc
            .interpret_payment(response(200, r#"{"errorCode":"X","message":"bad"}"#), &payload(), 1)
            .unwrap_err();
        match err {
            GatewayError::PaymentInitiationFailed { message, code, .. } => {
                assert_eq!(message, "bad");
                assert_eq!(code.as_deref(), Some("X"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_interpret_non_json() {
        let svc = service(None, None);
        let err = svc
            .interpret_payment(response(502, "<html>bad gateway</html>"), &payload(), 1)
            .unwrap_err();
        match err {
            GatewayError::UpstreamMalformedResponse {
                raw_response,
                status_code,
                request_payload,
                ..
            } => {
                assert_eq!(raw_response, "<html>bad gateway</html>");
                assert_eq!(status_code, 502);
                assert_eq!(request_payload.unwrap()["merchantOrderId"], "ORDER_1");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_interpret_missing_checkout_url() {
        let svc = service(None, None);
        let err = svc
            .interpret_payment(response(200, r#"{"orderId":"OMO1"}"#), &payload(), 1)
            .unwrap_err();
        assert!(
            matches!(err, GatewayError::MissingCheckoutUrl { ref details } if details == &json!({"orderId": "OMO1"}))
        );
    }

    #[tokio::test]
    async fn test_vendor_401_invalidates_token() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/checkout/v2/pay");
                then.status(401)
                    .json_body(json!({"code": "UNAUTHORIZED", "message": "token expired"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/checkout/v2/order/ORDER_1/status");
                then.status(401)
                    .json_body(json!({"code": "UNAUTHORIZED", "message": "token expired"}));
            })
            .await;

        let tokens = Arc::new(CountingTokens::default());
        let svc = service_against(&server.base_url(), tokens.clone());
        let request = PaymentRequest {
            amount: dec!(10),
            redirect_url: "https://site.example/done".into(),
        };

        let err = svc.initiate(request, "https://site.example").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(tokens.invalidations.load(Ordering::SeqCst), 1);

        let err = svc.order_status("ORDER_1").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(tokens.invalidations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_vendor_rejection_other_than_401_keeps_token() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/checkout/v2/pay");
                then.status(400)
                    .json_body(json!({"code": "BAD_REQUEST", "message": "Invalid amount"}));
            })
            .await;

        let tokens = Arc::new(CountingTokens::default());
        let svc = service_against(&server.base_url(), tokens.clone());
        let request = PaymentRequest {
            amount: dec!(10),
            redirect_url: "https://site.example/done".into(),
        };

        svc.initiate(request, "https://site.example").await.unwrap_err();
        assert_eq!(tokens.invalidations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_order_status_rejects_bad_id_before_calling_vendor() {
        let svc = service(None, None);
        let err = svc.order_status("../../etc").await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidOrderId));
    }

    #[test]
    fn test_webhook_requires_matching_authorization() {
        let svc = service(None, Some(("user", "pass")));
        let body = br#"{"event":"checkout.order.completed","payload":{"merchantOrderId":"ORDER_1","state":"COMPLETED"}}"#;

        let err = svc.handle_webhook(Some("wrong"), body).unwrap_err();
        assert!(matches!(err, GatewayError::WebhookUnauthorized));

        let auth = webhook::expected_authorization("user", "pass");
        let event = svc.handle_webhook(Some(&auth), body).unwrap();
        assert_eq!(event.event, "checkout.order.completed");
        assert_eq!(event.merchant_order_id(), Some("ORDER_1"));
        assert_eq!(event.state(), Some("COMPLETED"));
    }

    #[test]
    fn test_webhook_without_credentials_still_validates_body() {
        let svc = service(None, None);
        assert!(svc.handle_webhook(None, br#"{"event":"pg.order.failed"}"#).is_ok());
        let err = svc.handle_webhook(None, b"not json").unwrap_err();
        assert!(matches!(err, GatewayError::InvalidWebhookPayload));
    }
}
