use crate::app::config::PhonePeConfig;
use crate::models::payment::PaymentPayload;
use crate::services::token_provider::AccessToken;
use reqwest::{header, Client};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const OAUTH_TOKEN_PATH: &str = "/v1/oauth/token";
pub const PAY_PATH: &str = "/checkout/v2/pay";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP client error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("token endpoint returned HTTP {status}: {body}")]
    TokenRejected { status: u16, body: String },
    #[error("token endpoint returned an unusable response: {0}")]
    TokenMalformed(String),
}

/// Status and raw body of a vendor call; interpretation is left to the caller.
#[derive(Debug, Clone)]
pub struct VendorResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl VendorResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    expires_at: Option<i64>,
}

pub struct PhonePeClient {
    client: Client,
    config: PhonePeConfig,
}

impl PhonePeClient {
    pub fn new(config: &PhonePeConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn token_url(&self) -> String {
        format!("{}{}", self.config.auth_base_url, OAUTH_TOKEN_PATH)
    }

    pub fn pay_url(&self) -> String {
        format!("{}{}", self.config.api_base_url, PAY_PATH)
    }

    pub fn status_url(&self, merchant_order_id: &str) -> String {
        format!(
            "{}/checkout/v2/order/{}/status",
            self.config.api_base_url, merchant_order_id
        )
    }

    pub async fn fetch_token(&self) -> Result<AccessToken, ClientError> {
        let client_version = self.config.client_version.to_string();
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_version", client_version.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];

        let response = self
            .client
            .post(self.token_url())
            .header(header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "PhonePe token endpoint rejected credentials");
            return Err(ClientError::TokenRejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ClientError::TokenMalformed(e.to_string()))?;

        let access_token = parsed
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ClientError::TokenMalformed("missing access_token".into()))?;

        info!(expires_at = ?parsed.expires_at, "Obtained PhonePe access token");

        Ok(AccessToken {
            access_token,
            token_type: parsed
                .token_type
                .filter(|kind| !kind.is_empty())
                .unwrap_or_else(|| AccessToken::DEFAULT_TYPE.to_string()),
            expires_at: parsed.expires_at,
        })
    }

    pub async fn create_payment(
        &self,
        token: &AccessToken,
        payload: &PaymentPayload,
    ) -> Result<VendorResponse, ClientError> {
        let url = self.pay_url();
        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, token.authorization_header())
            .json(payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(VendorResponse { url, status, body })
    }

    pub async fn order_status(
        &self,
        token: &AccessToken,
        merchant_order_id: &str,
    ) -> Result<VendorResponse, ClientError> {
        let url = self.status_url(merchant_order_id);
        let response = self
            .client
            .get(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, token.authorization_header())
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(VendorResponse { url, status, body })
    }
}
