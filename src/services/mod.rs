pub mod payment_service;
pub mod phonepe_client;
pub mod token_provider;
pub mod vendor_response;
pub mod webhook;

pub use payment_service::{PaymentService, WEBHOOK_PATH};
pub use phonepe_client::{ClientError, PhonePeClient};
pub use token_provider::{AccessToken, CachedTokenProvider, TokenProvider};
