pub mod app;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

pub use app::config::{Config, PhonePeConfig, PhonePeEnvironment};
pub use app::router::build_router;
pub use error::{GatewayError, GatewayResult};
pub use services::PaymentService;
