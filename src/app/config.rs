use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{env, fmt, fs, path::Path, str::FromStr};

pub const SANDBOX_BASE_URL: &str = "https://api-preprod.phonepe.com/apis/pg-sandbox";
pub const PRODUCTION_API_BASE_URL: &str = "https://api.phonepe.com/apis/pg";
pub const PRODUCTION_AUTH_BASE_URL: &str = "https://api.phonepe.com/apis/identity-manager";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhonePeEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl PhonePeEnvironment {
    pub fn api_base_url(self) -> &'static str {
        match self {
            Self::Sandbox => SANDBOX_BASE_URL,
            Self::Production => PRODUCTION_API_BASE_URL,
        }
    }

    pub fn auth_base_url(self) -> &'static str {
        match self {
            Self::Sandbox => SANDBOX_BASE_URL,
            Self::Production => PRODUCTION_AUTH_BASE_URL,
        }
    }
}

impl FromStr for PhonePeEnvironment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sandbox" | "uat" | "preprod" => Ok(Self::Sandbox),
            "production" | "prod" => Ok(Self::Production),
            other => bail!("unknown PHONEPE_ENV `{other}` (expected sandbox or production)"),
        }
    }
}

#[derive(Clone)]
pub struct PhonePeConfig {
    pub environment: PhonePeEnvironment,
    pub api_base_url: String,
    pub auth_base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub client_version: u32,
    pub webhook_url: Option<String>,
    pub webhook_username: Option<String>,
    pub webhook_password: Option<String>,
    pub http_timeout_ms: u64,
    pub order_expiry_secs: u64,
    pub token_cache: bool,
}

// Secrets stay out of logs and panics.
impl fmt::Debug for PhonePeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhonePeConfig")
            .field("environment", &self.environment)
            .field("api_base_url", &self.api_base_url)
            .field("auth_base_url", &self.auth_base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("client_version", &self.client_version)
            .field("webhook_url", &self.webhook_url)
            .field("webhook_username", &self.webhook_username)
            .field("webhook_password", &self.webhook_password.as_ref().map(|_| "<redacted>"))
            .field("http_timeout_ms", &self.http_timeout_ms)
            .field("order_expiry_secs", &self.order_expiry_secs)
            .field("token_cache", &self.token_cache)
            .finish()
    }
}

impl PhonePeConfig {
    pub fn new(
        environment: PhonePeEnvironment,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            environment,
            api_base_url: environment.api_base_url().to_string(),
            auth_base_url: environment.auth_base_url().to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            client_version: 1,
            webhook_url: None,
            webhook_username: None,
            webhook_password: None,
            http_timeout_ms: 10_000,
            order_expiry_secs: 1200,
            token_cache: true,
        }
    }

    /// Points both the API and the OAuth endpoints at one host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.api_base_url = base_url.clone();
        self.auth_base_url = base_url;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub phonepe: PhonePeConfig,
}

/// Shape of the optional TOML file. Every key is optional; env vars win.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub port: Option<u16>,
    #[serde(default)]
    pub phonepe: FilePhonePeConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilePhonePeConfig {
    pub environment: Option<PhonePeEnvironment>,
    pub api_base_url: Option<String>,
    pub auth_base_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub client_version: Option<u32>,
    pub webhook_url: Option<String>,
    pub webhook_username: Option<String>,
    pub webhook_password: Option<String>,
    pub http_timeout_ms: Option<u64>,
    pub order_expiry_secs: Option<u64>,
    pub token_cache: Option<bool>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => FileConfig::read(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, |key| env::var(key).ok())
    }

    /// Layers `lookup` (normally the process environment) over `file`.
    pub fn resolve<F>(file: FileConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).and_then(non_empty);
        let file_pp = file.phonepe;

        let server_port = match var("PORT") {
            Some(port) => port.parse::<u16>().context("PORT must be a valid port number")?,
            None => file.port.unwrap_or(4321),
        };

        let environment = match var("PHONEPE_ENV") {
            Some(value) => value.parse::<PhonePeEnvironment>()?,
            None => file_pp.environment.unwrap_or_default(),
        };

        let client_id = var("PHONEPE_CLIENT_ID")
            .or(file_pp.client_id)
            .context("PHONEPE_CLIENT_ID must be set")?;
        let client_secret = var("PHONEPE_CLIENT_SECRET")
            .or(file_pp.client_secret)
            .context("PHONEPE_CLIENT_SECRET must be set")?;

        let mut phonepe = PhonePeConfig::new(environment, client_id, client_secret);

        if let Some(url) = var("PHONEPE_API_BASE_URL").or(file_pp.api_base_url) {
            phonepe.api_base_url = url;
        }
        if let Some(url) = var("PHONEPE_AUTH_BASE_URL").or(file_pp.auth_base_url) {
            phonepe.auth_base_url = url;
        }
        phonepe.api_base_url = phonepe.api_base_url.trim_end_matches('/').to_string();
        phonepe.auth_base_url = phonepe.auth_base_url.trim_end_matches('/').to_string();

        phonepe.client_version = var("PHONEPE_CLIENT_VERSION")
            .and_then(|value| value.parse::<u32>().ok())
            .or(file_pp.client_version)
            .unwrap_or(phonepe.client_version);
        phonepe.webhook_url = var("PHONEPE_WEBHOOK_URL").or(file_pp.webhook_url);
        phonepe.webhook_username = var("PHONEPE_WEBHOOK_USERNAME").or(file_pp.webhook_username);
        phonepe.webhook_password = var("PHONEPE_WEBHOOK_PASSWORD").or(file_pp.webhook_password);
        phonepe.http_timeout_ms = var("PHONEPE_HTTP_TIMEOUT_MS")
            .and_then(|value| value.parse::<u64>().ok())
            .or(file_pp.http_timeout_ms)
            .unwrap_or(phonepe.http_timeout_ms)
            .max(100);
        phonepe.order_expiry_secs = var("PHONEPE_ORDER_EXPIRY_SECS")
            .and_then(|value| value.parse::<u64>().ok())
            .or(file_pp.order_expiry_secs)
            .unwrap_or(phonepe.order_expiry_secs);
        phonepe.token_cache = var("PHONEPE_TOKEN_CACHE")
            .and_then(|value| parse_bool(&value))
            .or(file_pp.token_cache)
            .unwrap_or(phonepe.token_cache);

        Ok(Self {
            server_port,
            phonepe,
        })
    }

    /// Origin used for callback URLs when the request carries no usable host.
    pub fn fallback_origin(&self) -> String {
        format!("http://localhost:{}", self.server_port)
    }
}
