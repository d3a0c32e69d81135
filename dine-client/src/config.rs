//! Client configuration
//!
//! # 环境变量
//!
//! | 环境变量 | 默认值 | 说明 |
//! |----------|--------|------|
//! | DINE_API_URL | http://localhost:8080 | 订单 API 地址 |
//! | DINE_API_TOKEN | - | Bearer token |
//! | DINE_RESTAURANT_ID | - | 餐厅 ID |
//! | DINE_MESSAGE_ADDR | - | 推送通道 TCP 地址 |
//! | DINE_MESSAGE_TLS_DOMAIN | - | 设置后推送通道使用 TLS |
//! | DINE_REQUEST_TIMEOUT_SECS | 30 | HTTP 请求超时(秒) |
//! | DINE_EDIT_DEBOUNCE_MS | 400 | 数量编辑合并窗口(毫秒) |
//! | DINE_RECONCILE_TIMEOUT_MS | 15000 | 单次对账执行超时(毫秒) |

use std::time::Duration;

use crate::error::{ClientError, ClientResult};

/// Default debounce window for quantity edits
pub const DEFAULT_EDIT_DEBOUNCE: Duration = Duration::from_millis(400);
/// Default bound on one reconciliation run
pub const DEFAULT_RECONCILE_TIMEOUT: Duration = Duration::from_secs(15);

/// Who the client acts for when it creates orders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerInfo {
    pub name: String,
    pub phone: String,
}

/// Client configuration for connecting to the ordering backend
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g., "http://localhost:8080")
    pub base_url: String,

    /// Bearer token for authentication
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Restaurant the client orders for
    pub restaurant_id: String,

    /// Customer details stamped on created orders
    pub customer: CustomerInfo,

    /// Push channel TCP address
    pub message_addr: Option<String>,

    /// TLS server name for the push channel; `None` means plain TCP
    pub message_tls_domain: Option<String>,

    /// Window in which repeated quantity edits coalesce
    pub edit_debounce: Duration,

    /// Upper bound on one reconciliation run before its overlay is dropped
    pub reconcile_timeout: Duration,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: 30,
            restaurant_id: String::new(),
            customer: CustomerInfo::default(),
            message_addr: None,
            message_tls_domain: None,
            edit_debounce: DEFAULT_EDIT_DEBOUNCE,
            reconcile_timeout: DEFAULT_RECONCILE_TIMEOUT,
        }
    }

    /// Load configuration from the environment, reading `.env` first if present
    pub fn from_env() -> ClientResult<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let mut config = Self::new(
            std::env::var("DINE_API_URL").unwrap_or_else(|_| "http://localhost:8080".into()),
        );
        config.token = std::env::var("DINE_API_TOKEN").ok();
        config.restaurant_id = std::env::var("DINE_RESTAURANT_ID").unwrap_or_default();
        config.message_addr = std::env::var("DINE_MESSAGE_ADDR").ok();
        config.message_tls_domain = std::env::var("DINE_MESSAGE_TLS_DOMAIN").ok();

        if let Some(secs) = env_number("DINE_REQUEST_TIMEOUT_SECS")? {
            config.timeout = secs;
        }
        if let Some(ms) = env_number("DINE_EDIT_DEBOUNCE_MS")? {
            config.edit_debounce = Duration::from_millis(ms);
        }
        if let Some(ms) = env_number("DINE_RECONCILE_TIMEOUT_MS")? {
            config.reconcile_timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Set the restaurant id stamped on created orders
    pub fn with_restaurant(mut self, restaurant_id: impl Into<String>) -> Self {
        self.restaurant_id = restaurant_id.into();
        self
    }

    /// Set the customer stamped on created orders
    pub fn with_customer(mut self, name: impl Into<String>, phone: impl Into<String>) -> Self {
        self.customer = CustomerInfo {
            name: name.into(),
            phone: phone.into(),
        };
        self
    }

    /// Set the push channel address
    pub fn with_message_addr(mut self, addr: impl Into<String>) -> Self {
        self.message_addr = Some(addr.into());
        self
    }

    /// Use TLS for the push channel, verifying the given server name
    pub fn with_message_tls(mut self, domain: impl Into<String>) -> Self {
        self.message_tls_domain = Some(domain.into());
        self
    }

    /// Set the edit debounce window
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.edit_debounce = window;
        self
    }

    /// Set the reconciliation timeout
    pub fn with_reconcile_timeout(mut self, timeout: Duration) -> Self {
        self.reconcile_timeout = timeout;
        self
    }

    /// Create an HTTP client from this configuration
    pub fn build_http_client(&self) -> ClientResult<crate::http::NetworkHttpClient> {
        crate::http::NetworkHttpClient::new(self)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

fn env_number(key: &str) -> ClientResult<Option<u64>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ClientError::Config(format!("{} must be a number, got {:?}", key, raw))),
        Err(_) => Ok(None),
    }
}
