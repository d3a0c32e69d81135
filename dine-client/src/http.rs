//! HTTP client for the ordering backend
//!
//! [`OrderApi`] is the whole-order surface the rest of the crate talks to.
//! [`NetworkHttpClient`] implements it over reqwest; tests plug in an
//! in-memory backend instead.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::{
    CreateOrderRequest, DiningTable, Order, OrderQuery, OrderStatus, OrderStatusUpdate,
    PaymentStatus, PaymentStatusUpdate,
};

use crate::{ClientConfig, ClientError, ClientResult};

/// Whole-order operations exposed by the backend
///
/// There is deliberately no line-item edit here; see [`crate::orders::reconcile`].
#[async_trait]
pub trait OrderApi: Send + Sync {
    /// `GET /orders?status=..&tableId=..`
    async fn list_orders(&self, query: &OrderQuery) -> ClientResult<Vec<Order>>;
    /// `POST /orders`
    async fn create_order(&self, request: &CreateOrderRequest) -> ClientResult<Order>;
    /// `PATCH /orders/{id}/cancel`
    async fn cancel_order(&self, order_id: &str) -> ClientResult<()>;
    /// `PATCH /orders/{id}/status`
    async fn update_status(&self, order_id: &str, status: OrderStatus) -> ClientResult<()>;
    /// `PATCH /orders/{id}/payment`
    async fn update_payment(&self, order_id: &str, status: PaymentStatus) -> ClientResult<()>;
    /// `GET /orders/kitchen/active`
    async fn kitchen_active(&self) -> ClientResult<Vec<Order>>;
    /// `GET /tables`
    async fn list_tables(&self) -> ClientResult<Vec<DiningTable>>;
}

/// Some deployments wrap payloads as `{success, data, error}`, others send them bare
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped {
        success: bool,
        data: Option<T>,
        error: Option<String>,
    },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_data(self) -> ClientResult<T> {
        match self {
            Envelope::Bare(data) => Ok(data),
            Envelope::Wrapped {
                success: true,
                data: Some(data),
                ..
            } => Ok(data),
            Envelope::Wrapped { success: true, .. } => {
                Err(ClientError::InvalidResponse("Missing data".into()))
            }
            Envelope::Wrapped { error, .. } => Err(ClientError::Api {
                code: ErrorCode::Unknown,
                message: error.unwrap_or_else(|| "Unknown error".into()),
            }),
        }
    }
}

/// 网络 HTTP 客户端
#[derive(Debug, Clone)]
pub struct NetworkHttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl NetworkHttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the current token
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// 获取基础 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut req = self.client.request(method, &url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> ClientResult<T> {
        tracing::debug!(path, "GET");
        let response = self.request(Method::GET, path).query(query).send().await?;
        Self::decode(Self::check(response).await?).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        tracing::debug!(path, "POST");
        let response = self.request(Method::POST, path).json(body).send().await?;
        Self::decode(Self::check(response).await?).await
    }

    /// PATCH whose response body is ignored beyond the status code
    async fn patch(&self, path: &str, body: Option<&serde_json::Value>) -> ClientResult<()> {
        tracing::debug!(path, "PATCH");
        let mut req = self.request(Method::PATCH, path);
        if let Some(body) = body {
            req = req.json(body);
        }
        Self::check(req.send().await?).await?;
        Ok(())
    }

    /// Map a non-2xx response onto [`ClientError`]
    async fn check(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await?;
        // 尝试解析为 API 错误响应
        if let Ok(body) = serde_json::from_str::<ApiResponse<()>>(&text)
            && body.code.is_some()
        {
            return Err(AppError::from(body).into());
        }

        // 降级到按状态码处理
        match status {
            StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
            StatusCode::FORBIDDEN => Err(ClientError::Forbidden(text)),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(text)),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(ClientError::Validation(text))
            }
            _ => Err(ClientError::Api {
                code: ErrorCode::from_http_status(status),
                message: if text.is_empty() {
                    status.to_string()
                } else {
                    text
                },
            }),
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let bytes = response.bytes().await?;
        let envelope: Envelope<T> = serde_json::from_slice(&bytes).map_err(|e| {
            ClientError::InvalidResponse(format!("{} ({} bytes)", e, bytes.len()))
        })?;
        envelope.into_data()
    }
}

#[async_trait]
impl OrderApi for NetworkHttpClient {
    async fn list_orders(&self, query: &OrderQuery) -> ClientResult<Vec<Order>> {
        self.get("orders", &query.to_pairs()).await
    }

    async fn create_order(&self, request: &CreateOrderRequest) -> ClientResult<Order> {
        self.post("orders", request).await
    }

    async fn cancel_order(&self, order_id: &str) -> ClientResult<()> {
        self.patch(&format!("orders/{}/cancel", order_id), None).await
    }

    async fn update_status(&self, order_id: &str, status: OrderStatus) -> ClientResult<()> {
        let body = serde_json::to_value(OrderStatusUpdate { status })?;
        self.patch(&format!("orders/{}/status", order_id), Some(&body))
            .await
    }

    async fn update_payment(&self, order_id: &str, status: PaymentStatus) -> ClientResult<()> {
        let body = serde_json::to_value(PaymentStatusUpdate {
            payment_status: status,
        })?;
        self.patch(&format!("orders/{}/payment", order_id), Some(&body))
            .await
    }

    async fn kitchen_active(&self) -> ClientResult<Vec<Order>> {
        self.get("orders/kitchen/active", &[]).await
    }

    async fn list_tables(&self) -> ClientResult<Vec<DiningTable>> {
        self.get("tables", &[]).await
    }
}
