use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::OrderStatus;

// ==================== Notification Level ====================

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    /// 普通信息
    Info,
    /// 警告
    Warning,
    /// 错误
    Error,
    /// 严重错误
    Critical,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// 通知分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    /// 系统级通知
    System,
    /// 网络相关
    Network,
    /// 业务相关（如订单、支付）
    Business,
}

// ==================== Payloads ====================

/// 握手载荷 (客户端 -> 服务端)
///
/// Carries the protocol version and the bearer credential the push channel
/// authenticates with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakePayload {
    /// 协议版本
    pub version: u16,
    /// 客户端名称/标识
    pub client_name: Option<String>,
    /// 客户端版本
    pub client_version: Option<String>,
    /// 客户端唯一标识 (UUID)
    pub client_id: Option<String>,
    /// Bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// 通知载荷
///
/// 用于向用户展示系统状态、错误或业务提示。Also used locally to surface
/// dismissable errors from reconciliation and kanban moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// 标题
    pub title: String,
    /// 消息内容
    pub message: String,
    /// 通知级别
    pub level: NotificationLevel,
    /// 通知分类
    pub category: NotificationCategory,
    /// 附加数据 (JSON)
    pub data: Option<serde_json::Value>,
}

/// 同步信号载荷 (服务端 -> 所有客户端)
///
/// 当某个资源发生变更时，服务端广播此信号，通知客户端刷新数据。
/// Clients treat it purely as an invalidation signal.
///
/// # 示例
/// - `resource`: "order"
/// - `action`: "orderStatusUpdate"
/// - `id`: "order_123"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload {
    /// 资源类型 (例如: "order", "table")
    pub resource: String,
    /// 版本号
    #[serde(default)]
    pub version: u64,
    /// 变更类型
    pub action: String,
    /// 资源 ID
    pub id: String,
    /// 资源数据 (可选)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// 通用响应载荷 (服务端 -> 客户端)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsePayload {
    /// 是否成功
    pub success: bool,
    /// 响应消息/错误描述
    pub message: String,
    /// 错误代码 (可选, 仅在失败时有用)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u16>,
}

// ==================== Order push events ====================

/// `SyncPayload::resource` used for order events
pub const ORDER_RESOURCE: &str = "order";
/// Action name of the new-order event
pub const ACTION_NEW_ORDER: &str = "newOrder";
/// Action name of the status-change event
pub const ACTION_ORDER_STATUS_UPDATE: &str = "orderStatusUpdate";

/// Order events the push channel announces
///
/// Only the fields needed to decide whether a refetch is due are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderPushEvent {
    NewOrder {
        order_id: String,
        table_id: Option<String>,
    },
    StatusUpdate {
        order_id: String,
        table_id: Option<String>,
        status: Option<OrderStatus>,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderEventData {
    #[serde(default, deserialize_with = "crate::util::deserialize_opt_id")]
    table_id: Option<String>,
    #[serde(default)]
    status: Option<OrderStatus>,
}

impl OrderPushEvent {
    /// Recognize an order event in a sync signal; `None` for anything else
    pub fn from_sync(payload: &SyncPayload) -> Option<Self> {
        if payload.resource != ORDER_RESOURCE {
            return None;
        }
        let data = payload
            .data
            .clone()
            .and_then(|v| serde_json::from_value::<OrderEventData>(v).ok());
        let (table_id, status) = match data {
            Some(d) => (d.table_id, d.status),
            None => (None, None),
        };
        match payload.action.as_str() {
            ACTION_NEW_ORDER => Some(Self::NewOrder {
                order_id: payload.id.clone(),
                table_id,
            }),
            ACTION_ORDER_STATUS_UPDATE => Some(Self::StatusUpdate {
                order_id: payload.id.clone(),
                table_id,
                status,
            }),
            _ => None,
        }
    }

    pub fn order_id(&self) -> &str {
        match self {
            Self::NewOrder { order_id, .. } | Self::StatusUpdate { order_id, .. } => order_id,
        }
    }

    pub fn table_id(&self) -> Option<&str> {
        match self {
            Self::NewOrder { table_id, .. } | Self::StatusUpdate { table_id, .. } => {
                table_id.as_deref()
            }
        }
    }

    /// Build the sync signal a backend would broadcast for this event
    pub fn to_sync(&self, version: u64) -> SyncPayload {
        let (action, status) = match self {
            Self::NewOrder { .. } => (ACTION_NEW_ORDER, None),
            Self::StatusUpdate { status, .. } => (ACTION_ORDER_STATUS_UPDATE, *status),
        };
        let mut data = serde_json::Map::new();
        if let Some(table_id) = self.table_id() {
            data.insert("tableId".into(), table_id.into());
        }
        if let Some(status) = status {
            data.insert("status".into(), status.as_str().into());
        }
        SyncPayload {
            resource: ORDER_RESOURCE.to_string(),
            version,
            action: action.to_string(),
            id: self.order_id().to_string(),
            data: Some(serde_json::Value::Object(data)),
        }
    }
}

// ==================== Convenience Constructors ====================

impl NotificationPayload {
    fn build(level: NotificationLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level,
            category: NotificationCategory::System,
            data: None,
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::build(NotificationLevel::Info, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::build(NotificationLevel::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::build(NotificationLevel::Error, title, message)
    }

    pub fn with_category(mut self, category: NotificationCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl ResponsePayload {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error_code: None,
        }
    }

    pub fn error(message: impl Into<String>, code: Option<u16>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error_code: code,
        }
    }
}
