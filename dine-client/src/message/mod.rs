// dine-client/src/message/mod.rs
// 推送通道模块 - 客户端配置和错误类型

pub mod client;
pub mod transport;

pub use client::{ConnectionState, MessageClient, PushTarget};
pub use shared::message::{BusMessage, EventType};

use std::time::Duration;
use thiserror::Error;

/// 推送通道错误
#[derive(Debug, Error)]
pub enum MessageError {
    /// 连接失败或已断开
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 帧或载荷无法解析
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    /// 服务端拒绝握手 (版本或凭证)
    #[error("Handshake rejected: {0}")]
    Handshake(String),
}

/// 推送客户端配置
#[derive(Debug, Clone)]
pub struct MessageClientConfig {
    /// 握手应答等待时间
    pub request_timeout: Duration,
    /// 是否启用自动重连
    pub auto_reconnect: bool,
    /// 重连延迟
    pub reconnect_delay: Duration,
    /// 最大重连延迟 (指数退避上限)
    pub max_reconnect_delay: Duration,
    /// 最大重连尝试次数 (0 表示无限重试)
    pub max_reconnect_attempts: u32,
    /// 心跳间隔 (0 表示禁用)
    pub heartbeat_interval: Duration,
    /// Client name announced in the handshake
    pub client_name: String,
}

impl Default for MessageClientConfig {
    /// 局域网优化配置
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(3),
            auto_reconnect: true,
            reconnect_delay: Duration::from_millis(500),
            max_reconnect_delay: Duration::from_secs(10),
            max_reconnect_attempts: 0,
            heartbeat_interval: Duration::from_secs(5),
            client_name: "dine-client".to_string(),
        }
    }
}

impl MessageClientConfig {
    /// 创建默认配置 (局域网优化)
    pub fn new() -> Self {
        Self::default()
    }

    /// 局域网配置 (默认)
    pub fn lan() -> Self {
        Self::default()
    }

    /// 广域网/互联网配置
    ///
    /// 容忍高延迟，退避上限 60 秒
    pub fn wan() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(60),
            heartbeat_interval: Duration::from_secs(30),
            ..Self::default()
        }
    }

    /// 设置握手超时
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// 设置自动重连
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// 设置首次重连延迟
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// 设置心跳间隔 (0 表示禁用)
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// 设置最大重连尝试次数 (0 表示无限重试)
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    /// Delay before reconnect attempt `attempt` (1-based), doubling up to the cap
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.reconnect_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_reconnect_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = MessageClientConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(5));
        assert!(config.auto_reconnect);
        assert_eq!(config.max_reconnect_attempts, 0);
    }

    #[test]
    fn test_config_builder() {
        let config = MessageClientConfig::wan()
            .with_request_timeout(Duration::from_secs(60))
            .with_auto_reconnect(false)
            .with_client_name("kds-1");

        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.max_reconnect_delay, Duration::from_secs(60));
        assert!(!config.auto_reconnect);
        assert_eq!(config.client_name, "kds-1");
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = MessageClientConfig::lan();
        assert_eq!(config.backoff(1), Duration::from_millis(500));
        assert_eq!(config.backoff(2), Duration::from_secs(1));
        assert_eq!(config.backoff(3), Duration::from_secs(2));
        assert_eq!(config.backoff(10), Duration::from_secs(10));
        assert_eq!(config.backoff(100), Duration::from_secs(10));
    }
}
