//! 推送通道消息类型定义
//!
//! Frames exchanged between the ordering backend's push channel and its
//! clients, for both in-process (memory) and network (TCP/TLS) transports.
//!
//! Wire layout of one frame:
//!
//! ```text
//! [event_type: u8][request_id: 16][correlation_id: 16][len: u32 LE][payload: len]
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use uuid::Uuid;

pub mod payload;
pub use payload::*;

/// 协议版本号
pub const PROTOCOL_VERSION: u16 = 1;

/// Size of the fixed frame header in bytes
pub const FRAME_HEADER_LEN: usize = 1 + 16 + 16 + 4;

/// Upper bound on a single payload; larger frames are rejected as corrupt
pub const MAX_PAYLOAD_LEN: usize = 4 * 1024 * 1024;

/// 推送事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// 握手消息
    Handshake = 0,
    /// 系统通知
    Notification = 1,
    /// 同步信号 (资源失效)
    Sync = 2,
    /// 请求响应
    Response = 3,
    /// 心跳
    Heartbeat = 4,
}

impl TryFrom<u8> for EventType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventType::Handshake),
            1 => Ok(EventType::Notification),
            2 => Ok(EventType::Sync),
            3 => Ok(EventType::Response),
            4 => Ok(EventType::Heartbeat),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Handshake => write!(f, "handshake"),
            EventType::Notification => write!(f, "notification"),
            EventType::Sync => write!(f, "sync"),
            EventType::Response => write!(f, "response"),
            EventType::Heartbeat => write!(f, "heartbeat"),
        }
    }
}

/// Typed message before it is flattened into a [`BusMessage`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message<T> {
    pub event_type: EventType,
    pub data: T,
    pub request_id: Uuid,
    pub correlation_id: Option<Uuid>,
}

impl<T> Message<T> {
    /// 创建新消息
    pub fn new(event_type: EventType, data: T) -> Self {
        Self {
            event_type,
            data,
            request_id: Uuid::new_v4(),
            correlation_id: None,
        }
    }

    /// 获取业务数据
    pub fn data(&self) -> &T {
        &self.data
    }

    /// 转换为BusMessage用于传输
    pub fn into_bus_message(self) -> Result<BusMessage, serde_json::Error>
    where
        T: Serialize,
    {
        Ok(BusMessage {
            request_id: self.request_id,
            event_type: self.event_type,
            correlation_id: self.correlation_id,
            payload: serde_json::to_vec(&self.data)?,
        })
    }
}

/// 便利的类型别名
pub type NotificationMessage = Message<NotificationPayload>;
pub type SyncMessage = Message<SyncPayload>;

/// 推送通道消息体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub request_id: Uuid,
    pub event_type: EventType,
    pub correlation_id: Option<Uuid>,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(event_type: EventType, payload: Vec<u8>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            event_type,
            correlation_id: None,
            payload,
        }
    }

    /// 设置关联 ID (用于响应)
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    fn encode<T: Serialize>(event_type: EventType, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(event_type, serde_json::to_vec(payload)?))
    }

    /// 创建握手消息
    pub fn handshake(payload: &HandshakePayload) -> Result<Self, serde_json::Error> {
        Self::encode(EventType::Handshake, payload)
    }

    /// 创建通知消息
    pub fn notification(payload: &NotificationPayload) -> Result<Self, serde_json::Error> {
        Self::encode(EventType::Notification, payload)
    }

    /// 创建同步信号消息
    pub fn sync(payload: &SyncPayload) -> Result<Self, serde_json::Error> {
        Self::encode(EventType::Sync, payload)
    }

    /// 创建响应消息
    pub fn response(payload: &ResponsePayload) -> Result<Self, serde_json::Error> {
        Self::encode(EventType::Response, payload)
    }

    /// 创建心跳消息 (空载荷)
    pub fn heartbeat() -> Self {
        Self::new(EventType::Heartbeat, Vec::new())
    }

    /// 解析载荷为指定类型
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    /// Encode into the binary frame layout
    pub fn to_frame(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(FRAME_HEADER_LEN + self.payload.len());
        data.push(self.event_type as u8);
        data.extend_from_slice(self.request_id.as_bytes());
        // nil UUID encodes "no correlation"
        let correlation = self.correlation_id.unwrap_or(Uuid::nil());
        data.extend_from_slice(correlation.as_bytes());
        data.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        data.extend_from_slice(&self.payload);
        data
    }
}

/// Decoded frame header, see [`BusMessage::to_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub event_type: EventType,
    pub request_id: Uuid,
    pub correlation_id: Option<Uuid>,
    pub payload_len: usize,
}

/// Frame header could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("invalid event type: {0}")]
    InvalidEventType(u8),
    #[error("payload too large: {0} bytes")]
    PayloadTooLarge(usize),
}

impl FrameHeader {
    pub fn decode(buf: &[u8; FRAME_HEADER_LEN]) -> Result<Self, FrameError> {
        let event_type = EventType::try_from(buf[0]).map_err(|_| FrameError::InvalidEventType(buf[0]))?;

        let mut uuid_buf = [0u8; 16];
        uuid_buf.copy_from_slice(&buf[1..17]);
        let request_id = Uuid::from_bytes(uuid_buf);

        uuid_buf.copy_from_slice(&buf[17..33]);
        let correlation_raw = Uuid::from_bytes(uuid_buf);
        let correlation_id = (!correlation_raw.is_nil()).then_some(correlation_raw);

        let mut len_buf = [0u8; 4];
        len_buf.copy_from_slice(&buf[33..37]);
        let payload_len = u32::from_le_bytes(len_buf) as usize;
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLarge(payload_len));
        }

        Ok(Self {
            event_type,
            request_id,
            correlation_id,
            payload_len,
        })
    }

    pub fn into_message(self, payload: Vec<u8>) -> BusMessage {
        BusMessage {
            request_id: self.request_id,
            event_type: self.event_type,
            correlation_id: self.correlation_id,
            payload,
        }
    }
}
