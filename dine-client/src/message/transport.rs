use async_trait::async_trait;
use rustls::ClientConfig;
use rustls_pki_types::ServerName;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, broadcast};
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use crate::message::MessageError;
use shared::message::{BusMessage, FRAME_HEADER_LEN, FrameHeader};

/// Transport abstraction for the push channel
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn read_message(&self) -> Result<BusMessage, MessageError>;
    async fn write_message(&self, msg: &BusMessage) -> Result<(), MessageError>;
    async fn close(&self) -> Result<(), MessageError>;
}

/// Read one frame: fixed header, then exactly `payload_len` bytes
async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<BusMessage, MessageError> {
    let mut header_buf = [0u8; FRAME_HEADER_LEN];
    reader.read_exact(&mut header_buf).await?;

    let header = FrameHeader::decode(&header_buf)
        .map_err(|e| MessageError::InvalidMessage(e.to_string()))?;

    let mut payload = vec![0u8; header.payload_len];
    reader.read_exact(&mut payload).await?;

    Ok(header.into_message(payload))
}

async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    msg: &BusMessage,
) -> Result<(), MessageError> {
    writer.write_all(&msg.to_frame()).await?;
    writer.flush().await?;
    Ok(())
}

/// TCP Transport Implementation
#[derive(Debug, Clone)]
pub struct TcpTransport {
    reader: Arc<Mutex<OwnedReadHalf>>,
    writer: Arc<Mutex<OwnedWriteHalf>>,
}

impl TcpTransport {
    pub async fn connect(addr: &str) -> Result<Self, MessageError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| MessageError::Connection(format!("{}: {}", addr, e)))?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: Arc::new(Mutex::new(reader)),
            writer: Arc::new(Mutex::new(writer)),
        })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn read_message(&self) -> Result<BusMessage, MessageError> {
        let mut reader = self.reader.lock().await;
        read_frame(&mut *reader).await
    }

    async fn write_message(&self, msg: &BusMessage) -> Result<(), MessageError> {
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, msg).await
    }

    async fn close(&self) -> Result<(), MessageError> {
        let mut writer = self.writer.lock().await;
        writer.shutdown().await?;
        Ok(())
    }
}

/// TLS Transport Implementation
#[derive(Debug, Clone)]
pub struct TlsTransport {
    reader: Arc<Mutex<tokio::io::ReadHalf<TlsStream<TcpStream>>>>,
    writer: Arc<Mutex<tokio::io::WriteHalf<TlsStream<TcpStream>>>>,
}

impl TlsTransport {
    pub async fn connect(
        addr: &str,
        domain: &str,
        config: ClientConfig,
    ) -> Result<Self, MessageError> {
        let connector = TlsConnector::from(Arc::new(config));
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| MessageError::Connection(format!("{}: {}", addr, e)))?;

        let domain = ServerName::try_from(domain)
            .map_err(|e| MessageError::Connection(format!("Invalid domain: {}", e)))?
            .to_owned();

        let stream = connector
            .connect(domain, stream)
            .await
            .map_err(|e| MessageError::Connection(format!("TLS handshake failed: {}", e)))?;

        let (reader, writer) = tokio::io::split(stream);

        Ok(Self {
            reader: Arc::new(Mutex::new(reader)),
            writer: Arc::new(Mutex::new(writer)),
        })
    }

    /// rustls config trusting the public web PKI roots
    pub fn default_tls_config() -> Result<ClientConfig, MessageError> {
        let roots = rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| MessageError::Connection(format!("TLS config: {}", e)))?
            .with_root_certificates(roots)
            .with_no_client_auth();
        Ok(config)
    }
}

#[async_trait]
impl Transport for TlsTransport {
    async fn read_message(&self) -> Result<BusMessage, MessageError> {
        let mut reader = self.reader.lock().await;
        read_frame(&mut *reader).await
    }

    async fn write_message(&self, msg: &BusMessage) -> Result<(), MessageError> {
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, msg).await
    }

    async fn close(&self) -> Result<(), MessageError> {
        let mut writer = self.writer.lock().await;
        writer.shutdown().await?;
        Ok(())
    }
}

/// Memory Transport Implementation (for In-Process communication)
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    /// Receiver for messages FROM server (broadcasts)
    rx: Arc<Mutex<broadcast::Receiver<BusMessage>>>,
    /// Sender for messages TO server
    tx: broadcast::Sender<BusMessage>,
}

impl MemoryTransport {
    /// Create a new memory transport
    ///
    /// # Arguments
    /// * `server_broadcast_tx` - The server's broadcast sender (to subscribe to updates)
    /// * `client_to_server_tx` - The channel to send messages TO the server
    pub fn new(
        server_broadcast_tx: &broadcast::Sender<BusMessage>,
        client_to_server_tx: &broadcast::Sender<BusMessage>,
    ) -> Self {
        Self {
            rx: Arc::new(Mutex::new(server_broadcast_tx.subscribe())),
            tx: client_to_server_tx.clone(),
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn read_message(&self) -> Result<BusMessage, MessageError> {
        let mut rx = self.rx.lock().await;
        loop {
            match rx.recv().await {
                Ok(msg) => return Ok(msg),
                // 落后的消息只是失效信号, 丢弃后继续
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Memory transport lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(MessageError::Connection("Memory channel closed".into()));
                }
            }
        }
    }

    async fn write_message(&self, msg: &BusMessage) -> Result<(), MessageError> {
        // 服务端未订阅时消息直接丢弃, 与网络推送语义一致
        if self.tx.send(msg.clone()).is_err() {
            tracing::debug!(event = %msg.event_type, "No server receiver for memory transport");
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), MessageError> {
        Ok(())
    }
}
