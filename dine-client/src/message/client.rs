use crate::ClientConfig;
use crate::message::transport::{MemoryTransport, TcpTransport, TlsTransport, Transport};
use crate::message::{MessageClientConfig, MessageError};
use shared::message::{
    BusMessage, EventType, HandshakePayload, PROTOCOL_VERSION, ResponsePayload,
};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// 连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Where the push channel lives
#[derive(Debug, Clone)]
pub enum PushTarget {
    Tcp {
        addr: String,
    },
    Tls {
        addr: String,
        domain: String,
    },
    /// In-process server, see [`MemoryTransport::new`]
    Memory {
        server_tx: broadcast::Sender<BusMessage>,
        client_tx: broadcast::Sender<BusMessage>,
    },
}

impl PushTarget {
    /// Push target described by the client configuration, if any
    pub fn from_config(config: &ClientConfig) -> Option<Self> {
        let addr = config.message_addr.clone()?;
        Some(match &config.message_tls_domain {
            Some(domain) => PushTarget::Tls {
                addr,
                domain: domain.clone(),
            },
            None => PushTarget::Tcp { addr },
        })
    }

    async fn connect(&self) -> Result<Arc<dyn Transport>, MessageError> {
        Ok(match self {
            PushTarget::Tcp { addr } => Arc::new(TcpTransport::connect(addr).await?),
            PushTarget::Tls { addr, domain } => {
                let tls = TlsTransport::default_tls_config()?;
                Arc::new(TlsTransport::connect(addr, domain, tls).await?)
            }
            PushTarget::Memory {
                server_tx,
                client_tx,
            } => Arc::new(MemoryTransport::new(server_tx, client_tx)),
        })
    }
}

/// Push channel client
///
/// Owns one logical connection and keeps it alive in a background task:
/// connect, handshake with the bearer token, forward every frame to
/// subscribers, and on loss reconnect with exponential backoff.
/// Connection transitions are published through a `watch` channel.
#[derive(Debug, Clone)]
pub struct MessageClient {
    event_tx: broadcast::Sender<BusMessage>,
    state_rx: watch::Receiver<ConnectionState>,
    current: Arc<Mutex<Option<Arc<dyn Transport>>>>,
    shutdown: CancellationToken,
}

impl MessageClient {
    /// Start the connection supervisor
    pub fn start(target: PushTarget, token: Option<String>, config: MessageClientConfig) -> Self {
        let (event_tx, _) = broadcast::channel(1024);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let client = Self {
            event_tx,
            state_rx,
            current: Arc::new(Mutex::new(None)),
            shutdown: CancellationToken::new(),
        };

        let supervisor = Supervisor {
            target,
            token,
            config,
            event_tx: client.event_tx.clone(),
            state_tx,
            current: client.current.clone(),
            shutdown: client.shutdown.clone(),
        };
        tokio::spawn(supervisor.run());

        client
    }

    /// Create in-memory client
    pub fn memory(
        server_broadcast_tx: &broadcast::Sender<BusMessage>,
        client_to_server_tx: &broadcast::Sender<BusMessage>,
        token: Option<String>,
    ) -> Self {
        Self::start(
            PushTarget::Memory {
                server_tx: server_broadcast_tx.clone(),
                client_tx: client_to_server_tx.clone(),
            },
            token,
            MessageClientConfig::default().with_heartbeat_interval(std::time::Duration::ZERO),
        )
    }

    /// Subscribe to every frame received after this call
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.event_tx.subscribe()
    }

    /// Observe connection transitions
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub fn is_connected(&self) -> bool {
        *self.state_rx.borrow() == ConnectionState::Connected
    }

    /// Send a message (Fire and Forget)
    pub async fn send(&self, msg: &BusMessage) -> Result<(), MessageError> {
        let transport = self.current.lock().await.clone();
        match transport {
            Some(t) => t.write_message(msg).await,
            None => Err(MessageError::Connection("Not connected".into())),
        }
    }

    /// Stop reconnecting and close the current connection
    pub async fn close(&self) -> Result<(), MessageError> {
        self.shutdown.cancel();
        let transport = self.current.lock().await.take();
        if let Some(t) = transport {
            t.close().await?;
        }
        Ok(())
    }
}

struct Supervisor {
    target: PushTarget,
    token: Option<String>,
    config: MessageClientConfig,
    event_tx: broadcast::Sender<BusMessage>,
    state_tx: watch::Sender<ConnectionState>,
    current: Arc<Mutex<Option<Arc<dyn Transport>>>>,
    shutdown: CancellationToken,
}

impl Supervisor {
    async fn run(self) {
        let mut attempt = 0u32;

        loop {
            let _ = self.state_tx.send(ConnectionState::Connecting);

            let outcome = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                result = self.connect() => result,
            };

            match outcome {
                Ok((transport, handshake_id)) => {
                    attempt = 0;
                    *self.current.lock().await = Some(transport.clone());
                    let _ = self.state_tx.send(ConnectionState::Connected);
                    tracing::info!("Push channel connected");

                    let heartbeat = self.spawn_heartbeat(transport.clone());
                    let result = tokio::select! {
                        _ = self.shutdown.cancelled() => Ok(()),
                        result = self.read_loop(transport.as_ref(), handshake_id) => result,
                    };
                    heartbeat.cancel();
                    self.current.lock().await.take();

                    if let Err(e) = result {
                        tracing::warn!("Push channel lost: {}", e);
                    }
                }
                Err(e) => tracing::warn!("Push channel connect failed: {}", e),
            }

            let _ = self.state_tx.send(ConnectionState::Disconnected);
            if self.shutdown.is_cancelled() || !self.config.auto_reconnect {
                break;
            }

            attempt += 1;
            if self.config.max_reconnect_attempts > 0 && attempt > self.config.max_reconnect_attempts
            {
                tracing::error!(attempts = attempt - 1, "Push channel gave up reconnecting");
                break;
            }

            let delay = self.config.backoff(attempt);
            tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting push channel");
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let _ = self.state_tx.send(ConnectionState::Disconnected);
    }

    async fn connect(&self) -> Result<(Arc<dyn Transport>, Uuid), MessageError> {
        let transport = tokio::time::timeout(self.config.request_timeout, self.target.connect())
            .await
            .map_err(|_| MessageError::Timeout("connect".into()))??;

        // 🤝 Perform Handshake
        let payload = HandshakePayload {
            version: PROTOCOL_VERSION,
            client_name: Some(self.config.client_name.clone()),
            client_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            client_id: Some(Uuid::new_v4().to_string()),
            token: self.token.clone(),
        };
        let handshake = BusMessage::handshake(&payload)
            .map_err(|e| MessageError::InvalidMessage(e.to_string()))?;
        transport.write_message(&handshake).await?;

        Ok((transport, handshake.request_id))
    }

    /// Forward frames until the transport fails or the server rejects the handshake
    async fn read_loop(&self, transport: &dyn Transport, handshake_id: Uuid) -> Result<(), MessageError> {
        loop {
            let msg = transport.read_message().await?;
            match msg.event_type {
                EventType::Heartbeat => {
                    tracing::trace!("Heartbeat from server");
                    continue;
                }
                EventType::Response if msg.correlation_id == Some(handshake_id) => {
                    let reply: ResponsePayload = msg
                        .parse_payload()
                        .map_err(|e| MessageError::InvalidMessage(e.to_string()))?;
                    if !reply.success {
                        return Err(MessageError::Handshake(reply.message));
                    }
                }
                _ => {}
            }

            if let Err(e) = self.event_tx.send(msg) {
                tracing::debug!("No subscribers for event: {}", e);
            }
        }
    }

    fn spawn_heartbeat(&self, transport: Arc<dyn Transport>) -> CancellationToken {
        let stop = self.shutdown.child_token();
        let interval = self.config.heartbeat_interval;
        if interval.is_zero() {
            return stop;
        }

        let token = stop.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = transport.write_message(&BusMessage::heartbeat()).await {
                            tracing::debug!("Heartbeat write failed: {}", e);
                            break;
                        }
                    }
                }
            }
        });
        stop
    }
}
