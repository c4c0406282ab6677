use crate::config::{Config, ConfigError};
use crate::domain::AllowList;
use crate::events::GatewayObserver;
use crate::handler::RequestHandler;
use crate::verifier::CredentialVerifier;
use radius_proto::Packet;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Immutable runtime configuration shared by every request task
pub struct ServerConfig {
    /// Bind address; its family selects an IPv4 or IPv6 socket
    pub bind_addr: SocketAddr,
    /// Shared secret for all RADIUS clients
    pub secret: Vec<u8>,
    /// Accepted mail domains
    pub allow_list: AllowList,
    /// Upstream credential check
    pub verifier: Arc<dyn CredentialVerifier>,
}

impl ServerConfig {
    pub fn new(
        bind_addr: SocketAddr,
        secret: impl Into<Vec<u8>>,
        allow_list: AllowList,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Self {
        ServerConfig {
            bind_addr,
            secret: secret.into(),
            allow_list,
            verifier,
        }
    }

    /// Build from a loaded configuration file
    pub fn from_config(
        config: &Config,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Result<Self, ConfigError> {
        Ok(ServerConfig::new(
            config.socket_addr()?,
            config.secret.clone().into_bytes(),
            config.allow_list(),
            verifier,
        ))
    }
}

/// Errors from `recv_from` that concern a single peer, not the socket
fn is_transient(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset | ErrorKind::ConnectionRefused | ErrorKind::Interrupted
    )
}

/// RADIUS gateway: owns the UDP socket and runs one task per datagram
pub struct RadiusGateway {
    handler: Arc<RequestHandler>,
    socket: Arc<UdpSocket>,
    observer: Arc<dyn GatewayObserver>,
}

impl RadiusGateway {
    /// Bind the socket
    pub async fn new(
        config: ServerConfig,
        observer: Arc<dyn GatewayObserver>,
    ) -> Result<Self, GatewayError> {
        let socket = UdpSocket::bind(config.bind_addr).await?;
        info!(
            bind_addr = %config.bind_addr,
            allowed_domains = %config.allow_list,
            "RADIUS gateway socket bound"
        );

        let handler = RequestHandler::new(Arc::new(config), Arc::clone(&observer));
        Ok(RadiusGateway {
            handler: Arc::new(handler),
            socket: Arc::new(socket),
            observer,
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr, GatewayError> {
        self.socket.local_addr().map_err(GatewayError::from)
    }

    /// Announce readiness, then serve datagrams until the task is dropped
    ///
    /// Datagrams are handled concurrently; responses may leave in a
    /// different order than requests arrived.
    pub async fn run(&self) -> Result<(), GatewayError> {
        self.observer.on_ready(self.local_addr()?).await;

        let mut buf = vec![0u8; Packet::MAX_PACKET_SIZE];
        loop {
            let (len, addr) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) if is_transient(e.kind()) => {
                    debug!(error = %e, "Ignoring transient receive error");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let data = buf[..len].to_vec();

            let handler = Arc::clone(&self.handler);
            let socket = Arc::clone(&self.socket);
            tokio::spawn(async move {
                handler.handle(&data, addr, &socket).await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ChannelObserver, GatewayEvent};
    use crate::verifier::StaticVerifier;

    #[test]
    fn test_server_config_from_config() {
        let mut config = Config::default();
        config.listen_address = "::1".to_string();
        config.listen_port = 11812;
        config.allowed_domains = "example.com,example.org".to_string();

        let server_config =
            ServerConfig::from_config(&config, Arc::new(StaticVerifier::new())).unwrap();
        assert!(server_config.bind_addr.is_ipv6());
        assert_eq!(server_config.bind_addr.port(), 11812);
        assert_eq!(server_config.secret, b"testing123");
        assert_eq!(server_config.allow_list.domains().len(), 2);
    }

    #[test]
    fn test_transient_errors() {
        assert!(is_transient(ErrorKind::ConnectionReset));
        assert!(!is_transient(ErrorKind::PermissionDenied));
    }

    #[tokio::test]
    async fn test_run_announces_ready() {
        let config = ServerConfig::new(
            "127.0.0.1:0".parse().unwrap(),
            "s3cret",
            AllowList::parse("example.com"),
            Arc::new(StaticVerifier::new()),
        );
        let (observer, mut rx) = ChannelObserver::new();
        let gateway = RadiusGateway::new(config, Arc::new(observer)).await.unwrap();
        let addr = gateway.local_addr().unwrap();
        assert_ne!(addr.port(), 0);

        tokio::spawn(async move { gateway.run().await });
        assert_eq!(rx.recv().await, Some(GatewayEvent::Ready(addr)));
    }
}
