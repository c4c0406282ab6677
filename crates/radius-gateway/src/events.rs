//! Gateway events and the observers that consume them
//!
//! The server reports three things to its embedder: that it is listening,
//! the outcome of every answered Access-Request, and every per-packet error.
//! Observers are handed to the server at construction.

use async_trait::async_trait;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Why an Access-Request ended the way it did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeReason {
    Accepted,
    InvalidUsername,
    DomainNotAllowed,
    MissingPassword,
    CredentialsRejected,
    /// The verifier could not reach a decision; detail from the verifier
    VerifierError(String),
}

impl fmt::Display for OutcomeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeReason::Accepted => f.write_str("accepted"),
            OutcomeReason::InvalidUsername => f.write_str("invalid username"),
            OutcomeReason::DomainNotAllowed => f.write_str("domain not allowed"),
            OutcomeReason::MissingPassword => f.write_str("missing password"),
            OutcomeReason::CredentialsRejected => f.write_str("credentials rejected"),
            OutcomeReason::VerifierError(detail) => write!(f, "verifier error: {}", detail),
        }
    }
}

/// Emitted once for every Access-Request that was answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeEvent {
    pub username: String,
    /// `None` when the username was not an email address
    pub domain: Option<String>,
    pub status: bool,
    pub reason: OutcomeReason,
    pub client_addr: SocketAddr,
    pub request_id: u8,
}

/// Emitted for undecodable packets and for rejected usernames or domains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    pub message: String,
    pub client_addr: SocketAddr,
}

impl ErrorEvent {
    pub fn new(client_addr: SocketAddr, message: impl Into<String>) -> Self {
        ErrorEvent {
            message: message.into(),
            client_addr,
        }
    }
}

/// Every event, as delivered by [`ChannelObserver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    Ready(SocketAddr),
    Outcome(OutcomeEvent),
    Error(ErrorEvent),
}

/// Receives gateway events
///
/// Calls for different datagrams may arrive concurrently and in any order.
#[async_trait]
pub trait GatewayObserver: Send + Sync {
    async fn on_ready(&self, _addr: SocketAddr) {}

    async fn on_outcome(&self, _event: &OutcomeEvent) {}

    async fn on_error(&self, _event: &ErrorEvent) {}
}

/// Writes events to the `tracing` log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

#[async_trait]
impl GatewayObserver for TracingObserver {
    async fn on_ready(&self, addr: SocketAddr) {
        info!(listen_addr = %addr, "RADIUS gateway listening");
    }

    async fn on_outcome(&self, event: &OutcomeEvent) {
        if event.status {
            info!(
                username = %event.username,
                client_addr = %event.client_addr,
                request_id = event.request_id,
                "Authentication successful"
            );
        } else {
            warn!(
                username = %event.username,
                client_addr = %event.client_addr,
                request_id = event.request_id,
                reason = %event.reason,
                "Authentication failed"
            );
        }
    }

    async fn on_error(&self, event: &ErrorEvent) {
        warn!(client_addr = %event.client_addr, "{}", event.message);
    }
}

/// Forwards events into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<GatewayEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<GatewayEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelObserver { tx }, rx)
    }

    fn send(&self, event: GatewayEvent) {
        // A dropped receiver just means nobody is listening anymore
        let _ = self.tx.send(event);
    }
}

#[async_trait]
impl GatewayObserver for ChannelObserver {
    async fn on_ready(&self, addr: SocketAddr) {
        self.send(GatewayEvent::Ready(addr));
    }

    async fn on_outcome(&self, event: &OutcomeEvent) {
        self.send(GatewayEvent::Outcome(event.clone()));
    }

    async fn on_error(&self, event: &ErrorEvent) {
        self.send(GatewayEvent::Error(event.clone()));
    }
}

/// Fans each event out to several observers, in insertion order
#[derive(Default, Clone)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn GatewayObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn GatewayObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

#[async_trait]
impl GatewayObserver for ObserverSet {
    async fn on_ready(&self, addr: SocketAddr) {
        for observer in &self.observers {
            observer.on_ready(addr).await;
        }
    }

    async fn on_outcome(&self, event: &OutcomeEvent) {
        for observer in &self.observers {
            observer.on_outcome(event).await;
        }
    }

    async fn on_error(&self, event: &ErrorEvent) {
        for observer in &self.observers {
            observer.on_error(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "192.0.2.10:40000".parse().unwrap()
    }

    fn outcome() -> OutcomeEvent {
        OutcomeEvent {
            username: "alice@example.com".to_string(),
            domain: Some("example.com".to_string()),
            status: true,
            reason: OutcomeReason::Accepted,
            client_addr: addr(),
            request_id: 1,
        }
    }

    #[tokio::test]
    async fn test_channel_observer() {
        let (observer, mut rx) = ChannelObserver::new();
        observer.on_ready(addr()).await;
        observer.on_outcome(&outcome()).await;
        observer.on_error(&ErrorEvent::new(addr(), "boom")).await;

        assert_eq!(rx.recv().await, Some(GatewayEvent::Ready(addr())));
        assert_eq!(rx.recv().await, Some(GatewayEvent::Outcome(outcome())));
        assert_eq!(
            rx.recv().await,
            Some(GatewayEvent::Error(ErrorEvent::new(addr(), "boom")))
        );
    }

    #[tokio::test]
    async fn test_channel_observer_without_receiver() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.on_outcome(&outcome()).await;
    }

    #[tokio::test]
    async fn test_observer_set_fans_out() {
        let (first, mut rx1) = ChannelObserver::new();
        let (second, mut rx2) = ChannelObserver::new();
        let set = ObserverSet::new()
            .with(Arc::new(first))
            .with(Arc::new(TracingObserver))
            .with(Arc::new(second));
        assert_eq!(set.len(), 3);

        set.on_error(&ErrorEvent::new(addr(), "bad packet")).await;
        assert!(matches!(rx1.recv().await, Some(GatewayEvent::Error(_))));
        assert!(matches!(rx2.recv().await, Some(GatewayEvent::Error(_))));
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(
            OutcomeReason::VerifierError("timed out".into()).to_string(),
            "verifier error: timed out"
        );
    }
}
