//! Per-datagram Access-Request pipeline
//!
//! decode → code check → extract → username shape → domain allow-list →
//! credential check → encode and send → outcome event.
//!
//! Packets that cannot be decoded, or that are not Access-Requests, are only
//! reported: they get no response and no outcome event. Every decoded
//! Access-Request gets exactly one response and exactly one outcome event,
//! the latter emitted after the send.

use crate::domain::{domain_of, is_email};
use crate::events::{ErrorEvent, GatewayObserver, OutcomeEvent, OutcomeReason};
use crate::server::ServerConfig;
use crate::verifier::VerificationResult;
use radius_proto::{
    decrypt_user_password, verify_message_authenticator, AttributeType, Code, Packet,
    PacketError, PasswordError,
};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::debug;

/// Per-datagram failures, reported through [`ErrorEvent`]s
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Malformed RADIUS packet: {0}")]
    Packet(#[from] PacketError),
    #[error("Packet is not an Access-Request ({0})")]
    NotAccessRequest(Code),
    #[error("Invalid Message-Authenticator (shared secret mismatch?)")]
    MessageAuthenticator,
    #[error("Cannot recover User-Password: {0}")]
    Password(#[from] PasswordError),
    #[error("Username {0:?} is not a valid email address")]
    InvalidUsername(String),
    #[error("{domain} is not in an accepted domain (accepted: {allowed})")]
    DomainNotAllowed { domain: String, allowed: String },
    #[error("Access-Request for {0} carries no User-Password")]
    MissingPassword(String),
}

/// A decoded Access-Request
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// User-Name, empty when absent
    pub username: String,
    /// Recovered User-Password, `None` when absent
    pub password: Option<String>,
    pub source: SocketAddr,
    /// The request as decoded; responses are correlated against it
    pub packet: Packet,
}

impl AuthRequest {
    pub fn domain(&self) -> Option<&str> {
        domain_of(&self.username)
    }

    pub fn identifier(&self) -> u8 {
        self.packet.identifier
    }
}

/// Response code plus the outcome to report once it has been sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub code: Code,
    pub outcome: OutcomeEvent,
}

pub struct RequestHandler {
    config: Arc<ServerConfig>,
    observer: Arc<dyn GatewayObserver>,
}

impl RequestHandler {
    pub fn new(config: Arc<ServerConfig>, observer: Arc<dyn GatewayObserver>) -> Self {
        RequestHandler { config, observer }
    }

    /// Decode and check a datagram, recovering the User-Password
    pub fn decode(&self, data: &[u8], source: SocketAddr) -> Result<AuthRequest, RequestError> {
        let packet = Packet::decode(data)?;

        if packet.code != Code::AccessRequest {
            return Err(RequestError::NotAccessRequest(packet.code));
        }

        let secret = self.config.secret.as_slice();
        let msg_auth = AttributeType::MessageAuthenticator as u8;
        if let Some(attr) = packet.find_attribute(msg_auth) {
            let valid = attr.value.len() == 16
                && packet.attribute_offset(msg_auth).is_some_and(|offset| {
                    verify_message_authenticator(&data[..packet.length()], secret, offset)
                });
            if !valid {
                return Err(RequestError::MessageAuthenticator);
            }
        }

        let username = packet
            .find_attribute(AttributeType::UserName as u8)
            .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
            .unwrap_or_default();

        let password = match packet.find_attribute(AttributeType::UserPassword as u8) {
            Some(attr) => Some(decrypt_user_password(
                &attr.value,
                secret,
                &packet.authenticator,
            )?),
            None => None,
        };

        Ok(AuthRequest {
            username,
            password,
            source,
            packet,
        })
    }

    async fn report(&self, source: SocketAddr, error: &RequestError) {
        self.observer
            .on_error(&ErrorEvent::new(source, error.to_string()))
            .await;
    }

    fn reject(request: &AuthRequest, domain: Option<String>, reason: OutcomeReason) -> Decision {
        Decision {
            code: Code::AccessReject,
            outcome: OutcomeEvent {
                username: request.username.clone(),
                domain,
                status: false,
                reason,
                client_addr: request.source,
                request_id: request.identifier(),
            },
        }
    }

    /// Decide Accept or Reject, reporting validation failures as they occur
    pub async fn authorize(&self, request: &AuthRequest) -> Decision {
        if !is_email(&request.username) {
            let error = RequestError::InvalidUsername(request.username.clone());
            self.report(request.source, &error).await;
            return Self::reject(request, None, OutcomeReason::InvalidUsername);
        }

        let domain = request.domain().unwrap_or_default().to_string();
        let allow_list = &self.config.allow_list;
        if !allow_list.matches(&domain) {
            let error = RequestError::DomainNotAllowed {
                domain: domain.clone(),
                allowed: allow_list.to_string(),
            };
            self.report(request.source, &error).await;
            return Self::reject(request, Some(domain), OutcomeReason::DomainNotAllowed);
        }

        let Some(password) = request.password.as_deref() else {
            let error = RequestError::MissingPassword(request.username.clone());
            self.report(request.source, &error).await;
            return Self::reject(request, Some(domain), OutcomeReason::MissingPassword);
        };

        debug!(
            username = %request.username,
            client_addr = %request.source,
            request_id = request.identifier(),
            "Verifying credentials upstream"
        );

        // Identity fields always come from the request, never from the verifier
        match self.config.verifier.verify(&request.username, password).await {
            VerificationResult::Accepted => Decision {
                code: Code::AccessAccept,
                outcome: OutcomeEvent {
                    username: request.username.clone(),
                    domain: Some(domain),
                    status: true,
                    reason: OutcomeReason::Accepted,
                    client_addr: request.source,
                    request_id: request.identifier(),
                },
            },
            VerificationResult::Rejected => {
                Self::reject(request, Some(domain), OutcomeReason::CredentialsRejected)
            }
            VerificationResult::TransportError(detail) => {
                Self::reject(request, Some(domain), OutcomeReason::VerifierError(detail))
            }
        }
    }

    /// Encode a signed response to `request`
    pub fn build_response(&self, request: &AuthRequest, code: Code) -> Result<Vec<u8>, PacketError> {
        let mut response = Packet::reply_to(&request.packet, code);
        response.sign_response(&request.packet, &self.config.secret)?;
        response.encode()
    }

    async fn respond(&self, request: &AuthRequest, decision: Decision, socket: &UdpSocket) {
        match self.build_response(request, decision.code) {
            Ok(bytes) => match socket.send_to(&bytes, request.source).await {
                Ok(_) => debug!(
                    response_type = %decision.code,
                    client_addr = %request.source,
                    request_id = request.identifier(),
                    "Sent RADIUS response"
                ),
                Err(e) => debug!(
                    client_addr = %request.source,
                    error = %e,
                    "Failed to send RADIUS response"
                ),
            },
            Err(e) => self.report(request.source, &RequestError::Packet(e)).await,
        }

        self.observer.on_outcome(&decision.outcome).await;
    }

    /// Run the whole pipeline for one datagram
    pub async fn handle(&self, data: &[u8], source: SocketAddr, socket: &UdpSocket) {
        let request = match self.decode(data, source) {
            Ok(request) => request,
            Err(e) => {
                self.report(source, &e).await;
                return;
            }
        };

        debug!(
            username = %request.username,
            client_addr = %source,
            request_id = request.identifier(),
            "Received Access-Request"
        );

        let decision = self.authorize(&request).await;
        self.respond(&request, decision, socket).await;
    }
}
