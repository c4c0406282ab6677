//! Mail-domain RADIUS gateway
//!
//! Answers RADIUS Access-Request packets for users of allow-listed mail
//! domains by logging in to an upstream SMTP submission server with the
//! supplied credentials. Built on the `radius-proto` codec.
//!
//! # Features
//!
//! - Async I/O with Tokio, one task per datagram
//! - Email-shaped usernames checked against a domain allow-list
//! - Pluggable credential verifiers (SMTP submission, in-memory)
//! - Observer interface for ready/outcome/error events
//! - JSON configuration and JSON-lines audit log
//!
//! # Example
//!
//! ```rust,no_run
//! use radius_gateway::{
//!     AllowList, RadiusGateway, ServerConfig, SmtpConfig, SmtpVerifier, TracingObserver,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let verifier = SmtpVerifier::new(SmtpConfig::default());
//!
//!     let config = ServerConfig::new(
//!         "0.0.0.0:1812".parse()?,
//!         b"s3cret".to_vec(),
//!         AllowList::parse("example.com"),
//!         Arc::new(verifier),
//!     );
//!
//!     let gateway = RadiusGateway::new(config, Arc::new(TracingObserver)).await?;
//!     gateway.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod config;
pub mod domain;
pub mod events;
pub mod handler;
pub mod server;
pub mod smtp;
pub mod verifier;

pub use audit::{AuditEntry, AuditEventType, AuditLogger};
pub use config::{Config, ConfigError, SmtpConfig, SmtpSecurity};
pub use domain::{domain_matches, domain_of, is_email, AllowList};
pub use events::{
    ChannelObserver, ErrorEvent, GatewayEvent, GatewayObserver, ObserverSet, OutcomeEvent,
    OutcomeReason, TracingObserver,
};
pub use handler::{AuthRequest, Decision, RequestError, RequestHandler};
pub use server::{GatewayError, RadiusGateway, ServerConfig};
pub use smtp::SmtpVerifier;
pub use verifier::{CredentialVerifier, StaticVerifier, VerificationResult};
