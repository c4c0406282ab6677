//! Audit logging for gateway decisions
//!
//! One JSON object per line for every accept, reject and packet error, for
//! security review after the fact.

use crate::events::{ErrorEvent, GatewayObserver, OutcomeEvent};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    ServerStart,
    AuthSuccess,
    AuthFailure,
    RequestError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unix epoch seconds
    pub timestamp: u64,
    /// ISO 8601
    pub timestamp_iso: String,
    pub event_type: AuditEventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub server_version: String,
}

impl AuditEntry {
    pub fn new(event_type: AuditEventType) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let timestamp_iso = chrono::DateTime::from_timestamp(timestamp as i64, 0)
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .unwrap_or_else(|| "unknown".to_string());

        AuditEntry {
            timestamp,
            timestamp_iso,
            event_type,
            username: None,
            domain: None,
            client_addr: None,
            request_id: None,
            details: None,
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_client_addr(mut self, addr: SocketAddr) -> Self {
        self.client_addr = Some(addr.to_string());
        self
    }

    pub fn with_request_id(mut self, id: u8) -> Self {
        self.request_id = Some(id);
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<&OutcomeEvent> for AuditEntry {
    fn from(event: &OutcomeEvent) -> Self {
        let event_type = if event.status {
            AuditEventType::AuthSuccess
        } else {
            AuditEventType::AuthFailure
        };
        AuditEntry::new(event_type)
            .with_username(&event.username)
            .with_domain(event.domain.clone())
            .with_client_addr(event.client_addr)
            .with_request_id(event.request_id)
            .with_details(event.reason.to_string())
    }
}

/// Appends audit entries to a file; a logger without a path is a no-op
pub struct AuditLogger {
    file_path: Option<String>,
    file: Option<Arc<Mutex<std::fs::File>>>,
}

impl AuditLogger {
    pub fn new(file_path: Option<String>) -> std::io::Result<Self> {
        let file = match file_path {
            Some(ref path) => {
                let f = OpenOptions::new().create(true).append(true).open(path)?;
                Some(Arc::new(Mutex::new(f)))
            }
            None => None,
        };

        Ok(AuditLogger { file_path, file })
    }

    pub async fn log(&self, entry: AuditEntry) {
        let Some(ref file) = self.file else {
            return;
        };
        match serde_json::to_string(&entry) {
            Ok(json) => {
                let mut f = file.lock().await;
                if let Err(e) = writeln!(f, "{}", json) {
                    error!("Failed to write audit log: {}", e);
                }
            }
            Err(e) => error!("Failed to serialize audit entry: {}", e),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }
}

#[async_trait]
impl GatewayObserver for AuditLogger {
    async fn on_ready(&self, addr: SocketAddr) {
        self.log(AuditEntry::new(AuditEventType::ServerStart).with_client_addr(addr))
            .await;
    }

    async fn on_outcome(&self, event: &OutcomeEvent) {
        self.log(AuditEntry::from(event)).await;
    }

    async fn on_error(&self, event: &ErrorEvent) {
        self.log(
            AuditEntry::new(AuditEventType::RequestError)
                .with_client_addr(event.client_addr)
                .with_details(&event.message),
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::OutcomeReason;
    use std::fs;
    use tempfile::NamedTempFile;

    fn rejected() -> OutcomeEvent {
        OutcomeEvent {
            username: "alice@example.com".to_string(),
            domain: Some("example.com".to_string()),
            status: false,
            reason: OutcomeReason::CredentialsRejected,
            client_addr: "10.0.0.1:5000".parse().unwrap(),
            request_id: 42,
        }
    }

    #[test]
    fn test_entry_from_outcome() {
        let entry = AuditEntry::from(&rejected());
        assert_eq!(entry.event_type, AuditEventType::AuthFailure);
        assert_eq!(entry.username.as_deref(), Some("alice@example.com"));
        assert_eq!(entry.domain.as_deref(), Some("example.com"));
        assert_eq!(entry.request_id, Some(42));
        assert_eq!(entry.details.as_deref(), Some("credentials rejected"));
    }

    #[test]
    fn test_entry_serialization_skips_empty_fields() {
        let json = serde_json::to_string(&AuditEntry::new(AuditEventType::RequestError)).unwrap();
        assert!(json.contains("request_error"));
        assert!(!json.contains("username"));
    }

    #[tokio::test]
    async fn test_audit_logger_as_observer() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap().to_string();

        let logger = AuditLogger::new(Some(path.clone())).unwrap();
        assert!(logger.is_enabled());
        assert_eq!(logger.file_path(), Some(path.as_str()));

        logger.on_outcome(&rejected()).await;
        logger
            .on_error(&ErrorEvent::new("10.0.0.2:6000".parse().unwrap(), "not an Access-Request"))
            .await;

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("auth_failure"));
        assert!(lines[0].contains("alice@example.com"));
        assert!(lines[1].contains("request_error"));
        assert!(lines[1].contains("not an Access-Request"));
    }

    #[tokio::test]
    async fn test_audit_logger_disabled() {
        let logger = AuditLogger::new(None).unwrap();
        assert!(!logger.is_enabled());
        logger.on_outcome(&rejected()).await;
    }
}
