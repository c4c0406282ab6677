//! SMTP submission credential check
//!
//! Each attempt opens a fresh `mail-send` client: implicit TLS, STARTTLS or a
//! plain connection, EHLO, then AUTH with the supplied credentials. Connect and
//! authenticate run under the configured timeout; the QUIT that follows an
//! accepted login has its own short bound and cannot change the result.

use crate::config::{SmtpConfig, SmtpSecurity};
use crate::verifier::{CredentialVerifier, VerificationResult};
use async_trait::async_trait;
use mail_send::{SmtpClient, SmtpClientBuilder};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tracing::{debug, warn};

/// Reply codes that mean "these credentials are wrong" rather than
/// "something is broken"
const AUTH_REJECTED_CODES: [u16; 2] = [534, 535];

/// Upper bound on waiting for the reply to QUIT
const QUIT_TIMEOUT: Duration = Duration::from_secs(2);

/// An authenticated client, over TLS or in the clear
enum Session {
    Tls(SmtpClient<TlsStream<TcpStream>>),
    Plain(SmtpClient<TcpStream>),
}

impl Session {
    async fn quit(self) -> mail_send::Result<()> {
        match self {
            Session::Tls(client) => client.quit().await,
            Session::Plain(client) => client.quit().await,
        }
    }

    /// Best-effort QUIT in the background; dropping the client closes the stream
    fn close(self) {
        tokio::spawn(async move {
            match tokio::time::timeout(QUIT_TIMEOUT, self.quit()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(error = %e, "SMTP QUIT failed"),
                Err(_) => debug!("SMTP server did not answer QUIT"),
            }
        });
    }
}

/// Verifies credentials by logging in to an SMTP submission server
pub struct SmtpVerifier {
    config: SmtpConfig,
}

impl SmtpVerifier {
    pub fn new(config: SmtpConfig) -> Self {
        SmtpVerifier { config }
    }

    fn builder(&self, username: &str, password: &str) -> SmtpClientBuilder<String> {
        SmtpClientBuilder::new(self.config.host.clone(), self.config.port)
            .implicit_tls(self.config.security == SmtpSecurity::Tls)
            .helo_host(self.config.helo_name.clone())
            .credentials((username.to_string(), password.to_string()))
            .timeout(self.config.timeout())
    }

    /// Connect and authenticate once
    async fn login(&self, username: &str, password: &str) -> mail_send::Result<Session> {
        let builder = self.builder(username, password);
        let session = match self.config.security {
            SmtpSecurity::Plain => Session::Plain(builder.connect_plain().await?),
            SmtpSecurity::Tls | SmtpSecurity::StartTls => Session::Tls(builder.connect().await?),
        };
        debug!(host = %self.config.host, port = self.config.port, "SMTP login accepted");
        Ok(session)
    }
}

#[async_trait]
impl CredentialVerifier for SmtpVerifier {
    async fn verify(&self, username: &str, password: &str) -> VerificationResult {
        let timeout = self.config.timeout();
        let detail = match tokio::time::timeout(timeout, self.login(username, password)).await {
            Ok(Ok(session)) => {
                session.close();
                return VerificationResult::Accepted;
            }
            Ok(Err(mail_send::Error::AuthenticationFailed(reply)))
                if AUTH_REJECTED_CODES.contains(&reply.code()) =>
            {
                debug!(code = reply.code(), "SMTP server refused credentials");
                return VerificationResult::Rejected;
            }
            Ok(Err(e)) => e.to_string(),
            // Dropping the attempt future drops and closes its stream
            Err(_) => format!("timed out after {:?}", timeout),
        };

        warn!(
            username = %username,
            host = %self.config.host,
            error = %detail,
            "SMTP credential check failed"
        );
        VerificationResult::TransportError(detail)
    }
}
