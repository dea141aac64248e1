pub mod templates;

use lettre::message::MultiPart;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::models::User;

/// Sends transactional mail. Every public send returns whether the message was
/// handed to the transport; failures are logged and never propagated.
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
    frontend_url: String,
}

impl Mailer {
    pub fn new(config: Option<&SmtpConfig>, frontend_url: &str) -> Result<Self, String> {
        let Some(config) = config else {
            return Ok(Self::disabled(frontend_url));
        };

        let creds = Credentials::new(config.user.clone(), config.pass.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| format!("SMTP error: {e}"))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport: Some(transport),
            from: config.from.clone(),
            frontend_url: frontend_url.to_string(),
        })
    }

    /// A mailer that logs and reports failure for every send.
    pub fn disabled(frontend_url: &str) -> Self {
        Self {
            transport: None,
            from: String::new(),
            frontend_url: frontend_url.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    pub async fn send_verification(&self, user: &User, token: &str) -> bool {
        let url = templates::link(&self.frontend_url, "verify-email", token, &user.email);
        let email = templates::render_verification(&user.username, &url);
        self.dispatch(&user.email, email, "verification").await
    }

    pub async fn send_password_reset(&self, user: &User, token: &str) -> bool {
        let url = templates::link(&self.frontend_url, "reset-password", token, &user.email);
        let email = templates::render_password_reset(&user.username, &url);
        self.dispatch(&user.email, email, "password reset").await
    }

    async fn dispatch(&self, to: &str, email: templates::RenderedEmail, kind: &str) -> bool {
        let Some(transport) = &self.transport else {
            tracing::warn!("SMTP not configured; {kind} email to {to} not sent");
            return false;
        };

        match self.send(transport, to, email).await {
            Ok(()) => {
                tracing::info!("Sent {kind} email to {to}");
                true
            }
            Err(e) => {
                tracing::error!("Failed to send {kind} email to {to}: {e}");
                false
            }
        }
    }

    async fn send(
        &self,
        transport: &AsyncSmtpTransport<Tokio1Executor>,
        to: &str,
        email: templates::RenderedEmail,
    ) -> Result<(), String> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| format!("Invalid from address: {e}"))?,
            )
            .to(to.parse().map_err(|e| format!("Invalid to address: {e}"))?)
            .subject(email.subject)
            .multipart(MultiPart::alternative_plain_html(email.text, email.html))
            .map_err(|e| format!("Failed to build email: {e}"))?;

        transport
            .send(message)
            .await
            .map_err(|e| format!("Failed to send email: {e}"))?;

        Ok(())
    }
}
