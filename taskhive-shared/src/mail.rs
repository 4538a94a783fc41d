/// Outbound mail seam
///
/// Account activation, password reset, and welcome messages are delivered out
/// of band. Actual delivery (SMTP, a provider API) is a deployment concern, so
/// the core only defines the seam: a [`Mailer`] trait the HTTP layer calls,
/// and a [`TracingMailer`] that logs each message instead of sending it.
///
/// Implementations handle their own failures (retries, dead-letter logging);
/// a lost email must never fail the account operation that triggered it.
use async_trait::async_trait;
use tracing::info;

/// Delivery seam for account lifecycle emails
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends the account activation message with its activation link
    async fn send_activation(&self, username: &str, email: &str, link: &str);

    /// Sends the password reset message with its reset link
    async fn send_password_reset(&self, email: &str, link: &str);

    /// Sends the welcome message after successful activation
    async fn send_welcome(&self, username: &str, email: &str);
}

/// Mailer that logs messages via `tracing` instead of sending them
///
/// The default transport for development and tests. Swap in a real transport
/// by implementing [`Mailer`] over SMTP or a provider API.
#[derive(Debug, Default, Clone)]
pub struct TracingMailer;

#[async_trait]
impl Mailer for TracingMailer {
    async fn send_activation(&self, username: &str, email: &str, link: &str) {
        info!(
            to = %email,
            username = %username,
            link = %link,
            subject = "Activate your account",
            "outbound mail"
        );
    }

    async fn send_password_reset(&self, email: &str, link: &str) {
        info!(
            to = %email,
            link = %link,
            subject = "Password Reset Request",
            "outbound mail"
        );
    }

    async fn send_welcome(&self, username: &str, email: &str) {
        info!(
            to = %email,
            username = %username,
            subject = "Welcome to TaskHive",
            "outbound mail"
        );
    }
}
