//! Delivery of magic-link sign-in URLs.

use async_trait::async_trait;

/// Sends a magic-link URL to an email address.
#[async_trait]
pub trait MagicLinkSender: Send + Sync {
    async fn send(&self, email: &str, link: &str) -> anyhow::Result<()>;
}

/// Writes links to the log instead of sending mail. Used when no mail
/// transport is configured.
///
/// The link is a live sign-in credential, so it only appears at `debug`.
pub struct LogSender;

#[async_trait]
impl MagicLinkSender for LogSender {
    async fn send(&self, email: &str, link: &str) -> anyhow::Result<()> {
        tracing::info!(%email, "Magic link issued");
        tracing::debug!(%email, %link, "Magic link URL");
        Ok(())
    }
}
