use async_trait::async_trait;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{error, info};

use crate::{
    config::EmailConfig,
    error::{Result, WatchError},
    notify::Notifier,
    utils::format_time,
};

/// Sends rental-expiry notices to renters over SMTP.
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailNotifier {
    /// Returns `None` when email is not configured, so callers can run the
    /// monitor without notifications.
    pub fn new(config: Option<&EmailConfig>) -> Option<Result<Self>> {
        let config = match config {
            Some(cfg) => cfg,
            None => {
                info!("SMTP not configured, email notifications disabled");
                return None;
            }
        };

        let mut builder =
            match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host) {
                Ok(b) => b.port(config.smtp_port),
                Err(e) => {
                    return Some(Err(WatchError::Notification(format!(
                        "invalid SMTP relay {}: {}",
                        config.smtp_host, e
                    ))))
                }
            };

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Some(Ok(Self {
            mailer: builder.build(),
            from_address: config.from_address.clone(),
        }))
    }

    fn subject(token_id: u64) -> String {
        format!("NFT Rental Expiry Notification for Token #{}", token_id)
    }

    fn body(token_id: u64, remaining_time: i64, renter: &str) -> String {
        format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2>NFT Rental Expiry Notice</h2>
  <p>Your rental for <strong>Token #{token_id}</strong> is about to expire.</p>
  <ul>
    <li>Token ID: #{token_id}</li>
    <li>Time Remaining: {remaining}</li>
    <li>Wallet Address: {renter}</li>
  </ul>
  <p>To avoid any disruption, either return the NFT or extend your rental
  period before it expires.</p>
  <p style="font-size: 12px; color: #666;">This is an automated message.
  Please do not reply to this email.</p>
</div>"#,
            token_id = token_id,
            remaining = format_time(remaining_time),
            renter = renter,
        )
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(
        &self,
        contact: &str,
        token_id: u64,
        remaining_time: i64,
        renter: &str,
    ) -> Result<bool> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|e| WatchError::Notification(format!("invalid from address: {}", e)))?,
            )
            .to(contact
                .parse()
                .map_err(|e| WatchError::Notification(format!("invalid recipient: {}", e)))?)
            .subject(Self::subject(token_id))
            .header(ContentType::TEXT_HTML)
            .body(Self::body(token_id, remaining_time, renter))
            .map_err(|e| WatchError::Notification(format!("failed to build email: {}", e)))?;

        match self.mailer.send(message).await {
            Ok(_) => {
                info!(token_id, contact, "Expiry notification sent");
                Ok(true)
            }
            Err(e) => {
                error!(token_id, contact, "Failed to send expiry notification: {}", e);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_mentions_rental_details() {
        let body = EmailNotifier::body(42, 540, "0xabc");
        assert!(body.contains("Token #42"));
        assert!(body.contains("9m"));
        assert!(body.contains("0xabc"));
    }

    #[test]
    fn test_subject() {
        assert_eq!(
            EmailNotifier::subject(7),
            "NFT Rental Expiry Notification for Token #7"
        );
    }
}
