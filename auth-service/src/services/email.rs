use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use service_core::error::AppError;
use std::time::Duration;
use uuid::Uuid;

use crate::config::SmtpConfig;

/// Delivery transport seam. The dispatch queue is the only caller; request
/// handlers never touch this directly.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_verification_code(
        &self,
        to_email: &str,
        user_id: Uuid,
        code: &str,
    ) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct EmailService {
    mailer: SmtpTransport,
    from_email: String,
    base_url: String,
}

impl EmailService {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e.to_string())))?
            .credentials(creds)
            .port(587)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "Email service initialized");

        Ok(Self {
            mailer,
            from_email: config.from_email.clone(),
            base_url: config.base_url.clone(),
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: &str,
        html_body: &str,
    ) -> Result<(), AppError> {
        let email = Message::builder()
            .from(self.from_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::InternalError(e.into()),
            )?)
            .to(to_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::InternalError(e.into()),
            )?)
            .subject(subject)
            .multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body.to_string()),
                    )
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| AppError::InternalError(e.into()))?;

        // Send in the blocking thread pool to keep the async runtime free.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e.to_string(), to = %to_email, "Failed to send email");
                Err(AppError::EmailError(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl EmailProvider for EmailService {
    async fn send_verification_code(
        &self,
        to_email: &str,
        user_id: Uuid,
        code: &str,
    ) -> Result<(), AppError> {
        let verification_link = format!(
            "{}/auth/verify?user={}&code={}",
            self.base_url, user_id, code
        );

        let html_body = format!(
            r###"            <html>
                <body style="font-family: Arial, sans-serif;">
                    <h2>Welcome! Please confirm your email</h2>
                    <p>Thank you for registering. Your verification code is:</p>
                    <p style="font-size: 24px; letter-spacing: 4px;"><strong>{}</strong></p>
                    <p>You can also confirm directly:</p>
                    <p>
                        <a href="{}" style="background-color: #4CAF50; color: white; padding: 14px 20px; text-decoration: none; border-radius: 4px;">
                            Confirm Email
                        </a>
                    </p>
                    <p style="color: #666; font-size: 12px;">
                        This code expires shortly. If you didn't register, please ignore this email.
                    </p>
                </body>
            </html>
            "###,
            code, verification_link
        );

        let plain_body = format!(
            "Welcome! Please confirm your email\n\nYour verification code is: {}\n\nOr visit the following link:\n\n{}\n\nThis code expires shortly. If you didn't register, please ignore this email.",
            code, verification_link
        );

        self.send_email(to_email, "Confirm Your Email Address", &plain_body, &html_body)
            .await
    }
}

/// A message captured by [`MockEmailService`].
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub to_email: String,
    pub user_id: Uuid,
    pub code: String,
}

/// Capturing mock for tests: records every message instead of sending.
#[derive(Debug, Default)]
pub struct MockEmailService {
    pub sent: std::sync::Mutex<Vec<SentMessage>>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().expect("mock mailbox poisoned").clone()
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_verification_code(
        &self,
        to_email: &str,
        user_id: Uuid,
        code: &str,
    ) -> Result<(), AppError> {
        self.sent
            .lock()
            .expect("mock mailbox poisoned")
            .push(SentMessage {
                to_email: to_email.to_string(),
                user_id,
                code: code.to_string(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_service_builds_from_config() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            user: "mailer".to_string(),
            password: "secret".to_string(),
            from_email: "noreply@example.com".to_string(),
            base_url: "http://localhost:8080".to_string(),
        };

        assert!(EmailService::new(&config).is_ok());
    }

    #[tokio::test]
    async fn mock_captures_messages() {
        let mock = MockEmailService::new();
        let user_id = Uuid::new_v4();

        mock.send_verification_code("a@example.com", user_id, "123456")
            .await
            .unwrap();

        let sent = mock.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to_email, "a@example.com");
        assert_eq!(sent[0].code, "123456");
    }
}
