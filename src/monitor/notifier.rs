//! Email notification for stale or missing tables

use async_trait::async_trait;
use chrono::Duration;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// SMTP settings supplied on the command line.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP server hostname
    pub server: String,
    /// Username for authentication, also the sender address
    pub username: String,
    /// Password for authentication; if absent, sends unauthenticated
    pub password: Option<String>,
    /// If true, use SMTPS (implicit TLS, port 465); otherwise plaintext SMTP
    /// on port 25
    pub secure: bool,
}

/// One outbound email: same content for every recipient in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl NotificationMessage {
    /// Compose the failure message for a table. Subject and body are
    /// deterministic functions of the table name and tolerance.
    pub fn compose(recipients: &[String], table_name: &str, tolerance: Duration) -> Self {
        Self {
            recipients: recipients.to_vec(),
            subject: format!("Database dataflow failure: {table_name}"),
            body: format!(
                "Dataflow failure in {table_name}. No data in last {} minutes, \
                 which was unexpected",
                tolerance.num_minutes()
            ),
        }
    }
}

/// Notification errors. `Config` is fatal at construction time; the rest are
/// entry-scoped and reported by the orchestration loop.
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("invalid smtp configuration: {0}")]
    Config(String),

    #[error("invalid sender address: {0}")]
    Address(String),

    #[error("failed to connect to smtp server: {0}")]
    Connection(String),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("delivery failed for {} recipient(s): {}", .failed.len(), .failed.join("; "))]
    Delivery { failed: Vec<String> },
}

/// The notification seam used by the orchestration loop.
#[async_trait]
pub trait Notify: Send + Sync {
    async fn notify(
        &self,
        recipients: &[String],
        table_name: &str,
        tolerance: Duration,
    ) -> Result<(), NotifierError>;
}

/// Sends notification emails over SMTP.
#[derive(Debug)]
pub struct EmailNotifier {
    config: SmtpConfig,
}

impl EmailNotifier {
    /// Create a notifier, failing fast if the sender address or server is
    /// missing.
    pub fn new(config: SmtpConfig) -> Result<Self, NotifierError> {
        if config.username.trim().is_empty() || config.server.trim().is_empty() {
            return Err(NotifierError::Config(
                "email address and smtp server are required".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Open a transport according to the secure flag. Port and encryption
    /// follow the flag and are not independently configurable.
    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifierError> {
        let builder = if self.config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.server)
                .map_err(|e| NotifierError::Connection(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.server)
        };

        let builder = match &self.config.password {
            Some(password) => builder.credentials(Credentials::new(
                self.config.username.clone(),
                password.clone(),
            )),
            None => builder,
        };

        Ok(builder.build())
    }

    /// Send one message per recipient from the same sender identity. A
    /// rejection for one recipient does not stop the others; all failures are
    /// collected and reported together. Partial delivery is possible and is
    /// not rolled back.
    async fn deliver<T>(
        &self,
        transport: &T,
        message: &NotificationMessage,
    ) -> Result<(), NotifierError>
    where
        T: AsyncTransport + Sync,
        T::Ok: Send,
        T::Error: std::fmt::Display,
    {
        let from: Mailbox = self
            .config
            .username
            .parse()
            .map_err(|_| NotifierError::Address(self.config.username.clone()))?;

        let mut failed = Vec::new();
        for recipient in &message.recipients {
            let to: Mailbox = match recipient.parse() {
                Ok(mailbox) => mailbox,
                Err(_) => {
                    failed.push(format!("{recipient}: invalid address"));
                    continue;
                }
            };

            let email = Message::builder()
                .from(from.clone())
                .to(to)
                .subject(message.subject.clone())
                .header(ContentType::TEXT_PLAIN)
                .body(message.body.clone())?;

            if let Err(err) = transport.send(email).await {
                failed.push(format!("{recipient}: {err}"));
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(NotifierError::Delivery { failed })
        }
    }
}

#[async_trait]
impl Notify for EmailNotifier {
    async fn notify(
        &self,
        recipients: &[String],
        table_name: &str,
        tolerance: Duration,
    ) -> Result<(), NotifierError> {
        let message = NotificationMessage::compose(recipients, table_name, tolerance);
        let transport = self.transport()?;
        // Transport is dropped on every exit path, closing its connections.
        self.deliver(&transport, &message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lettre::address::Envelope;
    use std::sync::Mutex;

    fn config() -> SmtpConfig {
        SmtpConfig {
            server: "smtp.example.com".to_string(),
            username: "alerts@example.com".to_string(),
            password: None,
            secure: false,
        }
    }

    #[test]
    fn test_compose_subject() {
        let msg = NotificationMessage::compose(
            &["ops@example.com".to_string()],
            "orders",
            Duration::minutes(2880),
        );
        assert_eq!(msg.subject, "Database dataflow failure: orders");
    }

    #[test]
    fn test_compose_body_names_table_and_window() {
        let msg = NotificationMessage::compose(
            &["ops@example.com".to_string()],
            "orders",
            Duration::minutes(2880),
        );
        assert!(msg.body.contains("orders"));
        assert!(msg.body.contains("2880"));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let recipients = vec!["ops@example.com".to_string()];
        let a = NotificationMessage::compose(&recipients, "t2", Duration::minutes(720));
        let b = NotificationMessage::compose(&recipients, "t2", Duration::minutes(720));
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let err = EmailNotifier::new(SmtpConfig {
            server: String::new(),
            username: String::new(),
            password: None,
            secure: false,
        })
        .unwrap_err();
        assert!(matches!(err, NotifierError::Config(_)));
    }

    #[test]
    fn test_missing_server_rejected() {
        let err = EmailNotifier::new(SmtpConfig {
            server: "  ".to_string(),
            ..config()
        })
        .unwrap_err();
        assert!(matches!(err, NotifierError::Config(_)));
    }

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct StubSmtpError(String);

    /// Accepts every recipient except one, recording successful sends.
    struct RejectingTransport {
        reject: String,
        sent: Mutex<Vec<String>>,
    }

    impl RejectingTransport {
        fn new(reject: &str) -> Self {
            Self {
                reject: reject.to_string(),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AsyncTransport for RejectingTransport {
        type Ok = ();
        type Error = StubSmtpError;

        async fn send_raw(&self, envelope: &Envelope, _email: &[u8]) -> Result<(), StubSmtpError> {
            let to = envelope
                .to()
                .first()
                .map(ToString::to_string)
                .unwrap_or_default();
            if to == self.reject {
                return Err(StubSmtpError("550 mailbox unavailable".to_string()));
            }
            self.sent.lock().unwrap().push(to);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_deliver_to_all_recipients() {
        let notifier = EmailNotifier::new(config()).unwrap();
        let transport = RejectingTransport::new("nobody@example.com");
        let message = NotificationMessage::compose(
            &["a@example.com".to_string(), "b@example.com".to_string()],
            "t2",
            Duration::minutes(720),
        );

        notifier.deliver(&transport, &message).await.unwrap();
        assert_eq!(
            *transport.sent.lock().unwrap(),
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
    }

    #[tokio::test]
    async fn test_one_rejection_reported_others_still_sent() {
        let notifier = EmailNotifier::new(config()).unwrap();
        let transport = RejectingTransport::new("b@example.com");
        let message = NotificationMessage::compose(
            &["a@example.com".to_string(), "b@example.com".to_string()],
            "t2",
            Duration::minutes(720),
        );

        let err = notifier.deliver(&transport, &message).await.unwrap_err();
        match err {
            NotifierError::Delivery { failed } => {
                assert_eq!(failed.len(), 1);
                assert!(failed[0].contains("b@example.com"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // The first recipient was still delivered to.
        assert_eq!(
            *transport.sent.lock().unwrap(),
            vec!["a@example.com".to_string()]
        );
    }

    #[tokio::test]
    async fn test_invalid_recipient_reported() {
        let notifier = EmailNotifier::new(config()).unwrap();
        let transport = RejectingTransport::new("nobody@example.com");
        let message = NotificationMessage::compose(
            &["not-an-address".to_string()],
            "t2",
            Duration::minutes(720),
        );

        let err = notifier.deliver(&transport, &message).await.unwrap_err();
        assert!(matches!(err, NotifierError::Delivery { .. }));
    }
}
