//! Outbound mail and the tasks that send it.
//!
//! Sends never block the request that triggers them. [`NotificationTasks`] spawns each
//! send onto the runtime, keeps the handle, and logs the outcome. At shutdown it refuses
//! new work, waits a bounded time for outstanding sends, then aborts the rest.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::task::JoinSet;

use crate::config::ServiceConfig;

/// Timeout for a single SMTP exchange.
const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from sending mail.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Sender or recipient is not a valid mailbox.
    #[error("invalid address: {0}")]
    Address(String),

    /// The message could not be built.
    #[error("invalid message: {0}")]
    Message(String),

    /// The transport failed.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Something that can deliver a plain-text mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver `body` to `address`.
    ///
    /// # Errors
    ///
    /// Returns a `MailError` if the message was not accepted for delivery.
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// SMTP delivery over STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a mailer for `host:port` sending as `from`.
    ///
    /// # Errors
    ///
    /// Returns a `MailError` if the relay or sender address is invalid.
    pub fn new(
        host: &str,
        port: u16,
        credentials: Option<(String, String)>,
        from: &str,
    ) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| MailError::Transport(format!("failed to create SMTP relay: {e}")))?
            .port(port)
            .timeout(Some(SMTP_TIMEOUT));

        if let Some((username, password)) = credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }

        let from = from
            .parse::<Mailbox>()
            .map_err(|e| MailError::Address(format!("sender {from}: {e}")))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    /// Build a mailer from the service configuration, if mail is configured.
    ///
    /// # Errors
    ///
    /// Returns a `MailError` if the configured relay or sender address is invalid.
    pub fn from_config(config: &ServiceConfig) -> Result<Option<Self>, MailError> {
        let Some(host) = config.smtp_host.as_deref() else {
            return Ok(None);
        };

        let credentials = config
            .smtp_username
            .clone()
            .zip(config.smtp_password.clone());

        Self::new(host, config.smtp_port, credentials, &config.mail_from).map(Some)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let to = address
            .parse::<Mailbox>()
            .map_err(|e| MailError::Address(format!("recipient {address}: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| MailError::Message(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Tracked fire-and-forget mail sends.
pub struct NotificationTasks {
    mailer: Option<Arc<dyn Mailer>>,
    tasks: Mutex<JoinSet<()>>,
    closed: AtomicBool,
}

impl NotificationTasks {
    /// Create a dispatcher. With no mailer every dispatch is dropped with a warning.
    #[must_use]
    pub fn new(mailer: Option<Arc<dyn Mailer>>) -> Self {
        Self {
            mailer,
            tasks: Mutex::new(JoinSet::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Whether a mailer is configured.
    #[must_use]
    pub fn has_mailer(&self) -> bool {
        self.mailer.is_some()
    }

    /// Spawn a send in the background. Returns whether a task was spawned.
    ///
    /// The outcome of the send is logged and never reported to the caller.
    pub fn dispatch(&self, address: &str, subject: &str, body: String) -> bool {
        let Some(mailer) = self.mailer.clone() else {
            tracing::warn!(to = %address, "Mail not configured, notification dropped");
            return false;
        };

        // Checked under the lock so a send cannot land in the set after shutdown took it.
        let mut tasks = self.lock_tasks();
        if self.closed.load(Ordering::Acquire) {
            tracing::warn!(to = %address, "Notification dispatcher shut down, notification dropped");
            return false;
        }

        let address = address.to_string();
        let subject = subject.to_string();

        // Reap finished sends so the set only holds outstanding work.
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            match mailer.send(&address, &subject, &body).await {
                Ok(()) => tracing::info!(to = %address, "Notification sent"),
                Err(e) => tracing::warn!(to = %address, error = %e, "Notification failed"),
            }
        });
        true
    }

    /// Number of sends not yet reaped.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock_tasks().len()
    }

    /// Stop accepting sends, wait up to `drain` for outstanding ones, abort the rest.
    pub async fn shutdown(&self, drain: Duration) {
        self.closed.store(true, Ordering::Release);
        let mut tasks = std::mem::take(&mut *self.lock_tasks());
        let outstanding = tasks.len();

        let drained = tokio::time::timeout(drain, async {
            while tasks.join_next().await.is_some() {}
        })
        .await
        .is_ok();

        if drained {
            tracing::info!(outstanding, "Notification tasks drained");
        } else {
            tracing::warn!(
                aborted = tasks.len(),
                "Notification drain timed out, aborting remaining sends"
            );
            tasks.shutdown().await;
        }
    }

    fn lock_tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowMailer(Duration);

    #[async_trait]
    impl Mailer for SlowMailer {
        async fn send(&self, _: &str, _: &str, _: &str) -> Result<(), MailError> {
            tokio::time::sleep(self.0).await;
            Ok(())
        }
    }

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _: &str, _: &str, _: &str) -> Result<(), MailError> {
            Err(MailError::Transport("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn dispatch_without_mailer_is_dropped() {
        let tasks = NotificationTasks::new(None);
        assert!(!tasks.has_mailer());
        assert!(!tasks.dispatch("a@example.com", "subject", "body".into()));
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn failure_is_swallowed() {
        let tasks = NotificationTasks::new(Some(Arc::new(FailingMailer)));
        assert!(tasks.dispatch("a@example.com", "subject", "body".into()));
        tasks.shutdown(Duration::from_secs(1)).await;
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_aborts_after_drain_timeout() {
        let tasks = NotificationTasks::new(Some(Arc::new(SlowMailer(Duration::from_secs(60)))));
        assert!(tasks.dispatch("a@example.com", "subject", "body".into()));
        assert_eq!(tasks.pending(), 1);

        tasks.shutdown(Duration::from_secs(1)).await;
        assert_eq!(tasks.pending(), 0);

        // Closed dispatchers refuse new work.
        assert!(!tasks.dispatch("a@example.com", "subject", "body".into()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn dispatch_racing_shutdown_leaves_nothing_behind() {
        for _ in 0..20 {
            let tasks = Arc::new(NotificationTasks::new(Some(Arc::new(FailingMailer))));

            let mut senders = JoinSet::new();
            for _ in 0..16 {
                let tasks = Arc::clone(&tasks);
                senders.spawn(async move {
                    tasks.dispatch("a@example.com", "subject", "body".into());
                });
            }
            tasks.shutdown(Duration::from_secs(1)).await;
            while senders.join_next().await.is_some() {}

            assert_eq!(tasks.pending(), 0);
        }
    }

    #[tokio::test]
    async fn smtp_mailer_rejects_bad_sender() {
        let result = SmtpMailer::new("smtp.example.com", 587, None, "not an address");
        assert!(matches!(result, Err(MailError::Address(_))));
    }
}
