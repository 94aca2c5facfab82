//! Application state.

use std::sync::Arc;

use ebill_store::Store;

use crate::config::ServiceConfig;
use crate::ledger::Ledger;
use crate::notify::{Mailer, NotificationTasks, SmtpMailer};
use crate::recovery::PasswordRecovery;
use crate::session::SessionManager;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Open sessions.
    pub sessions: Arc<SessionManager>,

    /// Permission-gated ledger operations.
    pub ledger: Arc<Ledger>,

    /// Password change and reset.
    pub recovery: Arc<PasswordRecovery>,

    /// Background mail sends.
    pub notifications: Arc<NotificationTasks>,
}

impl AppState {
    /// Create the application state, building the SMTP mailer from `config` if configured.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let mailer: Option<Arc<dyn Mailer>> = match SmtpMailer::from_config(&config) {
            Ok(Some(mailer)) => {
                tracing::info!(
                    smtp_host = ?config.smtp_host,
                    smtp_port = config.smtp_port,
                    "Mail integration enabled"
                );
                Some(Arc::new(mailer))
            }
            Ok(None) => None,
            Err(e) => {
                tracing::error!(error = %e, "Mail misconfigured");
                None
            }
        };

        if mailer.is_none() {
            tracing::warn!("Mail not configured - password reset mails will not be sent");
        }

        Self::with_mailer(store, config, mailer)
    }

    /// Create the application state with an explicit mailer.
    #[must_use]
    pub fn with_mailer(
        store: Arc<dyn Store>,
        config: ServiceConfig,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(Arc::clone(&store)));
        let notifications = Arc::new(NotificationTasks::new(mailer));
        let ledger = Arc::new(Ledger::new(Arc::clone(&store), Arc::clone(&sessions)));
        let recovery = Arc::new(PasswordRecovery::new(
            Arc::clone(&store),
            Arc::clone(&sessions),
            Arc::clone(&notifications),
            config.product_name.clone(),
        ));

        Self {
            store,
            config,
            sessions,
            ledger,
            recovery,
            notifications,
        }
    }

    /// Check if outbound mail is configured.
    #[must_use]
    pub fn has_mailer(&self) -> bool {
        self.notifications.has_mailer()
    }

    /// Drain background work and close every session.
    pub async fn shutdown(&self) {
        self.notifications.shutdown(self.config.notify_drain()).await;
        self.sessions.shutdown().await;
    }
}
