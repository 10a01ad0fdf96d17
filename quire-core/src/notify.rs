use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A transactional message request. Content assembly and delivery are
/// external; the core only depends on accepted-vs-failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub content: String,
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Fire-and-forget send. Errors are for logging only; callers must not
    /// roll back business state when dispatch fails.
    async fn send(
        &self,
        notification: &Notification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Dispatcher that only logs. Used in local runs and wherever a real
/// delivery channel is not configured.
pub struct LogNotifier;

#[async_trait]
impl NotificationDispatcher for LogNotifier {
    async fn send(
        &self,
        notification: &Notification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!(
            to = %notification.to,
            subject = %notification.subject,
            "notification dispatched"
        );
        Ok(())
    }
}
