use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid message: {0}")]
    Message(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Outbound mail channel. Delivery is fire-and-forget from the caller's point
/// of view: no retry, no acknowledgement beyond `Ok(())`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body_html: &str) -> Result<(), NotifyError>;
}

/// Local dev notifier: logs recipient and subject, never the body (it holds the token).
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, _body_html: &str) -> Result<(), NotifyError> {
        info!(to = %to, subject = %subject, "mail delivery stub");
        Ok(())
    }
}

/// In-memory notifier for tests
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::auth::messages::{token_from_body, Notification};

    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
        failing: Mutex<bool>,
        attempts: AtomicUsize,
    }

    impl RecordingNotifier {
        pub fn messages(&self) -> Vec<Notification> {
            self.sent.lock().unwrap().clone()
        }

        pub fn messages_to(&self, to: &str) -> Vec<Notification> {
            self.messages().into_iter().filter(|n| n.to == to).collect()
        }

        /// While set, every send fails and nothing is recorded.
        pub fn fail_deliveries(&self, fail: bool) {
            *self.failing.lock().unwrap() = fail;
        }

        /// Sends tried so far, failed ones included.
        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        /// Yield until at least `n` sends have been tried, for mail sent from a
        /// background task. Gives up after two seconds.
        pub async fn wait_for_attempts(&self, n: usize) {
            for _ in 0..400 {
                if self.attempts() >= n {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }

        /// Token from the newest mail to `to`.
        pub fn last_token_for(&self, to: &str) -> Option<String> {
            self.messages_to(to).last().and_then(|n| token_from_body(&n.body_html))
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, to: &str, subject: &str, body_html: &str) -> Result<(), NotifyError> {
            if *self.failing.lock().unwrap() {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                return Err(NotifyError::Transport("recording notifier set to fail".into()));
            }
            self.sent.lock().unwrap().push(Notification {
                to: to.to_string(),
                subject: subject.to_string(),
                body_html: body_html.to_string(),
            });
            // bumped after the push so waiters find the message
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
