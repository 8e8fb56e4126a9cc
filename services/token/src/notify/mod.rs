//! Owner warnings for refreshes from an unrecognized origin.

pub mod log;
pub mod mock;
pub mod webhook;

use async_trait::async_trait;
use thiserror::Error;

pub use self::log::LogNotifier;
pub use mock::{RecordingNotifier, SentWarning};
pub use webhook::WebhookNotifier;

/// Notification delivery failures.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Receiver answered with a non-success status.
    #[error("receiver rejected notification with HTTP {0}")]
    Rejected(u16),

    /// Request could not be sent or the connection failed.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Receiver did not answer within the configured timeout.
    #[error("notification timed out")]
    Timeout,

    /// Adapter refused to send (used by test doubles).
    #[error("notification unavailable: {0}")]
    Unavailable(String),
}

/// Delivers a plaintext warning to the owner of `recipient_guid`.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `message`. Returns once the channel has accepted it.
    async fn send(&self, recipient_guid: &str, message: &str) -> Result<(), NotifyError>;

    /// Adapter name for logs and metrics.
    fn name(&self) -> &'static str;
}
