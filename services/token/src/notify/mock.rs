//! Recording notifier for tests.

use crate::notify::{Notifier, NotifyError};
use async_trait::async_trait;
use std::sync::Mutex;

/// A warning captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentWarning {
    /// GUID of the warned user
    pub recipient_guid: String,
    /// Warning text
    pub message: String,
}

/// In-memory notifier that records every send.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentWarning>>,
    fail: bool,
}

impl RecordingNotifier {
    /// Notifier whose sends succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifier whose every send fails. Attempts are still recorded.
    pub fn failing() -> Self {
        RecordingNotifier {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Every send attempt so far.
    pub fn sent(&self) -> Vec<SentWarning> {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of send attempts.
    pub fn count(&self) -> usize {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient_guid: &str, message: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(SentWarning {
                recipient_guid: recipient_guid.to_string(),
                message: message.to_string(),
            });

        if self.fail {
            return Err(NotifyError::Unavailable("forced failure".to_string()));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
