//! Log-only notifier.

use crate::notify::{Notifier, NotifyError};
use async_trait::async_trait;
use tracing::warn;

/// Writes warnings to the service log instead of contacting the user.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient_guid: &str, message: &str) -> Result<(), NotifyError> {
        warn!(recipient = %recipient_guid, message = %message, "Owner warning");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
