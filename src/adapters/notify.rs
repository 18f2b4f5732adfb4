//! Tracing-backed notifier
//!
//! Stands in for the external notification channel. Delivery is
//! fire-and-forget by contract, so this sink can never fail the caller.

use async_trait::async_trait;

use crate::ports::notifier::NotifierPort;

#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifierPort for LogNotifier {
    async fn notify(&self, message: &str) {
        tracing::info!(target: "notify", "{message}");
    }
}
