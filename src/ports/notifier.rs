//! Notification port
//!
//! Fire-and-forget text delivery. Implementations log failures and never
//! propagate them; a dead notification channel must not block the control
//! loop.

use async_trait::async_trait;

#[async_trait]
pub trait NotifierPort: Send + Sync {
    async fn notify(&self, message: &str);
}
