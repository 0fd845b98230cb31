use crate::model::OwnerId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: OwnerId,
}

/// Identity asserted by the external provider for the current session.
#[async_trait(?Send)]
pub trait AuthSession: Send + Sync {
    async fn current_user(&self) -> Option<CurrentUser>;
}
