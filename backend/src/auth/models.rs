use serde::{Deserialize, Serialize};
use shared::OwnerId;
use shared::api::UserInfo;
use uuid::Uuid;

/// Identity asserted by a verified bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub picture_url: Option<String>,
}

impl AuthUser {
    pub fn owner_id(&self) -> OwnerId {
        OwnerId(self.id)
    }
}

impl From<AuthUser> for UserInfo {
    fn from(user: AuthUser) -> Self {
        Self {
            id: OwnerId(user.id),
            email: user.email,
            name: user.name,
            picture_url: user.picture_url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    pub exp: usize,
    pub iat: usize,
}
