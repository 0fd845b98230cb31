use actix_web::{HttpResponse, Result};
use shared::api::UserInfo;

use super::middleware::AuthenticatedUser;

pub async fn me(user: AuthenticatedUser) -> Result<HttpResponse> {
    log::info!("/auth/me endpoint called for user ID: {}", user.0.id);
    Ok(HttpResponse::Ok().json(UserInfo::from(user.0)))
}
