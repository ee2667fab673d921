//! Principal extraction.
//!
//! Authentication lives upstream: the reverse proxy validates the
//! session and forwards the account id in the `x-user-id` header. This
//! backend resolves the id to its stored account on every request, so a
//! forged or stale id never gets past the lookup.

use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use bson::{doc, oid::ObjectId};

use crate::{
    database::users,
    error::AppError,
    models::user::{Role, User},
    state::AppState,
};

pub const USER_ID_HEADER: &str = "x-user-id";

const LOGIN_REQUIRED: &str = "Login required to access this resource";

/// Authenticated principal for user-level routes.
pub struct AuthUser {
    pub id: ObjectId,
    pub user: User,
}

/// Principal holding the admin role claim.
pub struct AdminUser {
    pub id: ObjectId,
    pub user: User,
}

async fn resolve(parts: &Parts, state: &Arc<AppState>) -> Result<(ObjectId, User), AppError> {
    let header = parts
        .headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized(LOGIN_REQUIRED))?;

    let id = ObjectId::parse_str(header).map_err(|_| AppError::Unauthorized(LOGIN_REQUIRED))?;

    let user = users(&state.db)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or(AppError::Unauthorized(LOGIN_REQUIRED))?;

    Ok((id, user))
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let (id, user) = resolve(parts, state).await?;
        Ok(AuthUser { id, user })
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let (id, user) = resolve(parts, state).await?;

        if user.role != Role::Admin {
            return Err(AppError::Forbidden(format!(
                "Role ({}) is not allowed to access this resource",
                user.role.as_str()
            )));
        }

        Ok(AdminUser { id, user })
    }
}
