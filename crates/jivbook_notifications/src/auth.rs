//! Caller identity
//!
//! Token verification happens in the gateway in front of this service, which
//! forwards the verified identity in the `x-user-id` and `x-user-admin` headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jivbook_common::JivbookError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ADMIN_HEADER: &str = "x-user-admin";

/// The user a request is made on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub is_admin: bool,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = JivbookError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| JivbookError::AuthError("Authentication required".to_string()))?;

        let is_admin = parts
            .headers
            .get(USER_ADMIN_HEADER)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));

        Ok(Self {
            id: id.to_string(),
            is_admin,
        })
    }
}

/// An [`AuthenticatedUser`] with the admin flag set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = JivbookError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(JivbookError::ForbiddenError("Access denied".to_string()));
        }
        Ok(Self(user))
    }
}
