//! `AuthUser` extractor: reads the actor identity forwarded by the upstream
//! auth collaborator.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use procfile_core::error::AppError;
use procfile_service::context::RequestContext;

use crate::error::ApiError;

/// Header carrying the acting user's ID.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
/// Header carrying the acting user's role.
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Extracted actor context available in handlers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub RequestContext);

impl AuthUser {
    /// Returns the inner `RequestContext`.
    pub fn context(&self) -> &RequestContext {
        &self.0
    }
}

impl std::ops::Deref for AuthUser {
    type Target = RequestContext;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor_id = header(parts, ACTOR_ID_HEADER)
            .ok_or_else(|| AppError::authentication("Missing x-actor-id header"))?
            .parse::<Uuid>()
            .map_err(|_| AppError::authentication("x-actor-id is not a valid UUID"))?;
        let role = header(parts, ACTOR_ROLE_HEADER)
            .ok_or_else(|| AppError::authentication("Missing x-actor-role header"))?
            .to_string();

        // First hop of x-forwarded-for is the client.
        let ip_address = header(parts, "x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string());
        let user_agent = header(parts, "user-agent").map(String::from);

        Ok(AuthUser(
            RequestContext::new(actor_id, role).with_client(ip_address, user_agent),
        ))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
