use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::Extension;

use crate::auth::Identity;

use super::error::ApiError;
use super::routes::ServerContext;

/// The authenticated caller. Rejects with 401 when the request carries no
/// valid session.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(ctx) = Extension::<Arc<ServerContext>>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::internal("server context missing"))?;

        let claims = ctx
            .sessions
            .authenticate(&parts.headers)
            .await
            .ok_or(ApiError::Unauthorized)?;
        let identity = ctx.picks.resolve_identity(claims).await?;
        Ok(CurrentUser(identity))
    }
}
