use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::Serialize;

use crate::domain::UserId;
use crate::picks::PicksError;

/// Header carrying the authenticated e-mail, set by the fronting OAuth proxy.
pub const EMAIL_HEADER: &str = "x-auth-email";
/// Optional header carrying the provider's full name for the user.
pub const NAME_HEADER: &str = "x-auth-name";

/// What the session provider vouches for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionClaims {
    pub email: String,
    pub name: Option<String>,
}

/// Authenticated caller, resolved to a stored user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
}

impl Identity {
    pub fn require_admin(&self) -> Result<(), PicksError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(PicksError::forbidden("admin access required"))
        }
    }
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Returns the session claims for the request, or `None` when there is no
    /// valid session.
    async fn authenticate(&self, headers: &HeaderMap) -> Option<SessionClaims>;
}

/// Trusts identity headers injected by an authenticating reverse proxy. The
/// server must only be reachable through that proxy.
#[derive(Clone, Debug, Default)]
pub struct TrustedHeaderSessions;

#[async_trait]
impl SessionProvider for TrustedHeaderSessions {
    async fn authenticate(&self, headers: &HeaderMap) -> Option<SessionClaims> {
        let email = header_value(headers, EMAIL_HEADER)?;
        if !email.contains('@') {
            return None;
        }
        Some(SessionClaims {
            email: email.to_lowercase(),
            name: header_value(headers, NAME_HEADER),
        })
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[tokio::test]
    async fn reads_claims_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(EMAIL_HEADER, HeaderValue::from_static(" Fan@Example.com "));
        headers.insert(NAME_HEADER, HeaderValue::from_static("Fan Person"));

        let claims = TrustedHeaderSessions.authenticate(&headers).await.unwrap();
        assert_eq!(claims.email, "fan@example.com");
        assert_eq!(claims.name.as_deref(), Some("Fan Person"));
    }

    #[tokio::test]
    async fn missing_or_malformed_email_is_no_session() {
        let headers = HeaderMap::new();
        assert!(TrustedHeaderSessions.authenticate(&headers).await.is_none());

        let mut headers = HeaderMap::new();
        headers.insert(EMAIL_HEADER, HeaderValue::from_static("not-an-email"));
        assert!(TrustedHeaderSessions.authenticate(&headers).await.is_none());
    }
}
