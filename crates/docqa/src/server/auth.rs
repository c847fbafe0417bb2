//! Bearer-token session extractor

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::auth::SessionView;
use crate::error::{AuthError, Error};

use super::state::AppState;

/// The caller's session, resolved from `Authorization: Bearer <token>`
#[derive(Debug, Clone)]
pub struct AuthSession(pub SessionView);

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(AuthError::InvalidSession)?;

        state.session(token).map(AuthSession)
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
