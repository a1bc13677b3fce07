//! Session extractor.
//!
//! Handlers that take an [`AuthenticatedUser`] only run for requests that
//! carry a current session token, either in the `token` cookie or in an
//! `Authorization: Bearer` header (the header wins when both are present).

use axum::RequestPartsExt;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;

use super::ApiErrorResponse;
use crate::domain::Username;
use crate::infrastructure::AppDependencies;

/// Name of the cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "token";

/// The principal whose token was validated for this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Username);

impl FromRequestParts<AppDependencies> for AuthenticatedUser {
    type Rejection = ApiErrorResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        dependencies: &AppDependencies,
    ) -> Result<Self, Self::Rejection> {
        // A missing or non-bearer Authorization header falls back to the cookie.
        let bearer = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .ok();
        let jar = CookieJar::from_headers(&parts.headers);

        let token = session_token(bearer.as_ref().map(|TypedHeader(header)| header), &jar)
            .ok_or_else(|| ApiErrorResponse::unauthorized("missing session token"))?;
        let username = dependencies.sessions().validate_token(&token).await?;
        Ok(Self(username))
    }
}

/// Picks the session token out of a bearer header or the cookie jar.
#[must_use]
pub fn session_token(bearer: Option<&Authorization<Bearer>>, jar: &CookieJar) -> Option<String> {
    bearer
        .map(|header| header.token().trim())
        .filter(|token| !token.is_empty())
        .or_else(|| {
            jar.get(TOKEN_COOKIE)
                .map(Cookie::value)
                .filter(|token| !token.is_empty())
        })
        .map(str::to_string)
}

/// Cookie that stores `token` for the whole site.
#[must_use]
pub fn token_cookie(token: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .http_only(true)
        .path("/")
        .build()
}
