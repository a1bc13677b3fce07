//! Account handlers: register, authenticate, logout, profile update.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;

use crate::api::dto::{CredentialsRequest, TokenResponse};
use crate::api::middleware::{ApiErrorResponse, AuthenticatedUser, token_cookie};
use crate::domain::{Profile, ProfileUpdate, Username};
use crate::infrastructure::AppDependencies;

/// POST /register - Create a principal and start its session.
///
/// # Response
///
/// - `201 Created` with [`TokenResponse`] and the `token` cookie
/// - `400 Bad Request` for an empty username/password or a taken username
pub async fn register(
    State(dependencies): State<AppDependencies>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Response, ApiErrorResponse> {
    let Json(request) = payload?;
    let (username, token) = dependencies
        .accounts()
        .register(&request.username, &request.password)
        .await?;
    Ok(session_response(StatusCode::CREATED, username, token))
}

/// POST /authenticate - Check a password and start a new session.
///
/// Any previously issued token of the principal stops validating.
///
/// # Response
///
/// - `200 OK` with [`TokenResponse`] and the `token` cookie
/// - `401 Unauthorized` for an unknown username or a wrong password
pub async fn authenticate(
    State(dependencies): State<AppDependencies>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Response, ApiErrorResponse> {
    let Json(request) = payload?;
    let (username, token) = dependencies
        .accounts()
        .authenticate(&request.username, &request.password)
        .await?;
    Ok(session_response(StatusCode::OK, username, token))
}

/// POST /logout - End the caller's session.
pub async fn logout(
    State(dependencies): State<AppDependencies>,
    AuthenticatedUser(username): AuthenticatedUser,
) -> Result<StatusCode, ApiErrorResponse> {
    dependencies.accounts().logout(&username).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /profile - Merge the non-empty fields of the body into the caller's profile.
pub async fn update_profile(
    State(dependencies): State<AppDependencies>,
    AuthenticatedUser(username): AuthenticatedUser,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<Profile>, ApiErrorResponse> {
    let Json(update) = payload?;
    let profile = dependencies
        .accounts()
        .update_profile(&username, update)
        .await?;
    Ok(Json(profile))
}

fn session_response(status: StatusCode, username: Username, token: String) -> Response {
    let jar = CookieJar::new().add(token_cookie(token.clone()));
    (status, jar, Json(TokenResponse { username, token })).into_response()
}
