use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    error::Result,
    handlers::extract::{AuthUser, Json, removal_cookie, session_cookie},
    models::{
        response::{ApiResponse, with_status},
        user::{SetupRequest, SignInRequest, SignUpRequest, UserDto},
    },
    state::AppState,
};

/// Register a broker or client account and sign it in
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<SignUpRequest>,
) -> Result<impl IntoResponse> {
    let session = state.auth.sign_up(request).await?;
    let jar = jar.add(session_cookie(session.token, state.config.cookie_secure));
    Ok((jar, with_status(StatusCode::CREATED, session.response)))
}

pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<SignInRequest>,
) -> Result<impl IntoResponse> {
    let session = state.auth.sign_in(request).await?;
    let jar = jar.add(session_cookie(session.token, state.config.cookie_secure));
    Ok((jar, ApiResponse::ok(session.response)))
}

pub async fn sign_out(jar: CookieJar) -> impl IntoResponse {
    (jar.remove(removal_cookie()), ApiResponse::ok(()))
}

pub async fn me(AuthUser(user): AuthUser) -> ApiResponse<UserDto> {
    ApiResponse::ok(user.into())
}

/// Create the first super admin
pub async fn setup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<SetupRequest>,
) -> Result<impl IntoResponse> {
    let session = state.auth.setup_super_admin(request).await?;
    let jar = jar.add(session_cookie(session.token, state.config.cookie_secure));
    Ok((jar, with_status(StatusCode::CREATED, session.response)))
}
