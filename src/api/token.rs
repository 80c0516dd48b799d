/// Session endpoints: login, refresh and logout
use crate::{
    account::{AccessTokenResponse, RefreshRequest, TokenPairResponse, TokenRequest},
    api::middleware::json_body,
    auth::AuthContext,
    context::AppContext,
    error::AccountResult,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};

/// Build session routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/user/token", post(obtain_token_pair))
        .route("/api/user/token/refresh", post(refresh_token))
        .route("/api/user/logout", post(logout))
}

async fn obtain_token_pair(
    State(ctx): State<AppContext>,
    body: Result<Json<TokenRequest>, JsonRejection>,
) -> AccountResult<Json<TokenPairResponse>> {
    let req = json_body(body)?;

    let pair = ctx.session_manager.login(&req.email, &req.password).await?;

    Ok(Json(TokenPairResponse {
        access: pair.access,
        refresh: pair.refresh,
    }))
}

async fn refresh_token(
    State(ctx): State<AppContext>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> AccountResult<Json<AccessTokenResponse>> {
    let req = json_body(body)?;

    let access = ctx.session_manager.refresh(&req.refresh).await?;

    Ok(Json(AccessTokenResponse { access }))
}

/// Blacklist every outstanding refresh token of the caller
async fn logout(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> AccountResult<StatusCode> {
    let req = json_body(body)?;

    ctx.session_manager
        .logout_as(&auth.caller.id, &req.refresh)
        .await?;

    Ok(StatusCode::RESET_CONTENT)
}
