/// Own-profile endpoints
use crate::{
    account::{AccountView, UpdateProfileRequest},
    api::middleware::{bytes_body, json_body},
    auth::AuthContext,
    context::AppContext,
    error::AccountResult,
};
use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, JsonRejection},
        State,
    },
    routing::{get, patch},
    Json, Router,
};

/// Build own-profile routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/user/me",
            get(get_me).patch(update_me).put(update_me),
        )
        .route("/api/user/me/upload-image", patch(upload_my_image))
}

async fn get_me(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AccountResult<Json<AccountView>> {
    Ok(Json(ctx.account_service.get_own_profile(&auth.caller).await?))
}

/// Update name and/or password; other fields in the body are ignored
async fn update_me(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    body: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> AccountResult<Json<AccountView>> {
    let req = json_body(body)?;
    Ok(Json(
        ctx.account_service
            .update_own_profile(&auth.caller, req)
            .await?,
    ))
}

async fn upload_my_image(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    body: Result<Bytes, BytesRejection>,
) -> AccountResult<Json<AccountView>> {
    let data = bytes_body(body, ctx.config.service.image_upload_limit)?;
    let view = ctx
        .account_service
        .upload_own_image(&auth.caller, data)
        .await?;
    Ok(Json(view))
}
