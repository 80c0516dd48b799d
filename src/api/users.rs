/// Account collection endpoints
use crate::{
    account::{AccountView, RegisterRequest},
    api::middleware::{bytes_body, json_body},
    auth::{AuthContext, OptionalAuthContext},
    context::AppContext,
    error::AccountResult,
};
use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, JsonRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

/// Build account collection routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/user/users", get(list_users).post(create_user))
        .route("/api/user/users/:id/upload-image", post(upload_image))
}

/// Register an account
///
/// Open to anonymous callers; only super-users may register Admin accounts.
async fn create_user(
    State(ctx): State<AppContext>,
    auth: OptionalAuthContext,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> AccountResult<(StatusCode, Json<AccountView>)> {
    let req = json_body(body)?;

    let view = ctx.account_service.register(auth.caller(), req).await?;
    tracing::info!(account_id = %view.id, user_type = view.user_type.as_str(), "Account registered");

    Ok((StatusCode::CREATED, Json(view)))
}

async fn list_users(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AccountResult<Json<Vec<AccountView>>> {
    let views = ctx.account_service.list_accounts(&auth.caller).await?;
    Ok(Json(views))
}

/// Replace another account's profile image (raw image bytes as the body)
async fn upload_image(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> AccountResult<Json<AccountView>> {
    let data = bytes_body(body, ctx.config.service.image_upload_limit)?;
    let view = ctx
        .account_service
        .upload_image(&auth.caller, &id, data)
        .await?;
    Ok(Json(view))
}
