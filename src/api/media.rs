/// Profile image serving
use crate::{
    context::AppContext,
    error::{AccountError, AccountResult},
};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

/// Build media routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/media/:reference", get(get_image))
}

/// Serve a stored image
///
/// References never change content, so they are cached as immutable and the
/// reference itself doubles as the ETag.
async fn get_image(
    State(ctx): State<AppContext>,
    Path(reference): Path<String>,
    headers: HeaderMap,
) -> AccountResult<Response> {
    let etag = format!("\"{}\"", reference);

    let (data, mime_type) = ctx
        .image_store
        .get(&reference)
        .await?
        .ok_or_else(|| AccountError::NotFound(format!("Image not found: {}", reference)))?;

    let cache_control = "public, max-age=31536000, immutable";

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == etag);

    if not_modified {
        return Ok((
            StatusCode::NOT_MODIFIED,
            [(header::ETAG, etag), (header::CACHE_CONTROL, cache_control.to_string())],
        )
            .into_response());
    }

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime_type.to_string()),
            (header::ETAG, etag),
            (header::CACHE_CONTROL, cache_control.to_string()),
        ],
        data,
    )
        .into_response())
}
